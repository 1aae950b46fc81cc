pub mod batch;
pub mod models;
pub mod postgres;
pub mod store;

#[cfg(test)]
pub(crate) mod memory;

pub use batch::{CommitStats, SnapshotRows, INSERT_BATCH_SIZE};
pub use postgres::PostgresClient;
pub use store::{ExistenceOracle, SnapshotWriter};
