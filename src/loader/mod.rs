//! The incremental snapshot loader.

pub mod aggregator;
pub mod dedup;
pub mod pipeline;
pub mod reader;
pub mod snapshot;
pub mod writer;

pub use pipeline::{Pipeline, RunSummary};
pub use reader::{read_snapshot, SnapshotBatch};
pub use snapshot::{list_snapshots, SnapshotId};
