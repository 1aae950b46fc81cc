pub mod config;
pub mod db;
pub mod error;
pub mod loader;

pub use crate::config::Settings;
pub use db::PostgresClient;
pub use error::{LoadError, Stage};
pub use loader::{Pipeline, RunSummary};
