#[allow(clippy::module_inception)]
mod config;

pub use self::config::{LoaderSettings, PostgresSettings, Settings};
