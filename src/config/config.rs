use std::path::PathBuf;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

/// PostgreSQL database connection configuration.
///
/// Used for storing:
/// - Canonical offers (first sighting wins)
/// - Per-date price observations
/// - Per-address daily average prices
#[derive(Debug, Deserialize, Clone)]
pub struct PostgresSettings {
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,
}

fn default_port() -> u16 {
    5432
}

fn default_pool_size() -> usize {
    4
}

/// Snapshot loader configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct LoaderSettings {
    /// Directory holding the scraper's `YYYY-MM-DD.csv` snapshots
    #[serde(default = "default_snapshot_dir")]
    pub snapshot_dir: PathBuf,
    /// One of `off`, `error`, `warn`, `info`, `debug`, `trace`
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for LoaderSettings {
    fn default() -> Self {
        Self {
            snapshot_dir: default_snapshot_dir(),
            log_level: default_log_level(),
        }
    }
}

fn default_snapshot_dir() -> PathBuf {
    PathBuf::from("csv")
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Root application configuration.
///
/// Loaded from an optional `config.yaml`, then overridden by
/// `REALTY__SECTION__KEY` environment variables.
#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub postgres: PostgresSettings,
    #[serde(default)]
    pub loader: LoaderSettings,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let s = Config::builder()
            .add_source(File::with_name("config").required(false))
            .add_source(Environment::with_prefix("REALTY").separator("__"))
            .build()?;

        let settings: Settings = s.try_deserialize()?;

        Ok(settings)
    }

    /// Parsed log level, falling back to `Info` on unknown values.
    pub fn log_level(&self) -> log::LevelFilter {
        self.loader.log_level.parse().unwrap_or(log::LevelFilter::Info)
    }
}
