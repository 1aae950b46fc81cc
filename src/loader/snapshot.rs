//! Snapshot discovery: `YYYY-MM-DD.csv` files in the snapshot directory.

use std::{
    fmt,
    path::{Path, PathBuf},
};

use anyhow::Context;
use chrono::NaiveDate;
use log::warn;

const SNAPSHOT_EXTENSION: &str = "csv";
const SNAPSHOT_DATE_FORMAT: &str = "%Y-%m-%d";

/// One dated snapshot file. Orders by date first, so a sorted list is the
/// processing order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct SnapshotId {
    pub date: NaiveDate,
    pub path: PathBuf,
}

impl SnapshotId {
    /// `None` unless the file is a `.csv` whose stem is a calendar date.
    pub fn from_path(path: &Path) -> Option<Self> {
        if path.extension()? != SNAPSHOT_EXTENSION {
            return None;
        }

        let stem = path.file_stem()?.to_str()?;
        let date = NaiveDate::parse_from_str(stem, SNAPSHOT_DATE_FORMAT).ok()?;

        Some(Self {
            date,
            path: path.to_path_buf(),
        })
    }
}

impl fmt::Display for SnapshotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path.display())
    }
}

/// All snapshots in `dir`, ascending by embedded date.
pub async fn list_snapshots(dir: &Path) -> anyhow::Result<Vec<SnapshotId>> {
    let mut entries = tokio::fs::read_dir(dir)
        .await
        .with_context(|| format!("Failed to read snapshot directory {}", dir.display()))?;

    let mut snapshots = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .with_context(|| format!("Failed to list snapshot directory {}", dir.display()))?
    {
        let path = entry.path();
        if !entry.file_type().await.map(|t| t.is_file()).unwrap_or(false) {
            continue;
        }

        match SnapshotId::from_path(&path) {
            Some(id) => snapshots.push(id),
            None => warn!("Ignoring {}: not a YYYY-MM-DD.csv snapshot", path.display()),
        }
    }

    snapshots.sort();
    Ok(snapshots)
}
