use log::debug;

use crate::db::{CommitStats, SnapshotRows, SnapshotWriter};
use crate::error::{LoadError, Stage};

/// Commit one snapshot's rows atomically. An empty row set skips the
/// round trip to the store.
pub async fn write_snapshot<W: SnapshotWriter>(
    writer: &W,
    rows: &SnapshotRows,
) -> Result<CommitStats, LoadError> {
    if rows.is_empty() {
        debug!("Nothing new to store");
        return Ok(CommitStats::default());
    }

    writer
        .commit_snapshot(rows)
        .await
        .map_err(|e| LoadError::store(Stage::Writing, e))
}
