//! Drives snapshots through read → dedup → aggregate → write, one file at a
//! time in date order.
//!
//! Averages look back at earlier dates, so files must be committed in
//! chronological order and never concurrently. A failing file is logged and
//! skipped; it is not retried within the same run. Cancellation is only
//! observed between files, so the store always reflects whole snapshots.

use std::{
    any::Any,
    panic::AssertUnwindSafe,
    path::PathBuf,
    sync::Arc,
    time::Instant,
};

use futures::FutureExt;
use log::{debug, error, info};
use tokio_util::sync::CancellationToken;

use super::{
    aggregator::avg_prices,
    dedup::{new_listings, new_price_observations},
    reader::read_snapshot,
    snapshot::{list_snapshots, SnapshotId},
    writer::write_snapshot,
};
use crate::db::{CommitStats, ExistenceOracle, SnapshotRows, SnapshotWriter};
use crate::error::LoadError;

/// Result of one pass over the snapshot directory.
#[derive(Debug, Default)]
pub struct RunSummary {
    pub committed: Vec<(SnapshotId, CommitStats)>,
    pub skipped: Vec<(SnapshotId, LoadError)>,
    /// Set when the run stopped early on cancellation
    pub cancelled: bool,
}

pub struct Pipeline<S> {
    store: Arc<S>,
    snapshot_dir: PathBuf,
}

impl<S> Pipeline<S>
where
    S: ExistenceOracle + SnapshotWriter,
{
    pub fn new(store: Arc<S>, snapshot_dir: impl Into<PathBuf>) -> Self {
        Self {
            store,
            snapshot_dir: snapshot_dir.into(),
        }
    }

    /// Processes every snapshot in the directory, oldest first.
    ///
    /// Only a failure to list the directory is returned as an error; per-file
    /// failures end up in [`RunSummary::skipped`].
    pub async fn run(&self, cancellation_token: CancellationToken) -> anyhow::Result<RunSummary> {
        let snapshots = list_snapshots(&self.snapshot_dir).await?;
        info!(
            "Found {} snapshots in {}",
            snapshots.len(),
            self.snapshot_dir.display()
        );

        let mut summary = RunSummary::default();
        for snapshot in snapshots {
            if cancellation_token.is_cancelled() {
                info!("Cancellation requested, stopping before {}", snapshot);
                summary.cancelled = true;
                break;
            }

            let start = Instant::now();
            match self.process_guarded(&snapshot).await {
                Ok(stats) => {
                    info!(
                        "Saved {} in {:?} ({} offers, {} prices, {} average prices)",
                        snapshot,
                        start.elapsed(),
                        stats.listings,
                        stats.prices,
                        stats.avg_prices
                    );
                    summary.committed.push((snapshot, stats));
                },
                Err(e) => {
                    let stage = e
                        .stage()
                        .map(|s| s.to_string())
                        .unwrap_or_else(|| "unknown stage".to_string());
                    error!("Skipping {}: {} while {}: {}", snapshot, e.kind(), stage, e);
                    summary.skipped.push((snapshot, e));
                },
            }
        }

        info!(
            "Run finished: {} committed, {} skipped{}",
            summary.committed.len(),
            summary.skipped.len(),
            if summary.cancelled { ", cancelled" } else { "" }
        );
        Ok(summary)
    }

    /// [`Self::process_snapshot`] with panics turned into [`LoadError::Unexpected`].
    async fn process_guarded(&self, snapshot: &SnapshotId) -> Result<CommitStats, LoadError> {
        match AssertUnwindSafe(self.process_snapshot(snapshot)).catch_unwind().await {
            Ok(result) => result,
            Err(panic) => Err(LoadError::Unexpected(panic_message(&*panic))),
        }
    }

    /// Loads one snapshot and commits its new rows in a single transaction.
    pub async fn process_snapshot(&self, snapshot: &SnapshotId) -> Result<CommitStats, LoadError> {
        info!("Read file: {}", snapshot);
        let id = snapshot.clone();
        let batch = tokio::task::spawn_blocking(move || read_snapshot(&id))
            .await
            .map_err(|e| LoadError::Unexpected(format!("snapshot reader task failed: {}", e)))??;
        debug!("Found {} offers dated {}", batch.listings.len(), batch.date);

        let store = self.store.as_ref();

        let listings = new_listings(store, &batch.listings).await?;
        debug!("Offers for storing: {}", listings.len());

        let prices = new_price_observations(store, &batch.listings, batch.date).await?;
        debug!("Prices for storing: {}", prices.len());

        let avg_prices = avg_prices(store, &batch.listings, batch.date).await?;
        debug!("Average prices for storing: {}", avg_prices.len());

        let rows = SnapshotRows {
            listings,
            prices,
            avg_prices,
        };
        write_snapshot(store, &rows).await
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic with non-string payload".to_string()
    }
}
