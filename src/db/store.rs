//! Narrow repository interface the loader depends on.
//!
//! Reads go through [`ExistenceOracle`], the one write path through
//! [`SnapshotWriter`]. Both are implemented by the PostgreSQL client; tests
//! use an in-memory store.

use std::future::Future;

use chrono::NaiveDate;
use rustc_hash::FxHashSet;

use super::batch::{CommitStats, SnapshotRows};
use super::models::AvgPrice;

/// Read-only view of what has already been persisted.
pub trait ExistenceOracle: Send + Sync {
    /// Subset of `candidates` already present in `offers`.
    fn existing_offer_ids(
        &self,
        candidates: &[i64],
    ) -> impl Future<Output = anyhow::Result<FxHashSet<i64>>> + Send;

    /// Every distinct date with at least one row in `prices`.
    fn observed_price_dates(
        &self,
    ) -> impl Future<Output = anyhow::Result<FxHashSet<NaiveDate>>> + Send;

    /// Most recent average for `address` strictly before `date`.
    fn last_avg_price_before(
        &self,
        address: &str,
        date: NaiveDate,
    ) -> impl Future<Output = anyhow::Result<Option<AvgPrice>>> + Send;
}

/// Atomic persistence of one snapshot's rows.
pub trait SnapshotWriter: Send + Sync {
    /// Inserts offers, then prices, then averages in one transaction,
    /// chunked into [`INSERT_BATCH_SIZE`](super::INSERT_BATCH_SIZE) row
    /// statements. On error nothing from `rows` is visible.
    fn commit_snapshot(
        &self,
        rows: &SnapshotRows,
    ) -> impl Future<Output = anyhow::Result<CommitStats>> + Send;
}
