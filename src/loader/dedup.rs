//! Filtering a parsed snapshot against what the store already holds.

use chrono::NaiveDate;
use rustc_hash::FxHashSet;

use crate::db::models::{Listing, PriceObservation};
use crate::db::ExistenceOracle;
use crate::error::{LoadError, Stage};

/// Offers not yet in the store, in batch order. A repeated id within the
/// batch keeps its first occurrence.
pub async fn new_listings<O: ExistenceOracle>(
    oracle: &O,
    batch: &[Listing],
) -> Result<Vec<Listing>, LoadError> {
    let candidates: Vec<i64> = batch.iter().map(|l| l.offer_id).collect();
    let mut seen = oracle
        .existing_offer_ids(&candidates)
        .await
        .map_err(|e| LoadError::store(Stage::Deduplicating, e))?;

    Ok(batch
        .iter()
        .filter(|l| seen.insert(l.offer_id))
        .cloned()
        .collect())
}

/// One observation per offer in the batch, or none at all when `date`
/// already has observations.
///
/// Dedup is by date only: a date that was partially stored once is never
/// topped up.
pub async fn new_price_observations<O: ExistenceOracle>(
    oracle: &O,
    batch: &[Listing],
    date: NaiveDate,
) -> Result<Vec<PriceObservation>, LoadError> {
    let observed: FxHashSet<NaiveDate> = oracle
        .observed_price_dates()
        .await
        .map_err(|e| LoadError::store(Stage::Deduplicating, e))?;

    if observed.contains(&date) {
        return Ok(Vec::new());
    }

    let mut seen = FxHashSet::default();
    Ok(batch
        .iter()
        .filter(|l| seen.insert(l.offer_id))
        .map(PriceObservation::from)
        .collect())
}
