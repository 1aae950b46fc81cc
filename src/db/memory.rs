//! In-memory store mirroring the PostgreSQL constraints, for tests.

use std::collections::BTreeMap;
use std::sync::Mutex;

use anyhow::bail;
use chrono::NaiveDate;
use rustc_hash::FxHashSet;

use super::batch::{CommitStats, SnapshotRows, INSERT_BATCH_SIZE};
use super::models::{AvgPrice, Listing, PriceObservation};
use super::store::{ExistenceOracle, SnapshotWriter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Table {
    Offers,
    Prices,
    AvgPrices,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Tables {
    pub offers: BTreeMap<i64, Listing>,
    pub prices: Vec<PriceObservation>,
    pub avg_prices: Vec<AvgPrice>,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    fail_on: Mutex<Option<Table>>,
    /// `(table, rows)` for every insert statement issued, committed or not
    batches: Mutex<Vec<(Table, usize)>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following insert into `table` fail.
    pub fn fail_inserts_into(&self, table: Table) {
        *self.fail_on.lock().unwrap() = Some(table);
    }

    pub fn snapshot(&self) -> Tables {
        self.tables.lock().unwrap().clone()
    }

    pub fn batches(&self) -> Vec<(Table, usize)> {
        self.batches.lock().unwrap().clone()
    }

    pub fn seed_avg_price(&self, avg: AvgPrice) {
        self.tables.lock().unwrap().avg_prices.push(avg);
    }

    fn check(&self, table: Table, rows: usize) -> anyhow::Result<()> {
        self.batches.lock().unwrap().push((table, rows));
        if *self.fail_on.lock().unwrap() == Some(table) {
            bail!("injected failure inserting into {:?}", table);
        }
        Ok(())
    }

    fn apply(&self, staged: &mut Tables, rows: &SnapshotRows) -> anyhow::Result<CommitStats> {
        let mut stats = CommitStats::default();

        for chunk in rows.listings.chunks(INSERT_BATCH_SIZE) {
            self.check(Table::Offers, chunk.len())?;
            for listing in chunk {
                if staged.offers.contains_key(&listing.offer_id) {
                    bail!("duplicate key offers.offer_id = {}", listing.offer_id);
                }
                if staged.offers.values().any(|o| o.url == listing.url) {
                    bail!("duplicate key offers.url = {}", listing.url);
                }
                staged.offers.insert(listing.offer_id, listing.clone());
                stats.listings += 1;
            }
        }

        for chunk in rows.prices.chunks(INSERT_BATCH_SIZE) {
            self.check(Table::Prices, chunk.len())?;
            for price in chunk {
                if !staged.offers.contains_key(&price.offer_id) {
                    bail!("foreign key violation: offer {} not found", price.offer_id);
                }
                staged.prices.push(price.clone());
                stats.prices += 1;
            }
        }

        for chunk in rows.avg_prices.chunks(INSERT_BATCH_SIZE) {
            self.check(Table::AvgPrices, chunk.len())?;
            for avg in chunk {
                let exists = staged
                    .avg_prices
                    .iter()
                    .any(|a| a.address == avg.address && a.date == avg.date);
                if !exists {
                    staged.avg_prices.push(avg.clone());
                    stats.avg_prices += 1;
                }
            }
        }

        Ok(stats)
    }
}

impl ExistenceOracle for MemoryStore {
    async fn existing_offer_ids(&self, candidates: &[i64]) -> anyhow::Result<FxHashSet<i64>> {
        let tables = self.tables.lock().unwrap();
        Ok(candidates
            .iter()
            .copied()
            .filter(|id| tables.offers.contains_key(id))
            .collect())
    }

    async fn observed_price_dates(&self) -> anyhow::Result<FxHashSet<NaiveDate>> {
        let tables = self.tables.lock().unwrap();
        Ok(tables.prices.iter().map(|p| p.date).collect())
    }

    async fn last_avg_price_before(
        &self,
        address: &str,
        date: NaiveDate,
    ) -> anyhow::Result<Option<AvgPrice>> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .avg_prices
            .iter()
            .filter(|a| a.address == address && a.date < date)
            .max_by_key(|a| a.date)
            .cloned())
    }
}

impl SnapshotWriter for MemoryStore {
    async fn commit_snapshot(&self, rows: &SnapshotRows) -> anyhow::Result<CommitStats> {
        let mut staged = self.snapshot();
        let stats = self.apply(&mut staged, rows)?;
        *self.tables.lock().unwrap() = staged;
        Ok(stats)
    }
}
