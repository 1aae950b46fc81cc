use super::models::{AvgPrice, Listing, PriceObservation};

/// Rows per multi-row INSERT statement.
pub const INSERT_BATCH_SIZE: usize = 100;

/// Everything one snapshot contributes to the store.
///
/// Committed as a single unit: either all three row sets become visible or
/// none of them do.
#[derive(Debug, Clone, Default)]
pub struct SnapshotRows {
    pub listings: Vec<Listing>,
    pub prices: Vec<PriceObservation>,
    pub avg_prices: Vec<AvgPrice>,
}

impl SnapshotRows {
    pub fn is_empty(&self) -> bool {
        self.listings.is_empty() && self.prices.is_empty() && self.avg_prices.is_empty()
    }
}

/// Row counts actually inserted by a commit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CommitStats {
    pub listings: u64,
    pub prices: u64,
    pub avg_prices: u64,
}

