use chrono::NaiveDate;

use super::Listing;

/// Price seen for an offer on a given date (PostgreSQL `prices`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceObservation {
    pub offer_id: i64,
    pub date: NaiveDate,
    pub price: i64,
}

impl From<&Listing> for PriceObservation {
    fn from(listing: &Listing) -> Self {
        Self {
            offer_id: listing.offer_id,
            date: listing.date,
            price: listing.price,
        }
    }
}
