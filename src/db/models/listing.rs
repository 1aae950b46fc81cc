use chrono::NaiveDate;
use rust_decimal::Decimal;

/// A single real-estate offer as read from a snapshot.
///
/// Only the identity and descriptive columns land in `offers`; `date` and
/// `price` feed the price observation and average price rows instead.
/// An offer id is written at most once, ever. Later sightings with
/// different values are dropped, never merged.
#[derive(Debug, Clone, PartialEq)]
pub struct Listing {
    pub offer_id: i64,
    pub date: NaiveDate,
    pub url: String,
    pub address: String,
    /// Already scaled down by 100 from the snapshot's raw value
    pub area: i32,
    pub floor: i32,
    pub release_year: i32,
    pub price: i64,
    pub house_material: String,
    pub lat: Decimal,
    pub lon: Decimal,
}
