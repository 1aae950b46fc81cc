use chrono::NaiveDate;
use rust_decimal::Decimal;

/// Daily average price per unit area for one address (PostgreSQL `avg_prices`).
///
/// At most one row exists per `(address, date)`. `avg_price_change` is the
/// difference to the most recent strictly earlier row for the same address,
/// `None` when the address has no history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvgPrice {
    pub address: String,
    pub date: NaiveDate,
    pub avg_price: Decimal,
    pub avg_price_change: Option<Decimal>,
}
