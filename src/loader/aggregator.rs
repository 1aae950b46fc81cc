//! Per-address daily average price per square metre.
//!
//! Each address in a snapshot gets `round(mean(price / area), 2)` and the
//! change against the most recent strictly earlier average stored for that
//! address. The whole batch is used, not only offers seen for the first time.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use log::debug;
use rust_decimal::Decimal;

use crate::db::models::{AvgPrice, Listing};
use crate::db::ExistenceOracle;
use crate::error::{LoadError, Stage};

const AVG_PRICE_DECIMALS: u32 = 2;

/// One [`AvgPrice`] per distinct address in `batch`, ordered by address.
///
/// Fails with [`LoadError::Data`] if any offer has zero area.
pub async fn avg_prices<O: ExistenceOracle>(
    oracle: &O,
    batch: &[Listing],
    date: NaiveDate,
) -> Result<Vec<AvgPrice>, LoadError> {
    let mut by_address: BTreeMap<&str, Vec<&Listing>> = BTreeMap::new();
    for listing in batch {
        by_address.entry(listing.address.as_str()).or_default().push(listing);
    }

    let mut rows = Vec::with_capacity(by_address.len());
    for (address, group) in by_address {
        let avg_price = mean_price_per_area(&group)?;

        let previous = oracle
            .last_avg_price_before(address, date)
            .await
            .map_err(|e| LoadError::store(Stage::Aggregating, e))?;
        let avg_price_change = previous.map(|p| avg_price - p.avg_price);

        debug!(
            "{}: avg {} change {:?} over {} offers",
            address,
            avg_price,
            avg_price_change,
            group.len()
        );

        rows.push(AvgPrice {
            address: address.to_string(),
            date,
            avg_price,
            avg_price_change,
        });
    }

    Ok(rows)
}

/// Mean of `price / area`, rounded half to even to two decimals.
fn mean_price_per_area(group: &[&Listing]) -> Result<Decimal, LoadError> {
    let mut total = Decimal::ZERO;
    for listing in group {
        if listing.area == 0 {
            return Err(LoadError::Data(format!(
                "offer {} at {} has zero area",
                listing.offer_id, listing.address
            )));
        }

        let per_area = Decimal::from(listing.price)
            .checked_div(Decimal::from(listing.area))
            .ok_or_else(|| {
                LoadError::Data(format!(
                    "offer {}: price per area overflows",
                    listing.offer_id
                ))
            })?;
        total = total.checked_add(per_area).ok_or_else(|| {
            LoadError::Data(format!("sum of prices per area overflows at offer {}", listing.offer_id))
        })?;
    }

    let mean = total / Decimal::from(group.len());
    Ok(mean.round_dp(AVG_PRICE_DECIMALS))
}
