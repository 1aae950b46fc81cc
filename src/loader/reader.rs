//! Snapshot file parsing.
//!
//! A snapshot is a `;`-separated file with a header row and the columns
//! `offer_id;date;url;address;area;floor;release_date;price;house_material;lat;lon`.
//! Any bad row fails the whole file; rows are never skipped individually.

use std::{fs::File, io::Read, str::FromStr};

use chrono::NaiveDate;
use log::warn;
use rust_decimal::Decimal;
use serde::Deserialize;

use super::snapshot::SnapshotId;
use crate::db::models::Listing;
use crate::error::LoadError;

const COLUMNS: [&str; 11] = [
    "offer_id",
    "date",
    "url",
    "address",
    "area",
    "floor",
    "release_date",
    "price",
    "house_material",
    "lat",
    "lon",
];

/// Raw `area` values are scaled down by this factor (integer division).
const AREA_SCALE: i64 = 100;

/// Parsed snapshot: its batch date plus every offer in file order.
#[derive(Debug, Clone)]
pub struct SnapshotBatch {
    pub date: NaiveDate,
    pub listings: Vec<Listing>,
}

#[derive(Debug, Deserialize)]
struct RawOffer {
    offer_id: i64,
    date: NaiveDate,
    url: String,
    address: String,
    area: i64,
    floor: i32,
    release_date: i32,
    price: i64,
    house_material: String,
    lat: String,
    lon: String,
}

/// Read and coerce one snapshot file.
pub fn read_snapshot(id: &SnapshotId) -> Result<SnapshotBatch, LoadError> {
    let file = File::open(&id.path)
        .map_err(|e| LoadError::Format(format!("cannot open {}: {}", id, e)))?;
    parse_snapshot(file, id.date)
}

/// Parse snapshot content. `expected_date` is the identifier's date; it is
/// the batch date for an empty snapshot and a cross-check otherwise.
pub fn parse_snapshot<R: Read>(
    source: R,
    expected_date: NaiveDate,
) -> Result<SnapshotBatch, LoadError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b';')
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(source);

    let headers = reader
        .headers()
        .map_err(|e| LoadError::Format(describe_csv_error(&e)))?;
    if let Some(missing) = COLUMNS.iter().find(|c| !headers.iter().any(|h| h == **c)) {
        return Err(LoadError::Format(format!("header lacks column {}", missing)));
    }

    let mut listings = Vec::new();
    for result in reader.deserialize::<RawOffer>() {
        let raw = result.map_err(|e| LoadError::Format(describe_csv_error(&e)))?;
        listings.push(coerce(raw)?);
    }

    let date = match listings.first() {
        Some(first) => first.date,
        None => expected_date,
    };

    if let Some(other) = listings.iter().find(|l| l.date != date) {
        return Err(LoadError::Format(format!(
            "snapshot mixes dates {} and {} (offer {})",
            date, other.date, other.offer_id
        )));
    }

    if date != expected_date {
        warn!(
            "Snapshot rows are dated {} but the file is named for {}, using {}",
            date, expected_date, date
        );
    }

    Ok(SnapshotBatch { date, listings })
}

fn coerce(raw: RawOffer) -> Result<Listing, LoadError> {
    let field_error = |field: &str, detail: String| {
        LoadError::Format(format!("offer {}: {} {}", raw.offer_id, field, detail))
    };

    if raw.url.is_empty() {
        return Err(field_error("url", "is empty".to_string()));
    }
    if raw.address.is_empty() {
        return Err(field_error("address", "is empty".to_string()));
    }

    let area = i32::try_from(raw.area / AREA_SCALE)
        .map_err(|_| field_error("area", format!("{} out of range", raw.area)))?;
    let lat = Decimal::from_str(&raw.lat)
        .map_err(|e| field_error("lat", format!("{:?}: {}", raw.lat, e)))?;
    let lon = Decimal::from_str(&raw.lon)
        .map_err(|e| field_error("lon", format!("{:?}: {}", raw.lon, e)))?;

    Ok(Listing {
        offer_id: raw.offer_id,
        date: raw.date,
        url: raw.url,
        address: raw.address,
        area,
        floor: raw.floor,
        release_year: raw.release_date,
        price: raw.price,
        house_material: raw.house_material,
        lat,
        lon,
    })
}

fn describe_csv_error(e: &csv::Error) -> String {
    match e.position() {
        Some(pos) => format!("line {}: {}", pos.line(), e),
        None => e.to_string(),
    }
}
