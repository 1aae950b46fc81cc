use anyhow::Context;
use chrono::NaiveDate;
use deadpool_postgres::Transaction;
use log::error;
use rustc_hash::FxHashSet;
use tokio_postgres::types::ToSql;

use crate::db::batch::{CommitStats, SnapshotRows, INSERT_BATCH_SIZE};
use crate::db::models::{AvgPrice, Listing, PriceObservation};
use crate::db::postgres::PostgresClient;
use crate::db::store::{ExistenceOracle, SnapshotWriter};

/// Sanitize a string for PostgreSQL by removing null bytes (0x00)
/// which are invalid in UTF-8 text columns
fn sanitize_string(s: &str) -> String {
    s.replace('\0', "")
}

/// Build `($1, $2, ...), ($n, ...)` for a multi-row VALUES clause.
fn values_clause(rows: usize, cols_per_row: usize) -> String {
    (0..rows)
        .map(|i| {
            let start = i * cols_per_row + 1;
            let placeholders: Vec<String> = (start..start + cols_per_row)
                .map(|n| format!("${}", n))
                .collect();
            format!("({})", placeholders.join(", "))
        })
        .collect::<Vec<_>>()
        .join(", ")
}

impl ExistenceOracle for PostgresClient {
    async fn existing_offer_ids(&self, candidates: &[i64]) -> anyhow::Result<FxHashSet<i64>> {
        if candidates.is_empty() {
            return Ok(FxHashSet::default());
        }

        let client = self.pool.get().await?;
        let rows = client
            .query(
                "SELECT offer_id FROM offers WHERE offer_id = ANY($1)",
                &[&candidates],
            )
            .await
            .context("Failed to query existing offer ids")?;

        Ok(rows.iter().map(|row| row.get::<_, i64>("offer_id")).collect())
    }

    async fn observed_price_dates(&self) -> anyhow::Result<FxHashSet<NaiveDate>> {
        let client = self.pool.get().await?;
        let rows = client
            .query("SELECT DISTINCT date FROM prices", &[])
            .await
            .context("Failed to query price dates")?;

        Ok(rows.iter().map(|row| row.get::<_, NaiveDate>("date")).collect())
    }

    async fn last_avg_price_before(
        &self,
        address: &str,
        date: NaiveDate,
    ) -> anyhow::Result<Option<AvgPrice>> {
        let client = self.pool.get().await?;
        let query = r#"
            SELECT address, date, avg_price, avg_price_change
            FROM avg_prices
            WHERE address = $1 AND date < $2
            ORDER BY date DESC
            LIMIT 1
        "#;

        let row = client
            .query_opt(query, &[&address, &date])
            .await
            .with_context(|| {
                format!("Failed to get average price for address {} before {}", address, date)
            })?;

        Ok(row.map(|r| AvgPrice {
            address: r.get("address"),
            date: r.get("date"),
            avg_price: r.get("avg_price"),
            avg_price_change: r.get("avg_price_change"),
        }))
    }
}

impl SnapshotWriter for PostgresClient {
    async fn commit_snapshot(&self, rows: &SnapshotRows) -> anyhow::Result<CommitStats> {
        let mut client = self.pool.get().await?;
        let tx = client
            .transaction()
            .await
            .context("Failed to open snapshot transaction")?;

        // Offers first: prices reference them
        let listings = insert_listings(&tx, &rows.listings).await?;
        let prices = insert_prices(&tx, &rows.prices).await?;
        let avg_prices = insert_avg_prices(&tx, &rows.avg_prices).await?;

        // Dropping `tx` on any early return above rolls everything back
        tx.commit()
            .await
            .context("Failed to commit snapshot transaction")?;

        Ok(CommitStats {
            listings,
            prices,
            avg_prices,
        })
    }
}

async fn insert_listings(tx: &Transaction<'_>, listings: &[Listing]) -> anyhow::Result<u64> {
    const COLS_PER_ROW: usize = 9;

    let mut inserted = 0;
    for chunk in listings.chunks(INSERT_BATCH_SIZE) {
        let query = format!(
            r#"
            INSERT INTO offers (
                offer_id, url, address, area, floor, release_year, house_material, lat, lon
            ) VALUES {}
            "#,
            values_clause(chunk.len(), COLS_PER_ROW)
        );

        let sanitized: Vec<(String, String, String)> = chunk
            .iter()
            .map(|l| {
                (
                    sanitize_string(&l.url),
                    sanitize_string(&l.address),
                    sanitize_string(&l.house_material),
                )
            })
            .collect();

        let mut params: Vec<&(dyn ToSql + Sync)> = Vec::with_capacity(chunk.len() * COLS_PER_ROW);
        for (i, listing) in chunk.iter().enumerate() {
            params.push(&listing.offer_id);
            params.push(&sanitized[i].0);
            params.push(&sanitized[i].1);
            params.push(&listing.area);
            params.push(&listing.floor);
            params.push(&listing.release_year);
            params.push(&sanitized[i].2);
            params.push(&listing.lat);
            params.push(&listing.lon);
        }

        inserted += tx.execute(&query, &params).await.map_err(|e| {
            error!("Failed to batch insert {} offers: {:?}", chunk.len(), e);
            e
        })?;
    }

    Ok(inserted)
}

async fn insert_prices(tx: &Transaction<'_>, prices: &[PriceObservation]) -> anyhow::Result<u64> {
    const COLS_PER_ROW: usize = 3;

    let mut inserted = 0;
    for chunk in prices.chunks(INSERT_BATCH_SIZE) {
        let query = format!(
            "INSERT INTO prices (address, date, price) VALUES {}",
            values_clause(chunk.len(), COLS_PER_ROW)
        );

        let mut params: Vec<&(dyn ToSql + Sync)> = Vec::with_capacity(chunk.len() * COLS_PER_ROW);
        for price in chunk {
            params.push(&price.offer_id);
            params.push(&price.date);
            params.push(&price.price);
        }

        inserted += tx.execute(&query, &params).await.map_err(|e| {
            error!("Failed to batch insert {} prices: {:?}", chunk.len(), e);
            e
        })?;
    }

    Ok(inserted)
}

async fn insert_avg_prices(tx: &Transaction<'_>, avg_prices: &[AvgPrice]) -> anyhow::Result<u64> {
    const COLS_PER_ROW: usize = 4;

    let mut inserted = 0;
    for chunk in avg_prices.chunks(INSERT_BATCH_SIZE) {
        // An (address, date) that already has an average keeps it
        let query = format!(
            r#"
            INSERT INTO avg_prices (address, date, avg_price, avg_price_change)
            VALUES {}
            ON CONFLICT (address, date) DO NOTHING
            "#,
            values_clause(chunk.len(), COLS_PER_ROW)
        );

        let addresses: Vec<String> = chunk.iter().map(|a| sanitize_string(&a.address)).collect();

        let mut params: Vec<&(dyn ToSql + Sync)> = Vec::with_capacity(chunk.len() * COLS_PER_ROW);
        for (i, avg) in chunk.iter().enumerate() {
            params.push(&addresses[i]);
            params.push(&avg.date);
            params.push(&avg.avg_price);
            params.push(&avg.avg_price_change);
        }

        inserted += tx.execute(&query, &params).await.map_err(|e| {
            error!("Failed to batch insert {} average prices: {:?}", chunk.len(), e);
            e
        })?;
    }

    Ok(inserted)
}
