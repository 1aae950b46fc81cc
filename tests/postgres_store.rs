//! Runs against a disposable PostgreSQL database configured through
//! `REALTY__POSTGRES__*` (or config.yaml). Tables are truncated, so each
//! test holds [`DB_LOCK`] for its whole body.
//!
//! cargo test --test postgres_store -- --ignored

use std::str::FromStr;

use chrono::NaiveDate;
use realty::db::models::{AvgPrice, Listing, PriceObservation};
use realty::db::{ExistenceOracle, SnapshotRows, SnapshotWriter};
use realty::{PostgresClient, Settings};
use rust_decimal::Decimal;
use tokio::sync::{Mutex, MutexGuard};

static DB_LOCK: Mutex<()> = Mutex::const_new(());

fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

fn listing(offer_id: i64, day: NaiveDate, price: i64) -> Listing {
    Listing {
        offer_id,
        date: day,
        url: format!("https://novosibirsk.n1.ru/view/{}/", offer_id),
        address: "Ядринцевская, 55".to_string(),
        area: 10,
        floor: 4,
        release_year: 2008,
        price,
        house_material: "Кирпич".to_string(),
        lat: Decimal::from_str("55.038561234567891").unwrap(),
        lon: Decimal::from_str("82.923451234567891").unwrap(),
    }
}

async fn fresh_db() -> (MutexGuard<'static, ()>, PostgresClient) {
    let guard = DB_LOCK.lock().await;
    let settings = Settings::new().unwrap();
    let db = PostgresClient::new(settings.postgres).await.unwrap();
    db.ensure_schema().await.unwrap();
    db.pool
        .get()
        .await
        .unwrap()
        .batch_execute("TRUNCATE avg_prices, prices, offers RESTART IDENTITY CASCADE")
        .await
        .unwrap();
    (guard, db)
}

#[tokio::test]
#[ignore]
async fn test_commit_then_query_existence() {
    let (_guard, db) = fresh_db().await;
    let day = date("2021-09-03");
    let offers: Vec<Listing> = (1..=150).map(|id| listing(id, day, 100 * id)).collect();

    let stats = db
        .commit_snapshot(&SnapshotRows {
            prices: offers.iter().map(PriceObservation::from).collect(),
            avg_prices: vec![AvgPrice {
                address: "Ядринцевская, 55".to_string(),
                date: day,
                avg_price: Decimal::from_str("755.00").unwrap(),
                avg_price_change: None,
            }],
            listings: offers,
        })
        .await
        .unwrap();

    assert_eq!(stats.listings, 150);
    assert_eq!(stats.prices, 150);
    assert_eq!(stats.avg_prices, 1);

    let known = db.existing_offer_ids(&[1, 150, 151]).await.unwrap();
    assert!(known.contains(&1) && known.contains(&150) && !known.contains(&151));
    assert!(db.observed_price_dates().await.unwrap().contains(&day));

    let last = db
        .last_avg_price_before("Ядринцевская, 55", date("2021-09-04"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(last.avg_price, Decimal::from_str("755.00").unwrap());
    assert!(db
        .last_avg_price_before("Ядринцевская, 55", day)
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
#[ignore]
async fn test_failed_commit_leaves_nothing_behind() {
    let (_guard, db) = fresh_db().await;
    let day = date("2021-09-03");

    // Price for an offer that does not exist violates the foreign key
    let result = db
        .commit_snapshot(&SnapshotRows {
            listings: vec![listing(1, day, 100)],
            prices: vec![PriceObservation { offer_id: 999, date: day, price: 1 }],
            avg_prices: vec![],
        })
        .await;

    assert!(result.is_err());
    assert!(db.existing_offer_ids(&[1]).await.unwrap().is_empty());
    assert!(db.observed_price_dates().await.unwrap().is_empty());
}

#[tokio::test]
#[ignore]
async fn test_existing_average_is_kept() {
    let (_guard, db) = fresh_db().await;
    let day = date("2021-09-03");
    let avg = |value: &str| AvgPrice {
        address: "Ядринцевская, 55".to_string(),
        date: day,
        avg_price: Decimal::from_str(value).unwrap(),
        avg_price_change: None,
    };

    db.commit_snapshot(&SnapshotRows {
        avg_prices: vec![avg("10.00")],
        ..Default::default()
    })
    .await
    .unwrap();
    let stats = db
        .commit_snapshot(&SnapshotRows {
            avg_prices: vec![avg("99.00")],
            ..Default::default()
        })
        .await
        .unwrap();

    assert_eq!(stats.avg_prices, 0);
    let kept = db
        .last_avg_price_before("Ядринцевская, 55", date("2021-09-04"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(kept.avg_price, Decimal::from_str("10.00").unwrap());
}
