use tailor_core::models::NormalizedListing;
use tailor_core::table::ListingTable;
use tailor_core::traits::Sink;
use tailor_db::{DatabaseConfig, ListingRepository, PostgresSink};

use crate::integration::common::setup_test_db;

fn listing(title: &str, price: f64) -> NormalizedListing {
    NormalizedListing {
        title: title.into(),
        price,
        rating: 4.5,
        colors: 3,
        size: "M".into(),
        gender: "Men".into(),
        captured_at: "2024-01-01T00:00:00.000000Z".into(),
    }
}

#[tokio::test]
async fn health_check_succeeds() {
    let (pool, _url, _container) = setup_test_db().await;
    let repo = ListingRepository::new(pool);

    repo.health_check().await.unwrap();
}

#[tokio::test]
async fn replace_table_inserts_in_chunks() {
    let (pool, _url, _container) = setup_test_db().await;
    let repo = ListingRepository::new(pool);

    let listings: Vec<_> = (0..5u32)
        .map(|i| listing(&format!("Item {i}"), 16_000.0 * f64::from(i + 1)))
        .collect();
    let table = ListingTable::from_listings(&listings);

    let inserted = repo.replace_table("products", &table, 2).await.unwrap();
    assert_eq!(inserted, 5);

    let loaded = repo.load("products").await.unwrap();
    assert_eq!(loaded, listings);
}

#[tokio::test]
async fn replace_table_discards_previous_rows() {
    let (pool, _url, _container) = setup_test_db().await;
    let repo = ListingRepository::new(pool);

    let first = ListingTable::from_listings(&[listing("Old A", 1.0), listing("Old B", 2.0)]);
    repo.replace_table("products", &first, 1000).await.unwrap();

    let second = ListingTable::from_listings(&[listing("New", 3.0)]);
    repo.replace_table("products", &second, 1000).await.unwrap();

    let loaded = repo.load("products").await.unwrap();
    assert_eq!(loaded.len(), 1);
    assert_eq!(loaded[0].title, "New");
}

#[tokio::test]
async fn sink_writes_ascii_only_text() {
    let (pool, url, _container) = setup_test_db().await;
    let sink = PostgresSink::new(
        DatabaseConfig::new(url)
            .with_table("fashion_products")
            .with_chunk_size(1),
    );
    let table = ListingTable::from_listings(&[listing("Café ⭐ Tee", 1_599_840.0), listing("Plain", 10.0)]);

    let receipt = sink.write(&table).await.unwrap();
    assert_eq!(receipt.rows, 2);

    let loaded = ListingRepository::new(pool)
        .load("fashion_products")
        .await
        .unwrap();
    assert_eq!(loaded.len(), 2);
    assert_eq!(loaded[0].title, "Caf  Tee");
    assert_eq!(loaded[0].price, 1_599_840.0);
    assert_eq!(loaded[1].title, "Plain");
}

#[tokio::test]
async fn sink_can_keep_unicode_when_asked() {
    let (pool, url, _container) = setup_test_db().await;
    let sink = PostgresSink::new(DatabaseConfig::new(url).with_strip_non_ascii(false));
    let table = ListingTable::from_listings(&[listing("Café Tee", 10.0)]);

    sink.write(&table).await.unwrap();

    let loaded = ListingRepository::new(pool).load("products").await.unwrap();
    assert_eq!(loaded[0].title, "Café Tee");
}
