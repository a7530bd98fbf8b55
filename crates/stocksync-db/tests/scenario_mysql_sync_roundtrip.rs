// DB-backed round trip against a real MySQL schema, skipped if
// STOCKSYNC_DATABASE_URL is not set. Creates its own uniquely-prefixed
// tables and drops them at the end.

use anyhow::Result;
use stocksync_engine::{
    build_resolution_index, reconcile_batch, BatchMode, QuantityRecord, SyncRunArgs,
};
use uuid::Uuid;

async fn create_catalog_tables(pool: &sqlx::MySqlPool, prefix: &str) -> Result<()> {
    sqlx::query(&format!(
        "create table {prefix}product (\
           id_product int not null auto_increment primary key, \
           ean13 varchar(13), \
           quantity int not null default 0)"
    ))
    .execute(pool)
    .await?;

    sqlx::query(&format!(
        "create table {prefix}product_attribute (\
           id_product_attribute int not null auto_increment primary key, \
           id_product int not null, \
           ean13 varchar(13))"
    ))
    .execute(pool)
    .await?;

    sqlx::query(&format!(
        "create table {prefix}stock_available (\
           id_stock_available int not null auto_increment primary key, \
           id_product int not null, \
           id_product_attribute int not null, \
           quantity int not null default 0)"
    ))
    .execute(pool)
    .await?;

    Ok(())
}

async fn drop_catalog_tables(pool: &sqlx::MySqlPool, prefix: &str) -> Result<()> {
    for suffix in ["product", "product_attribute", "stock_available"] {
        sqlx::query(&format!("drop table if exists {prefix}{suffix}"))
            .execute(pool)
            .await?;
    }
    Ok(())
}

async fn product_quantity(pool: &sqlx::MySqlPool, prefix: &str, ean13: &str) -> Result<i64> {
    let (q,): (i64,) = sqlx::query_as(&format!(
        "select quantity from {prefix}product where ean13 = ?"
    ))
    .bind(ean13)
    .fetch_one(pool)
    .await?;
    Ok(q)
}

async fn stock_quantity(pool: &sqlx::MySqlPool, prefix: &str, id: i64) -> Result<i64> {
    let (q,): (i64,) = sqlx::query_as(&format!(
        "select quantity from {prefix}stock_available where id_stock_available = ?"
    ))
    .bind(id)
    .fetch_one(pool)
    .await?;
    Ok(q)
}

#[tokio::test]
async fn sync_applies_product_and_variant_quantities() -> Result<()> {
    let url = match std::env::var(stocksync_db::ENV_DB_URL) {
        Ok(v) => v,
        Err(_) => {
            eprintln!("SKIP: STOCKSYNC_DATABASE_URL not set");
            return Ok(());
        }
    };

    let pool = sqlx::mysql::MySqlPoolOptions::new()
        .max_connections(2)
        .connect(&url)
        .await?;

    let prefix = format!("t{}_", Uuid::new_v4().simple());
    create_catalog_tables(&pool, &prefix).await?;

    // One product with a variant, one product without.
    sqlx::query(&format!(
        "insert into {prefix}product (ean13, quantity) values ('1234567890123', 0), ('9999999999999', 0)"
    ))
    .execute(&pool)
    .await?;
    sqlx::query(&format!(
        "insert into {prefix}product_attribute (id_product, ean13) values (1, '1234567890123')"
    ))
    .execute(&pool)
    .await?;
    sqlx::query(&format!(
        "insert into {prefix}stock_available (id_product, id_product_attribute, quantity) \
         values (1, 1, 0)"
    ))
    .execute(&pool)
    .await?;

    let records = vec![
        QuantityRecord::new("1234567890123", 5),
        QuantityRecord::new("9999999999999", 3),
    ];

    let mut gateway = stocksync_db::MySqlCatalog::new(pool.clone(), &prefix)?;
    let index = build_resolution_index(&mut gateway, &records).await;
    assert_eq!(index.len(), 1);
    assert_eq!(index.secondary_id("1234567890123"), Some(1));
    assert!(!index.contains("9999999999999"));

    let outcome = reconcile_batch(
        &mut gateway,
        &records,
        &index,
        SyncRunArgs {
            mode: BatchMode::BestEffort,
            sync_id: None,
        },
    )
    .await?;

    assert!(outcome.succeeded);
    assert_eq!(outcome.failed_records(), 0);
    assert!(outcome.results[0].product_update_applied);
    assert!(outcome.results[0].variant_update_applied);
    assert!(outcome.results[1].product_update_applied);
    assert!(!outcome.results[1].variant_update_applied);

    assert_eq!(product_quantity(&pool, &prefix, "1234567890123").await?, 5);
    assert_eq!(product_quantity(&pool, &prefix, "9999999999999").await?, 3);
    assert_eq!(stock_quantity(&pool, &prefix, 1).await?, 5);

    // Atomic mode over the same rows: clean batch commits durably.
    let records = vec![QuantityRecord::new("1234567890123", 7)];
    let index = build_resolution_index(&mut gateway, &records).await;
    let outcome = reconcile_batch(
        &mut gateway,
        &records,
        &index,
        SyncRunArgs {
            mode: BatchMode::Atomic,
            sync_id: None,
        },
    )
    .await?;

    assert!(outcome.succeeded);
    assert_eq!(product_quantity(&pool, &prefix, "1234567890123").await?, 7);
    assert_eq!(stock_quantity(&pool, &prefix, 1).await?, 7);

    drop_catalog_tables(&pool, &prefix).await?;
    Ok(())
}
