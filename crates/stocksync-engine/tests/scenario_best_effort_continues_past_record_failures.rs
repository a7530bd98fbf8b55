use anyhow::Result;
use stocksync_engine::{
    build_resolution_index, reconcile_batch, BatchMode, ErrorKind, QuantityRecord, SyncRunArgs,
};
use stocksync_testkit::MemoryCatalog;

#[tokio::test]
async fn a_failing_product_update_does_not_stop_the_batch() -> Result<()> {
    let mut catalog = MemoryCatalog::new()
        .with_product("1111111111111", 0)
        .with_product("2222222222222", 0)
        .with_product("3333333333333", 0)
        .fail_product_update("2222222222222");

    let records = vec![
        QuantityRecord::new("1111111111111", 1),
        QuantityRecord::new("2222222222222", 2),
        QuantityRecord::new("3333333333333", 3),
    ];

    let index = build_resolution_index(&mut catalog, &records).await;
    let outcome = reconcile_batch(
        &mut catalog,
        &records,
        &index,
        SyncRunArgs {
            mode: BatchMode::BestEffort,
            sync_id: None,
        },
    )
    .await?;

    // The batch still "succeeds" at the process level; the failure is in
    // the per-record results.
    assert!(outcome.succeeded);
    assert_eq!(outcome.results.len(), 3);
    assert_eq!(outcome.failed_records(), 1);
    assert_eq!(
        outcome.results[1].error,
        Some(ErrorKind::ProductUpdateFailed)
    );

    // Surrounding records were applied immediately and independently.
    assert_eq!(catalog.product_quantity("1111111111111"), Some(1));
    assert_eq!(catalog.product_quantity("2222222222222"), Some(0));
    assert_eq!(catalog.product_quantity("3333333333333"), Some(3));
    Ok(())
}

#[tokio::test]
async fn a_failing_variant_update_is_recorded_and_skipped() -> Result<()> {
    let mut catalog = MemoryCatalog::new()
        .with_product("1111111111111", 0)
        .with_variant("1111111111111", 7, 0)
        .with_product("2222222222222", 0)
        .fail_variant_update(7);

    let records = vec![
        QuantityRecord::new("1111111111111", 9),
        QuantityRecord::new("2222222222222", 4),
    ];

    let index = build_resolution_index(&mut catalog, &records).await;
    let outcome = reconcile_batch(
        &mut catalog,
        &records,
        &index,
        SyncRunArgs {
            mode: BatchMode::BestEffort,
            sync_id: None,
        },
    )
    .await?;

    assert!(outcome.succeeded);
    assert_eq!(
        outcome.results[0].error,
        Some(ErrorKind::VariantUpdateFailed)
    );
    // The product side of the same record still went through.
    assert!(outcome.results[0].product_update_applied);
    assert_eq!(catalog.product_quantity("1111111111111"), Some(9));
    assert_eq!(catalog.variant_quantity(7), Some(0));

    // And the next record was untouched by the failure.
    assert_eq!(outcome.results[1].error, None);
    assert_eq!(catalog.product_quantity("2222222222222"), Some(4));
    Ok(())
}
