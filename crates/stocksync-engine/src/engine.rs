use crate::{
    BatchMode, BatchOutcome, CatalogGateway, ErrorKind, QuantityRecord, RecordResult,
    ResolutionIndex,
};
use anyhow::{Context, Result};
use std::collections::BTreeSet;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Parameters for one reconciliation run.
#[derive(Clone, Debug)]
pub struct SyncRunArgs {
    pub mode: BatchMode,
    /// Caller-provided run id for log/report correlation; generated when
    /// absent.
    pub sync_id: Option<Uuid>,
}

/// Pre-pass: map each distinct identifier to its variant stock row id.
///
/// Runs strictly before any write and queries each identifier at most
/// once, regardless of how often it repeats in the input. A failed lookup
/// excludes that identifier and bumps `lookup_failures`; it never aborts
/// the build. A lookup returning no row is not an error — it just means
/// there is no variant to update for that identifier.
pub async fn build_resolution_index<G: CatalogGateway + ?Sized>(
    gateway: &mut G,
    records: &[QuantityRecord],
) -> ResolutionIndex {
    let mut index = ResolutionIndex::default();
    let mut seen: BTreeSet<&str> = BTreeSet::new();

    for (i, r) in records.iter().enumerate() {
        if !seen.insert(r.identifier.as_str()) {
            continue;
        }

        match gateway.resolve_secondary_id(&r.identifier).await {
            Ok(Some(secondary_id)) => index.insert(&r.identifier, secondary_id),
            Ok(None) => {}
            Err(err) => {
                warn!(
                    record = i,
                    identifier = %r.identifier,
                    error = %err,
                    "secondary id lookup failed; identifier excluded from index"
                );
                index.lookup_failures += 1;
            }
        }
    }

    index
}

/// Apply each record to the catalog, in input order, under the selected
/// failure policy.
///
/// Both modes run the loop to completion over every record. In atomic
/// mode the whole batch lives in one scope, opened before the first write
/// and closed exactly once: committed when no record errored, rolled back
/// otherwise. Opening the scope is the only fatal error here — nothing
/// has been written at that point. Commit/rollback failures are logged
/// and leave the already-decided outcome untouched.
pub async fn reconcile_batch<G: CatalogGateway + ?Sized>(
    gateway: &mut G,
    records: &[QuantityRecord],
    index: &ResolutionIndex,
    args: SyncRunArgs,
) -> Result<BatchOutcome> {
    let sync_id = args.sync_id.unwrap_or_else(Uuid::new_v4);

    let mut outcome = BatchOutcome {
        sync_id,
        mode: args.mode,
        succeeded: true,
        results: Vec::with_capacity(records.len()),
    };

    if args.mode == BatchMode::Atomic {
        gateway
            .begin_atomic()
            .await
            .context("failed to open the batch transaction")?;
    }

    for (i, r) in records.iter().enumerate() {
        info!(
            record = i,
            identifier = %r.identifier,
            quantity = r.quantity,
            "processing record"
        );

        let mut result = RecordResult {
            index: i,
            identifier: r.identifier.clone(),
            product_update_applied: false,
            variant_update_applied: false,
            error: None,
        };

        let mut product_rows = 0_u64;
        match gateway
            .update_product_quantity(r.quantity, &r.identifier)
            .await
        {
            Ok(rows) => {
                product_rows = rows;
                result.product_update_applied = rows > 0;
            }
            Err(err) => {
                error!(
                    record = i,
                    identifier = %r.identifier,
                    error = %err,
                    "failed to update product"
                );
                result.error = Some(ErrorKind::ProductUpdateFailed);
            }
        }

        match index.secondary_id(&r.identifier) {
            Some(secondary_id) => {
                match gateway
                    .update_variant_quantity(r.quantity, secondary_id)
                    .await
                {
                    Ok(_) => result.variant_update_applied = true,
                    Err(err) => {
                        error!(
                            record = i,
                            identifier = %r.identifier,
                            secondary_id,
                            error = %err,
                            "failed to update variant stock"
                        );
                        if result.error.is_none() {
                            result.error = Some(ErrorKind::VariantUpdateFailed);
                        }
                    }
                }
            }
            None => {
                // Diagnostic only, in both shapes: an unmapped identifier
                // is a plain product without variants, and an identifier
                // matching no row at all still must not stop the batch.
                if result.error.is_none() && product_rows == 0 {
                    warn!(
                        record = i,
                        identifier = %r.identifier,
                        "identifier matched nothing in the catalog"
                    );
                } else {
                    warn!(
                        record = i,
                        identifier = %r.identifier,
                        "no variant mapping for identifier"
                    );
                }
            }
        }

        if args.mode == BatchMode::Atomic && result.error.is_some() {
            outcome.succeeded = false;
        }

        outcome.results.push(result);
    }

    if args.mode == BatchMode::Atomic {
        if outcome.succeeded {
            if let Err(err) = gateway.commit().await {
                error!(sync_id = %sync_id, error = %err, "commit failed after clean batch");
            }
        } else if let Err(err) = gateway.rollback().await {
            error!(sync_id = %sync_id, error = %err, "rollback failed after batch errors");
        }
    }

    Ok(outcome)
}
