//! Catalog capability surface the engine drives.
//!
//! The single choke-point for catalog access. Implementations own the
//! concrete query text and parameter binding (table-prefix templating
//! included); the engine only calls named operations and never sees SQL.

use anyhow::Result;
use async_trait::async_trait;

#[async_trait]
pub trait CatalogGateway: Send {
    /// Resolve the variant stock row id for an identifier.
    ///
    /// Zero-or-one semantics: a backend returning multiple rows yields the
    /// first one. The input model carries one quantity per identifier, so
    /// it cannot disambiguate variants anyway (see DESIGN.md).
    async fn resolve_secondary_id(&mut self, identifier: &str) -> Result<Option<i64>>;

    /// Set the base product quantity. Returns the affected row count.
    async fn update_product_quantity(&mut self, quantity: u32, identifier: &str) -> Result<u64>;

    /// Set the variant stock quantity. Returns the affected row count.
    async fn update_variant_quantity(&mut self, quantity: u32, secondary_id: i64) -> Result<u64>;

    /// Open the atomic scope for a whole batch. Called at most once per run,
    /// and only in atomic mode.
    async fn begin_atomic(&mut self) -> Result<()>;

    /// Close the scope, making every update in it durable.
    async fn commit(&mut self) -> Result<()>;

    /// Close the scope, discarding every update in it.
    async fn rollback(&mut self) -> Result<()>;
}
