//! stocksync-testkit
//!
//! In-memory catalog double for engine and CLI tests: real
//! begin/commit/rollback visibility semantics, per-key failure injection,
//! and an ordered call log. Never wire this into a production binary.

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};
use stocksync_engine::CatalogGateway;

/// One recorded gateway call, in invocation order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CatalogCall {
    Resolve { identifier: String },
    UpdateProduct { quantity: u32, identifier: String },
    UpdateVariant { quantity: u32, secondary_id: i64 },
    Begin,
    Commit,
    Rollback,
}

#[derive(Clone, Debug, Default)]
struct Staged {
    products: BTreeMap<String, u32>,
    variants: BTreeMap<i64, u32>,
}

/// In-memory stand-in for the storefront catalog.
///
/// Reads of `product_quantity` / `variant_quantity` always observe the
/// COMMITTED state, so tests can assert that a rolled-back batch left
/// nothing durably visible.
#[derive(Debug, Default)]
pub struct MemoryCatalog {
    products: BTreeMap<String, u32>,
    variants: BTreeMap<i64, u32>,
    /// identifier -> stock row ids, in insertion order. More than one id
    /// per identifier is allowed so tests can exercise first-row-wins.
    secondary_ids: BTreeMap<String, Vec<i64>>,
    staged: Option<Staged>,
    fail_lookups: BTreeSet<String>,
    fail_product_updates: BTreeSet<String>,
    fail_variant_updates: BTreeSet<i64>,
    pub calls: Vec<CatalogCall>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a base product row.
    pub fn with_product(mut self, identifier: &str, quantity: u32) -> Self {
        self.products.insert(identifier.to_string(), quantity);
        self
    }

    /// Seed a variant stock row and its resolution mapping.
    pub fn with_variant(mut self, identifier: &str, secondary_id: i64, quantity: u32) -> Self {
        self.variants.insert(secondary_id, quantity);
        self.secondary_ids
            .entry(identifier.to_string())
            .or_default()
            .push(secondary_id);
        self
    }

    /// Make `resolve_secondary_id` error for this identifier.
    pub fn fail_lookup(mut self, identifier: &str) -> Self {
        self.fail_lookups.insert(identifier.to_string());
        self
    }

    /// Make `update_product_quantity` error for this identifier.
    pub fn fail_product_update(mut self, identifier: &str) -> Self {
        self.fail_product_updates.insert(identifier.to_string());
        self
    }

    /// Make `update_variant_quantity` error for this stock row id.
    pub fn fail_variant_update(mut self, secondary_id: i64) -> Self {
        self.fail_variant_updates.insert(secondary_id);
        self
    }

    /// Committed product quantity, if the row exists.
    pub fn product_quantity(&self, identifier: &str) -> Option<u32> {
        self.products.get(identifier).copied()
    }

    /// Committed variant stock quantity, if the row exists.
    pub fn variant_quantity(&self, secondary_id: i64) -> Option<u32> {
        self.variants.get(&secondary_id).copied()
    }

    pub fn in_scope(&self) -> bool {
        self.staged.is_some()
    }

    pub fn resolve_calls_for(&self, identifier: &str) -> usize {
        self.calls
            .iter()
            .filter(|c| {
                matches!(c, CatalogCall::Resolve { identifier: id } if id == identifier)
            })
            .count()
    }
}

#[async_trait]
impl CatalogGateway for MemoryCatalog {
    async fn resolve_secondary_id(&mut self, identifier: &str) -> Result<Option<i64>> {
        self.calls.push(CatalogCall::Resolve {
            identifier: identifier.to_string(),
        });

        if self.fail_lookups.contains(identifier) {
            return Err(anyhow!("injected lookup failure for {identifier}"));
        }

        Ok(self
            .secondary_ids
            .get(identifier)
            .and_then(|ids| ids.first().copied()))
    }

    async fn update_product_quantity(&mut self, quantity: u32, identifier: &str) -> Result<u64> {
        self.calls.push(CatalogCall::UpdateProduct {
            quantity,
            identifier: identifier.to_string(),
        });

        if self.fail_product_updates.contains(identifier) {
            return Err(anyhow!("injected product update failure for {identifier}"));
        }

        let table = match self.staged.as_mut() {
            Some(staged) => &mut staged.products,
            None => &mut self.products,
        };
        match table.get_mut(identifier) {
            Some(q) => {
                *q = quantity;
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn update_variant_quantity(&mut self, quantity: u32, secondary_id: i64) -> Result<u64> {
        self.calls.push(CatalogCall::UpdateVariant {
            quantity,
            secondary_id,
        });

        if self.fail_variant_updates.contains(&secondary_id) {
            return Err(anyhow!(
                "injected variant update failure for stock row {secondary_id}"
            ));
        }

        let table = match self.staged.as_mut() {
            Some(staged) => &mut staged.variants,
            None => &mut self.variants,
        };
        match table.get_mut(&secondary_id) {
            Some(q) => {
                *q = quantity;
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn begin_atomic(&mut self) -> Result<()> {
        self.calls.push(CatalogCall::Begin);
        if self.staged.is_some() {
            bail!("batch scope already open");
        }
        self.staged = Some(Staged {
            products: self.products.clone(),
            variants: self.variants.clone(),
        });
        Ok(())
    }

    async fn commit(&mut self) -> Result<()> {
        self.calls.push(CatalogCall::Commit);
        let staged = self
            .staged
            .take()
            .context("commit without an open batch scope")?;
        self.products = staged.products;
        self.variants = staged.variants;
        Ok(())
    }

    async fn rollback(&mut self) -> Result<()> {
        self.calls.push(CatalogCall::Rollback);
        self.staged
            .take()
            .map(|_| ())
            .context("rollback without an open batch scope")
    }
}
