//! stocksync-engine
//!
//! Reconciliation core for batch quantity synchronization:
//! - resolution pre-pass mapping identifiers to variant stock row ids
//! - per-record reconciliation loop with two batch failure policies
//!   (best-effort and atomic)
//!
//! Policy lives here; I/O lives behind [`CatalogGateway`]. The engine
//! never builds SQL text and never touches the filesystem.

mod engine;
mod gateway;
mod types;

pub use engine::{build_resolution_index, reconcile_batch, SyncRunArgs};
pub use gateway::CatalogGateway;
pub use types::*;
