use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// One input record: EAN13 barcode and the absolute stock quantity to set.
///
/// The identifier is not checksum-validated; the catalog is the authority
/// on whether it matches anything. Duplicates are allowed and applied in
/// input order, so the last occurrence wins.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuantityRecord {
    pub identifier: String,
    pub quantity: u32,
}

impl QuantityRecord {
    pub fn new(identifier: impl Into<String>, quantity: u32) -> Self {
        Self {
            identifier: identifier.into(),
            quantity,
        }
    }
}

/// Batch failure policy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BatchMode {
    /// Every record is applied immediately and independently; no rollback.
    BestEffort,
    /// The whole batch runs inside one transaction: committed only if every
    /// record succeeded, rolled back otherwise.
    Atomic,
}

impl BatchMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            BatchMode::BestEffort => "best-effort",
            BatchMode::Atomic => "atomic",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "best-effort" => Ok(BatchMode::BestEffort),
            "atomic" => Ok(BatchMode::Atomic),
            other => Err(anyhow!("invalid batch mode: {} (expected best-effort | atomic)", other)),
        }
    }
}

/// What went wrong for one record.
///
/// Data, not a propagated error type: the reconciliation loop recovers
/// locally and keeps going over the remaining records.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    ProductUpdateFailed,
    VariantUpdateFailed,
}

/// Per-record result appended in input order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordResult {
    pub index: usize,
    pub identifier: String,
    /// Product update executed and matched at least one catalog row.
    pub product_update_applied: bool,
    /// Variant update executed against a resolved stock row.
    pub variant_update_applied: bool,
    /// First error this record hit, if any (product update takes
    /// precedence over variant update).
    pub error: Option<ErrorKind>,
}

/// Result of one reconciliation run.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BatchOutcome {
    /// Run id for log/report correlation.
    pub sync_id: Uuid,
    pub mode: BatchMode,
    /// Batch-level verdict. Always `true` in best-effort mode — callers
    /// inspect `results` for per-record failures. In atomic mode, `false`
    /// the moment any record errored, which forces a rollback.
    pub succeeded: bool,
    pub results: Vec<RecordResult>,
}

impl BatchOutcome {
    pub fn failed_records(&self) -> usize {
        self.results.iter().filter(|r| r.error.is_some()).count()
    }
}

/// Identifier -> variant stock row id mapping.
///
/// Built once before the reconciliation loop, read-only afterwards: a
/// record's own updates can never change another record's resolution.
#[derive(Clone, Debug, Default)]
pub struct ResolutionIndex {
    entries: BTreeMap<String, i64>,
    /// Lookups that errored during construction. Those identifiers are
    /// simply absent from the index; the count is surfaced for logging.
    pub lookup_failures: usize,
}

impl ResolutionIndex {
    /// Insert a mapping unless the identifier is already present (the
    /// first resolved id wins).
    pub fn insert(&mut self, identifier: &str, secondary_id: i64) {
        self.entries
            .entry(identifier.to_string())
            .or_insert(secondary_id);
    }

    pub fn secondary_id(&self, identifier: &str) -> Option<i64> {
        self.entries.get(identifier).copied()
    }

    pub fn contains(&self, identifier: &str) -> bool {
        self.entries.contains_key(identifier)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
