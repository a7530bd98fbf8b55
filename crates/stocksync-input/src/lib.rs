//! Record source: `<ean13>;<quantity>` rows in file order.

use anyhow::{Context, Result};
use std::path::Path;
use stocksync_engine::QuantityRecord;

/// Read the full quantities file.
///
/// `;`-delimited, no header row: column 0 is the identifier, column 1 the
/// quantity. Any quantity that does not parse as a non-negative base-10
/// integer fails the whole load — zero records are returned and nothing
/// downstream runs. Duplicate identifiers are preserved in file order.
pub fn read_quantity_records(path: &Path) -> Result<Vec<QuantityRecord>> {
    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(b';')
        .has_headers(false)
        .from_path(path)
        .with_context(|| format!("open input file failed: {}", path.display()))?;

    let mut records = Vec::new();
    for (i, row) in rdr.records().enumerate() {
        let row = row.with_context(|| format!("read input row {i} failed"))?;

        let identifier = row
            .get(0)
            .with_context(|| format!("input row {i}: missing identifier column"))?
            .to_string();

        let quantity_field = row
            .get(1)
            .with_context(|| format!("input row {i}: missing quantity column"))?;
        let quantity: u32 = quantity_field.trim().parse().with_context(|| {
            format!(
                "input row {i}: quantity must be a non-negative base-10 integer, got {:?}",
                quantity_field
            )
        })?;

        records.push(QuantityRecord {
            identifier,
            quantity,
        });
    }

    Ok(records)
}
