use super::capabilities::Capabilities;
use super::error::ConvertError;
use super::expand::{expand, OutputRow};
use super::record::SourceRecord;

/// Result of converting a whole export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    /// Output rows in source order
    pub rows: Vec<OutputRow>,
    /// Records that produced at least one row
    pub documents: usize,
    /// Records without a document description
    pub skipped: usize,
    /// Documents that reported no amounts at all
    pub without_amounts: usize,
}

/// Convert every record of an export, preserving input order.
///
/// Fails with [`ConvertError::EmptyResult`] when no document yields a row.
pub fn transform(
    records: &[SourceRecord],
    capabilities: Capabilities,
) -> Result<Batch, ConvertError> {
    let mut rows = Vec::with_capacity(records.len());
    let mut documents = 0;
    let mut skipped = 0;
    let mut without_amounts = 0;

    for record in records {
        if record.is_blank() {
            skipped += 1;
            continue;
        }
        let mut expanded = expand(record, capabilities);
        if expanded.is_empty() {
            log::debug!(
                "No amounts reported for {} {}-{}",
                record.document_description.trim(),
                record.sales_point,
                record.number_from
            );
            without_amounts += 1;
        } else {
            documents += 1;
        }
        rows.append(&mut expanded);
    }

    log::info!(
        "Expanded {} records into {} rows ({} skipped, {} without amounts)",
        records.len(),
        rows.len(),
        skipped,
        without_amounts
    );

    if rows.is_empty() {
        return Err(ConvertError::EmptyResult);
    }

    Ok(Batch {
        rows,
        documents,
        skipped,
        without_amounts,
    })
}
