//! CSV export for the inheritance-tax spreadsheet workflow.
//!
//! Each selected document is projected into flat rows per its registry
//! entry: one row per document, except passbooks which expand into one row
//! per transaction. Rows from different categories can share one file: the
//! column set is the first-appearance union across all rows, 区分 leads every
//! row and 元ファイル closes it.
//!
//! The destination spreadsheet expects UTF-8 with a byte-order marker
//! (multi-byte headers in every column), so the output stream is
//! BOM-prefixed.

use chrono::NaiveDateTime;
use serde_json::Value;
use thiserror::Error;

use crate::models::{DocumentCategory, ProcessedDocument};
use crate::pipeline::registry::{
    self, CsvDefault, CsvField, Projection, GENERIC_DATA_COLUMN, KIND_COLUMN, SOURCE_FILE_COLUMN,
};
use crate::store::DocumentStore;

/// UTF-8 byte-order marker expected by common spreadsheet tools.
const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

#[derive(Error, Debug)]
pub enum ExportError {
    /// The selection produced no documents or no rows. Distinct from a
    /// system error: the user picked nothing exportable.
    #[error("No documents matched the export selection")]
    Empty,
    #[error("CSV serialization failed: {0}")]
    Csv(String),
}

/// One flat row: ordered (column, value) pairs.
type Row = Vec<(&'static str, String)>;

/// Serialize the selected documents to BOM-prefixed CSV bytes.
///
/// Ids are taken in the given order; ids absent from the store are skipped.
/// An empty `include_categories` admits every category.
pub fn export_csv(
    store: &dyn DocumentStore,
    document_ids: &[String],
    include_categories: &[DocumentCategory],
) -> Result<Vec<u8>, ExportError> {
    let mut documents = Vec::new();
    for id in document_ids {
        if let Ok(document) = store.get(id) {
            if include_categories.is_empty() || include_categories.contains(&document.category) {
                documents.push(document);
            }
        }
    }
    if documents.is_empty() {
        return Err(ExportError::Empty);
    }

    let rows: Vec<Row> = documents.iter().flat_map(project_document).collect();
    if rows.is_empty() {
        return Err(ExportError::Empty);
    }

    let columns = column_union(&rows);

    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record(&columns)
        .map_err(|e| ExportError::Csv(e.to_string()))?;
    for row in &rows {
        let record: Vec<&str> = columns
            .iter()
            .map(|column| {
                row.iter()
                    .find(|(c, _)| c == column)
                    .map(|(_, v)| v.as_str())
                    .unwrap_or("")
            })
            .collect();
        writer
            .write_record(&record)
            .map_err(|e| ExportError::Csv(e.to_string()))?;
    }
    let data = writer
        .into_inner()
        .map_err(|e| ExportError::Csv(e.to_string()))?;

    let mut output = Vec::with_capacity(UTF8_BOM.len() + data.len());
    output.extend_from_slice(UTF8_BOM);
    output.extend_from_slice(&data);

    tracing::info!(
        documents = documents.len(),
        rows = rows.len(),
        bytes = output.len(),
        "CSVエクスポート完了"
    );
    Ok(output)
}

/// Download filename convention for an export produced at `now`.
pub fn export_filename(now: NaiveDateTime) -> String {
    format!("inheritance_data_{}.csv", now.format("%Y%m%d_%H%M%S"))
}

// ──────────────────────────────────────────────
// Projection
// ──────────────────────────────────────────────

/// Project one document into its CSV rows per the registry.
fn project_document(document: &ProcessedDocument) -> Vec<Row> {
    match registry::csv_projection(document.category) {
        Some((label, Projection::PerTransaction(fields))) => document
            .extracted_data
            .as_array()
            .map(|transactions| {
                transactions
                    .iter()
                    .map(|transaction| make_row(label, fields, transaction, document))
                    .collect()
            })
            .unwrap_or_default(),
        Some((label, Projection::PerDocument(fields))) => {
            vec![make_row(label, fields, &document.extracted_data, document)]
        }
        // Generic fallback: the category code and the data as text.
        None => vec![vec![
            (KIND_COLUMN, document.category.code().to_string()),
            (GENERIC_DATA_COLUMN, document.extracted_data.to_string()),
            (SOURCE_FILE_COLUMN, document.original_filename.clone()),
        ]],
    }
}

fn make_row(
    label: &'static str,
    fields: &'static [CsvField],
    data: &Value,
    document: &ProcessedDocument,
) -> Row {
    let mut row = Vec::with_capacity(fields.len() + 2);
    row.push((KIND_COLUMN, label.to_string()));
    for field in fields {
        row.push((field.column, render_value(data.get(field.source), field.default)));
    }
    row.push((SOURCE_FILE_COLUMN, document.original_filename.clone()));
    row
}

fn render_value(value: Option<&Value>, default: CsvDefault) -> String {
    match value {
        None | Some(Value::Null) => match default {
            CsvDefault::Empty => String::new(),
            CsvDefault::Zero => "0".to_string(),
        },
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        Some(other) => other.to_string(),
    }
}

/// Column order across a mixed row set: first appearance wins.
fn column_union(rows: &[Row]) -> Vec<&'static str> {
    let mut columns: Vec<&'static str> = Vec::new();
    for row in rows {
        for (column, _) in row {
            if !columns.contains(column) {
                columns.push(*column);
            }
        }
    }
    columns
}
