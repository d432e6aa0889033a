//! Document processing orchestration.
//!
//! One logical pipeline per uploaded file: encode → classify (optional) →
//! dispatch extraction → store. Batches fan the same pipeline out over a
//! bounded number of concurrent collaborator calls, with per-item isolation:
//! a failing document becomes an error entry in the summary and never aborts
//! its siblings.

use std::sync::Arc;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use chrono::{Local, NaiveDate};
use serde_json::Value;
use tokio::sync::Semaphore;
use uuid::Uuid;

use super::classify::DocumentClassifier;
use super::dispatch::{ExtractOptions, ExtractionDispatcher};
use super::error::ExtractionError;
use super::registry;
use super::vision::{GeminiVisionClient, VisionModelClient};
use crate::config::OcrConfig;
use crate::models::{
    new_document_id, BatchItem, BatchSummary, DocumentCategory, ItemError, ProcessOptions,
    ProcessedDocument,
};
use crate::store::DocumentStore;

/// Confidence recorded when the classifier did not supply one (the vision
/// model's structured output is usually this reliable).
const DEFAULT_OCR_CONFIDENCE: f32 = 0.95;

pub struct DocumentProcessor {
    classifier: DocumentClassifier,
    dispatcher: ExtractionDispatcher,
    store: Arc<dyn DocumentStore>,
    max_concurrency: usize,
}

impl DocumentProcessor {
    pub fn new(
        client: Arc<dyn VisionModelClient>,
        store: Arc<dyn DocumentStore>,
        max_concurrency: usize,
    ) -> Self {
        Self {
            classifier: DocumentClassifier::new(client.clone()),
            dispatcher: ExtractionDispatcher::new(client),
            store,
            max_concurrency: max_concurrency.max(1),
        }
    }

    /// Build a processor backed by the Gemini client from configuration.
    pub fn from_config(config: &OcrConfig, store: Arc<dyn DocumentStore>) -> Self {
        let client: Arc<dyn VisionModelClient> = Arc::new(GeminiVisionClient::new(config));
        Self::new(client, store, config.max_concurrency)
    }

    /// Run one document through the full pipeline and store the result.
    ///
    /// A forced category skips classification. Categories without an
    /// extraction schema fall back to generic text extraction rather than
    /// failing the document.
    pub fn process_document(
        &self,
        filename: &str,
        image_bytes: &[u8],
        forced_category: Option<DocumentCategory>,
        options: &ProcessOptions,
    ) -> Result<ProcessedDocument, ExtractionError> {
        let start = std::time::Instant::now();
        let image_base64 = BASE64.encode(image_bytes);

        let (category, confidence) = match forced_category {
            Some(category) => (category, DEFAULT_OCR_CONFIDENCE),
            None if options.auto_classify => {
                let classification = self.classifier.classify(&image_base64);
                tracing::info!(
                    filename,
                    category = %classification.category,
                    "書類分類結果"
                );
                (
                    classification.category,
                    classification.confidence.unwrap_or(DEFAULT_OCR_CONFIDENCE),
                )
            }
            None => (DocumentCategory::Unknown, DEFAULT_OCR_CONFIDENCE),
        };

        let extract_options = ExtractOptions {
            include_handwriting: options.include_handwriting,
        };
        let payload = match self.dispatcher.extract(&image_base64, category, extract_options) {
            Ok(payload) => payload,
            Err(ExtractionError::UnsupportedCategory(_)) => {
                tracing::info!(filename, %category, "スキーマ未登録のため全文抽出にフォールバック");
                self.dispatcher.extract_raw_text(&image_base64)?
            }
            Err(e) => return Err(e),
        };

        let extracted_data = payload.into_value();
        let renamed_filename = rename_suggestion(category, filename, &extracted_data);

        let document = ProcessedDocument {
            id: new_document_id(category, filename),
            original_filename: filename.to_string(),
            renamed_filename: Some(renamed_filename),
            category,
            extracted_data,
            ocr_confidence: Some(confidence),
            processed_at: Local::now().naive_local(),
            manual_edits: serde_json::Map::new(),
            error_message: None,
        };

        self.store.put(document.clone());
        tracing::info!(
            filename,
            %category,
            elapsed_ms = %start.elapsed().as_millis(),
            "書類処理完了"
        );
        Ok(document)
    }

    /// Process a batch of uploads with bounded concurrency.
    ///
    /// Items are isolated: each either completes or contributes a
    /// `(filename, message)` error entry. Counts reflect completion, not
    /// arrival order.
    pub async fn process_batch(
        self: &Arc<Self>,
        items: Vec<BatchItem>,
        options: ProcessOptions,
    ) -> BatchSummary {
        let semaphore = Arc::new(Semaphore::new(self.max_concurrency));
        let mut handles = Vec::with_capacity(items.len());

        for item in items {
            let processor = Arc::clone(self);
            let semaphore = Arc::clone(&semaphore);
            let options = options.clone();
            let filename = item.filename.clone();
            let handle = tokio::spawn(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .expect("batch semaphore closed");
                tokio::task::spawn_blocking(move || {
                    processor.process_document(&item.filename, &item.bytes, None, &options)
                })
                .await
            });
            handles.push((filename, handle));
        }

        let mut summary = BatchSummary::default();
        for (filename, handle) in handles {
            match handle.await {
                Ok(Ok(Ok(document))) => {
                    summary.processed_count += 1;
                    summary.documents.push(document);
                }
                Ok(Ok(Err(e))) => record_failure(&mut summary, filename, e.to_string()),
                Ok(Err(join)) | Err(join) => {
                    record_failure(&mut summary, filename, format!("processing task failed: {join}"))
                }
            }
        }

        tracing::info!(
            processed = summary.processed_count,
            failed = summary.failed_count,
            "Batch processing complete"
        );
        summary
    }
}

fn record_failure(summary: &mut BatchSummary, filename: String, message: String) {
    tracing::error!(%filename, %message, "ファイル処理エラー");
    summary.failed_count += 1;
    summary.errors.push(ItemError { filename, message });
}

// ──────────────────────────────────────────────
// Renamed-filename suggestion
// ──────────────────────────────────────────────

/// Suggest a filing-convention filename:
/// `{区分コード}{連番}_{区分名}_{内容}_{基準日}.pdf`, e.g.
/// `D3f1_預金_みずほ銀行_R250401.pdf`.
fn rename_suggestion(
    category: DocumentCategory,
    original_filename: &str,
    extracted_data: &Value,
) -> String {
    let content = title_content(category, original_filename, extracted_data);
    let date = reference_date(category, extracted_data);
    rename_format(category, &content, date)
}

fn rename_format(category: DocumentCategory, content: &str, date: Option<NaiveDate>) -> String {
    // Short random token instead of a wall-clock sequence; same collision
    // reasoning as document ids.
    let token = Uuid::new_v4().simple().to_string();
    let seq = &token[..3];

    let date_str = date
        .map(|d| d.format("R%y%m%d").to_string())
        .unwrap_or_else(|| "R05".to_string());

    let (prefix, label) = match category {
        DocumentCategory::LandBuilding => ("L", "土地建物"),
        DocumentCategory::ListedStock => ("S", "株式"),
        DocumentCategory::Deposit => ("D", "預金"),
        DocumentCategory::Passbook => ("T", "通帳"),
        DocumentCategory::LifeInsurance => ("I", "保険"),
        DocumentCategory::Debt => ("C", "債務"),
        DocumentCategory::FuneralExpense => ("F", "葬式費用"),
        DocumentCategory::OtherProperty => ("O", "その他財産"),
        DocumentCategory::ProcedureDoc => ("P", "手続き書類"),
        _ => ("U", "不明"),
    };

    format!("{prefix}{seq}_{label}_{content}_{date_str}.pdf")
}

/// Pick the document's naming content: the schema's title field when the
/// extraction produced one, the original file stem otherwise.
fn title_content(
    category: DocumentCategory,
    original_filename: &str,
    extracted_data: &Value,
) -> String {
    let from_schema = registry::schema_for(category)
        .and_then(|schema| schema.title_field)
        .and_then(|field| extracted_data.get(field))
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty());

    match from_schema {
        Some(title) => title.to_string(),
        None => file_stem(original_filename).to_string(),
    }
}

fn file_stem(filename: &str) -> &str {
    filename.rsplit_once('.').map_or(filename, |(stem, _)| stem)
}

/// Reference date for the renamed filename: the schema's date field when
/// present, or the first ledger row's date for passbooks.
fn reference_date(category: DocumentCategory, extracted_data: &Value) -> Option<NaiveDate> {
    if category == DocumentCategory::Passbook {
        return extracted_data
            .as_array()
            .and_then(|rows| rows.first())
            .and_then(|row| row.get("取引日"))
            .and_then(Value::as_str)
            .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok());
    }

    let schema = registry::schema_for(category)?;
    schema
        .fields
        .iter()
        .find(|f| f.kind == registry::FieldKind::Date)
        .and_then(|f| extracted_data.get(f.name))
        .and_then(Value::as_str)
        .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok())
}
