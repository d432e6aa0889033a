//! Extraction Dispatcher: one image plus one category in, one typed
//! payload out.
//!
//! This is the seam where OCR providers are swapped and categories are
//! added: the dispatcher looks the category up in the registry, sends the
//! registered prompt through the `VisionModelClient`, and normalizes the
//! answer. Passbooks additionally run through balance reconciliation; every
//! other registered category returns the model's object as-is.

use std::sync::Arc;

use chrono::Local;
use serde_json::Value;

use super::error::ExtractionError;
use super::reconcile;
use super::registry;
use super::vision::{parse_model_json, VisionModelClient};
use super::prompts;
use crate::models::{DocumentCategory, PassbookTransaction};

/// Per-call extraction knobs.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExtractOptions {
    pub include_handwriting: bool,
}

/// Normalized extraction result, tagged by shape.
///
/// The tag lives only inside the pipeline; at the store boundary the payload
/// flattens back into the open `extracted_data` mapping.
#[derive(Debug, Clone)]
pub enum ExtractedPayload {
    /// Reconciled passbook ledger.
    Passbook {
        transactions: Vec<PassbookTransaction>,
        balances_consistent: bool,
    },
    /// Schema-shaped object for certificate-like categories.
    Structured(serde_json::Map<String, Value>),
    /// Raw-text fallback for categories without a schema.
    RawText(String),
}

impl ExtractedPayload {
    /// Flatten into the open mapping stored on a `ProcessedDocument`.
    pub fn into_value(self) -> Value {
        match self {
            Self::Passbook { transactions, .. } => {
                serde_json::to_value(transactions).unwrap_or(Value::Array(Vec::new()))
            }
            Self::Structured(map) => Value::Object(map),
            Self::RawText(text) => {
                let mut map = serde_json::Map::new();
                map.insert("raw_text".to_string(), Value::String(text));
                Value::Object(map)
            }
        }
    }

    /// Consistency signal, present only for passbook payloads.
    pub fn balances_consistent(&self) -> Option<bool> {
        match self {
            Self::Passbook {
                balances_consistent,
                ..
            } => Some(*balances_consistent),
            _ => None,
        }
    }
}

pub struct ExtractionDispatcher {
    client: Arc<dyn VisionModelClient>,
}

impl ExtractionDispatcher {
    pub fn new(client: Arc<dyn VisionModelClient>) -> Self {
        Self { client }
    }

    /// Extract structured data for a classified document image.
    ///
    /// Fails with `UnsupportedCategory` when no schema is registered; the
    /// caller chooses the fallback (see `extract_raw_text`).
    pub fn extract(
        &self,
        image_base64: &str,
        category: DocumentCategory,
        options: ExtractOptions,
    ) -> Result<ExtractedPayload, ExtractionError> {
        let today = Local::now().date_naive();
        let prompt = registry::extraction_prompt(category, today, options.include_handwriting)
            .ok_or(ExtractionError::UnsupportedCategory(category))?;

        let response = self.client.generate(&prompt, image_base64)?;
        let value =
            parse_model_json(&response).map_err(ExtractionError::ResponseParsing)?;

        if category == DocumentCategory::Passbook {
            Self::normalize_passbook(value)
        } else {
            match value {
                Value::Object(map) => Ok(ExtractedPayload::Structured(map)),
                other => Err(ExtractionError::ResponseParsing(format!(
                    "expected a JSON object for {category}, got {other}"
                ))),
            }
        }
    }

    /// Generic text extraction for categories without a registered schema.
    pub fn extract_raw_text(&self, image_base64: &str) -> Result<ExtractedPayload, ExtractionError> {
        let response = self.client.generate(prompts::RAW_TEXT_PROMPT, image_base64)?;
        let text = match parse_model_json(&response) {
            Ok(value) => value
                .get("raw_text")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| value.to_string()),
            // Plain text instead of the requested JSON still counts here.
            Err(_) => response,
        };
        Ok(ExtractedPayload::RawText(text))
    }

    /// Parse the extracted ledger array and run it through reconciliation.
    fn normalize_passbook(value: Value) -> Result<ExtractedPayload, ExtractionError> {
        let rows = match value {
            Value::Array(rows) => rows,
            other => {
                return Err(ExtractionError::ResponseParsing(format!(
                    "expected a JSON array of transactions, got {other}"
                )))
            }
        };

        // Lenient per-row parse: a single garbled row should not void the page.
        let parsed: Vec<PassbookTransaction> = rows
            .into_iter()
            .filter_map(|row| serde_json::from_value(row).ok())
            .collect();

        let report = reconcile::reconcile(parsed);
        if !report.balances_consistent {
            tracing::warn!("残高検算が一致しませんでした");
        }

        Ok(ExtractedPayload::Passbook {
            transactions: report.transactions,
            balances_consistent: report.balances_consistent,
        })
    }
}
