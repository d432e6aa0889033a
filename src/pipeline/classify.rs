//! Document classification via the vision model.
//!
//! Best effort by contract: whatever goes wrong (transport failure,
//! unparseable payload, a category tag the model invented), the answer is
//! `Unknown`, never an error. Callers decide what an unclassified document
//! means for them.

use std::sync::Arc;

use serde::Deserialize;

use super::prompts;
use super::vision::{parse_model_json, VisionModelClient};
use crate::models::DocumentCategory;

/// Classifier verdict with the model's self-reported confidence.
#[derive(Debug, Clone)]
pub struct Classification {
    pub category: DocumentCategory,
    pub confidence: Option<f32>,
    pub detected_keywords: Vec<String>,
}

impl Classification {
    fn unknown() -> Self {
        Self {
            category: DocumentCategory::Unknown,
            confidence: None,
            detected_keywords: Vec::new(),
        }
    }
}

#[derive(Deserialize)]
struct RawClassification {
    document_type: Option<String>,
    confidence: Option<f32>,
    #[serde(default)]
    detected_keywords: Vec<String>,
}

pub struct DocumentClassifier {
    client: Arc<dyn VisionModelClient>,
}

impl DocumentClassifier {
    pub fn new(client: Arc<dyn VisionModelClient>) -> Self {
        Self { client }
    }

    /// Classify one document image.
    pub fn classify(&self, image_base64: &str) -> Classification {
        let response = match self
            .client
            .generate(prompts::CLASSIFICATION_PROMPT, image_base64)
        {
            Ok(text) => text,
            Err(e) => {
                tracing::error!(error = %e, "書類分類エラー");
                return Classification::unknown();
            }
        };

        let value = match parse_model_json(&response) {
            Ok(value) => value,
            Err(e) => {
                tracing::error!(error = %e, "書類分類レスポンスの解析に失敗");
                return Classification::unknown();
            }
        };

        let raw: RawClassification = match serde_json::from_value(value) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::error!(error = %e, "書類分類レスポンスの形式が不正");
                return Classification::unknown();
            }
        };

        let category = raw
            .document_type
            .as_deref()
            .and_then(DocumentCategory::from_str)
            .unwrap_or(DocumentCategory::Unknown);

        Classification {
            category,
            confidence: raw.confidence.map(|c| c.clamp(0.0, 1.0)),
            detected_keywords: raw.detected_keywords,
        }
    }
}
