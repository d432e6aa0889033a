//! Batch processing types: input items, per-item errors, and the summary
//! returned to the surrounding layer.

use serde::{Deserialize, Serialize};

use super::document::ProcessedDocument;

/// One uploaded file queued for processing.
#[derive(Debug, Clone)]
pub struct BatchItem {
    pub filename: String,
    pub bytes: Vec<u8>,
}

impl BatchItem {
    pub fn new(filename: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            bytes,
        }
    }
}

/// Knobs for a processing run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessOptions {
    /// Ask the vision model to classify each document before extraction.
    pub auto_classify: bool,
    /// Include handwritten digits and text in passbook recognition.
    pub include_handwriting: bool,
}

impl Default for ProcessOptions {
    fn default() -> Self {
        Self {
            auto_classify: true,
            include_handwriting: false,
        }
    }
}

/// A per-item failure captured during batch processing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemError {
    pub filename: String,
    pub message: String,
}

/// Outcome of a batch run. One failing document never aborts its siblings;
/// it becomes an entry in `errors` while the rest complete.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchSummary {
    pub processed_count: usize,
    pub failed_count: usize,
    pub documents: Vec<ProcessedDocument>,
    pub errors: Vec<ItemError>,
}

impl BatchSummary {
    /// True when every item in the batch processed cleanly.
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_options_classify_but_skip_handwriting() {
        let options = ProcessOptions::default();
        assert!(options.auto_classify);
        assert!(!options.include_handwriting);
    }

    #[test]
    fn empty_summary_is_success() {
        assert!(BatchSummary::default().is_success());
    }

    #[test]
    fn summary_with_errors_is_not_success() {
        let summary = BatchSummary {
            failed_count: 1,
            errors: vec![ItemError {
                filename: "通帳.pdf".to_string(),
                message: "timeout".to_string(),
            }],
            ..Default::default()
        };
        assert!(!summary.is_success());
    }
}
