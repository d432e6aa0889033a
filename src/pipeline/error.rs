//! Extraction-side error taxonomy.
//!
//! Reconciliation mismatches are deliberately absent: a ledger that does not
//! add up is a warning on the result, not a failure of the pipeline.

use thiserror::Error;

use super::vision::VisionError;
use crate::models::DocumentCategory;

#[derive(Error, Debug)]
pub enum ExtractionError {
    /// No extraction schema registered for this category. The caller is
    /// expected to fall back to raw text extraction.
    #[error("未対応の書類タイプ: {0}")]
    UnsupportedCategory(DocumentCategory),

    /// The vision model call itself failed.
    #[error("Vision model call failed: {0}")]
    Collaborator(#[from] VisionError),

    /// The model answered, but not with the JSON shape the prompt demanded.
    /// Hard failure; structured output is trusted and never retried.
    #[error("Malformed model response: {0}")]
    ResponseParsing(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_category_names_the_category() {
        let err = ExtractionError::UnsupportedCategory(DocumentCategory::PublicBond);
        assert!(err.to_string().contains("PUBLIC_BOND"));
    }

    #[test]
    fn vision_errors_convert() {
        let err: ExtractionError = VisionError::EmptyResponse.into();
        assert!(matches!(err, ExtractionError::Collaborator(_)));
    }
}
