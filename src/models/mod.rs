//! Domain types shared across the pipeline, store, and export layers.

pub mod batch;
pub mod document;

pub use batch::{BatchItem, BatchSummary, ItemError, ProcessOptions};
pub use document::{
    new_document_id, DocumentCategory, PassbookTransaction, ProcessedDocument,
};
