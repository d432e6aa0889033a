//! Keyed repository of processed documents.
//!
//! The store is deliberately contract-first: the surrounding layer and the
//! exporter program against `DocumentStore`, and the in-memory backend can
//! be swapped for a durable one without touching either. Records are keyed
//! independently; there are no cross-record invariants, so concurrent
//! mutation only needs a map-level lock.

use std::collections::HashMap;
use std::sync::RwLock;

use serde_json::Value;
use thiserror::Error;

use crate::models::{DocumentCategory, ProcessedDocument};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Document not found: {0}")]
    NotFound(String),
}

/// Storage contract for processed documents.
pub trait DocumentStore: Send + Sync {
    /// Insert or replace by id. Ids are assigned by the caller.
    fn put(&self, document: ProcessedDocument);

    fn get(&self, id: &str) -> Result<ProcessedDocument, StoreError>;

    /// All records, optionally narrowed to one category. Iteration is
    /// complete and yields each record exactly once; order is unspecified.
    fn list(&self, category: Option<DocumentCategory>) -> Vec<ProcessedDocument>;

    /// Apply human corrections to a record.
    ///
    /// Every key lands in `manual_edits` (the cumulative correction
    /// history). Keys that already exist in `extracted_data` are overwritten
    /// there as well; unknown keys are NOT injected, so the extracted shape
    /// is never silently widened.
    fn update(
        &self,
        id: &str,
        field_updates: &serde_json::Map<String, Value>,
    ) -> Result<ProcessedDocument, StoreError>;

    /// Remove permanently. No soft delete, no tombstone.
    fn delete(&self, id: &str) -> Result<(), StoreError>;
}

/// Process-lifetime in-memory backend.
#[derive(Default)]
pub struct MemoryDocumentStore {
    documents: RwLock<HashMap<String, ProcessedDocument>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DocumentStore for MemoryDocumentStore {
    fn put(&self, document: ProcessedDocument) {
        self.documents
            .write()
            .expect("document store lock poisoned")
            .insert(document.id.clone(), document);
    }

    fn get(&self, id: &str) -> Result<ProcessedDocument, StoreError> {
        self.documents
            .read()
            .expect("document store lock poisoned")
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    fn list(&self, category: Option<DocumentCategory>) -> Vec<ProcessedDocument> {
        self.documents
            .read()
            .expect("document store lock poisoned")
            .values()
            .filter(|doc| category.map_or(true, |c| doc.category == c))
            .cloned()
            .collect()
    }

    fn update(
        &self,
        id: &str,
        field_updates: &serde_json::Map<String, Value>,
    ) -> Result<ProcessedDocument, StoreError> {
        let mut documents = self
            .documents
            .write()
            .expect("document store lock poisoned");
        let document = documents
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;

        for (key, value) in field_updates {
            document.manual_edits.insert(key.clone(), value.clone());
            if let Some(data) = document.extracted_data.as_object_mut() {
                if data.contains_key(key) {
                    data.insert(key.clone(), value.clone());
                }
            }
        }

        Ok(document.clone())
    }

    fn delete(&self, id: &str) -> Result<(), StoreError> {
        self.documents
            .write()
            .expect("document store lock poisoned")
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use serde_json::json;

    // Exercised through the trait so a durable backend can reuse the suite.
    fn store() -> Box<dyn DocumentStore> {
        Box::new(MemoryDocumentStore::new())
    }

    fn document(id: &str, category: DocumentCategory, extracted_data: Value) -> ProcessedDocument {
        ProcessedDocument {
            id: id.to_string(),
            original_filename: format!("{id}.pdf"),
            renamed_filename: None,
            category,
            extracted_data,
            ocr_confidence: Some(0.95),
            processed_at: NaiveDate::from_ymd_opt(2025, 4, 1)
                .unwrap()
                .and_hms_opt(9, 30, 0)
                .unwrap(),
            manual_edits: serde_json::Map::new(),
            error_message: None,
        }
    }

    #[test]
    fn put_then_get_roundtrips() {
        let store = store();
        store.put(document("doc1", DocumentCategory::Deposit, json!({"balance": 1000})));
        let fetched = store.get("doc1").unwrap();
        assert_eq!(fetched.extracted_data["balance"], 1000);
    }

    #[test]
    fn put_replaces_by_id() {
        let store = store();
        store.put(document("doc1", DocumentCategory::Deposit, json!({"balance": 1000})));
        store.put(document("doc1", DocumentCategory::Deposit, json!({"balance": 2000})));
        assert_eq!(store.list(None).len(), 1);
        assert_eq!(store.get("doc1").unwrap().extracted_data["balance"], 2000);
    }

    #[test]
    fn get_missing_is_not_found() {
        let store = store();
        assert!(matches!(store.get("missing"), Err(StoreError::NotFound(_))));
    }

    #[test]
    fn list_filters_by_category() {
        let store = store();
        store.put(document("d1", DocumentCategory::Deposit, json!({})));
        store.put(document("d2", DocumentCategory::Passbook, json!([])));
        store.put(document("d3", DocumentCategory::Deposit, json!({})));

        assert_eq!(store.list(None).len(), 3);
        assert_eq!(store.list(Some(DocumentCategory::Deposit)).len(), 2);
        assert_eq!(store.list(Some(DocumentCategory::Debt)).len(), 0);
    }

    #[test]
    fn update_overwrites_existing_extracted_keys() {
        let store = store();
        store.put(document("doc1", DocumentCategory::Deposit, json!({"balance": 1000})));

        let mut updates = serde_json::Map::new();
        updates.insert("balance".to_string(), json!(2000));
        let updated = store.update("doc1", &updates).unwrap();

        assert_eq!(updated.extracted_data["balance"], 2000);
        assert_eq!(updated.manual_edits["balance"], 2000);
    }

    #[test]
    fn update_records_unknown_keys_only_in_manual_edits() {
        let store = store();
        store.put(document("doc1", DocumentCategory::Deposit, json!({"balance": 1000})));

        let mut updates = serde_json::Map::new();
        updates.insert("accountHolder".to_string(), json!("山田太郎"));
        let updated = store.update("doc1", &updates).unwrap();

        assert_eq!(updated.manual_edits["accountHolder"], "山田太郎");
        assert!(updated.extracted_data.get("accountHolder").is_none());
        assert_eq!(updated.extracted_data["balance"], 1000);
    }

    #[test]
    fn update_accumulates_correction_history() {
        let store = store();
        store.put(document("doc1", DocumentCategory::Deposit, json!({"balance": 1000})));

        let mut first = serde_json::Map::new();
        first.insert("balance".to_string(), json!(1500));
        store.update("doc1", &first).unwrap();

        let mut second = serde_json::Map::new();
        second.insert("branch".to_string(), json!("渋谷支店"));
        let updated = store.update("doc1", &second).unwrap();

        assert_eq!(updated.manual_edits.len(), 2);
        assert_eq!(updated.manual_edits["balance"], 1500);
        assert_eq!(updated.manual_edits["branch"], "渋谷支店");
    }

    #[test]
    fn update_on_array_data_touches_only_manual_edits() {
        // Passbook documents store an array; corrections still accumulate.
        let store = store();
        store.put(document("doc1", DocumentCategory::Passbook, json!([{"残高": 100}])));

        let mut updates = serde_json::Map::new();
        updates.insert("残高".to_string(), json!(200));
        let updated = store.update("doc1", &updates).unwrap();

        assert_eq!(updated.manual_edits["残高"], 200);
        assert!(updated.extracted_data.is_array());
        assert_eq!(updated.extracted_data[0]["残高"], 100);
    }

    #[test]
    fn update_missing_is_not_found() {
        let store = store();
        let updates = serde_json::Map::new();
        assert!(matches!(
            store.update("missing", &updates),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn delete_removes_permanently() {
        let store = store();
        store.put(document("doc1", DocumentCategory::Deposit, json!({})));
        store.delete("doc1").unwrap();
        assert!(store.list(None).is_empty());
        assert!(matches!(store.get("doc1"), Err(StoreError::NotFound(_))));
    }

    #[test]
    fn delete_missing_is_not_found_and_leaves_store_unchanged() {
        let store = store();
        store.put(document("doc1", DocumentCategory::Deposit, json!({})));
        assert!(matches!(
            store.delete("missing"),
            Err(StoreError::NotFound(_))
        ));
        assert_eq!(store.list(None).len(), 1);
    }

    #[test]
    fn concurrent_inserts_do_not_corrupt_the_map() {
        use std::sync::Arc;

        let store = Arc::new(MemoryDocumentStore::new());
        let mut handles = Vec::new();
        for worker in 0..8 {
            let store = Arc::clone(&store);
            handles.push(std::thread::spawn(move || {
                for i in 0..50 {
                    store.put(document(
                        &format!("w{worker}-d{i}"),
                        DocumentCategory::Deposit,
                        json!({"balance": i}),
                    ));
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(store.list(None).len(), 400);
    }
}
