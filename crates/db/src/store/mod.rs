//! Document store boundary.
//!
//! Every document lives in a named collection and belongs to one
//! organisation. Reads filter by JSON containment (the `@>` operator in
//! PostgreSQL), which expresses field equality and "some array element
//! matches" with the same filter shape:
//!
//! ```text
//! {"requestIds": [{"requestId": "123456"}], "disabled": false}
//! ```
//!
//! Writes are versioned. `replace` succeeds only when the stored version
//! equals the caller's and bumps it; `push` bumps it too, so a writer
//! holding a copy read before the push is refused instead of dropping the
//! pushed element.

pub mod error;
pub mod memory;
pub mod sea;

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

pub use error::StoreError;
pub use memory::MemoryStore;
pub use sea::SeaStore;

/// Shared handle to a store backend.
pub type SharedStore = Arc<dyn DocumentStore>;

/// A document as the store sees it.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    /// Document id.
    pub id: Uuid,
    /// Collection name.
    pub collection: String,
    /// Owning organisation.
    pub organization_id: Uuid,
    /// Organisation-unique short code, if the collection has one.
    pub code: Option<String>,
    /// Write version.
    pub version: i64,
    /// Soft-delete flag, mirrored from the body.
    pub disabled: bool,
    /// The document itself.
    pub body: Value,
}

/// Persistence interface used by the repositories.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Inserts a new document.
    ///
    /// Fails with [`StoreError::DuplicateCode`] when the code is taken.
    async fn insert(&self, document: StoredDocument) -> Result<StoredDocument, StoreError>;

    /// Documents in the organisation whose body contains `filter`, oldest
    /// first.
    async fn find(
        &self,
        collection: &str,
        organization_id: Uuid,
        filter: &Value,
    ) -> Result<Vec<StoredDocument>, StoreError>;

    /// One document by id, scoped to the organisation.
    async fn find_by_id(
        &self,
        collection: &str,
        organization_id: Uuid,
        id: Uuid,
    ) -> Result<Option<StoredDocument>, StoreError>;

    /// Replaces the body if the stored version is `expected_version`.
    ///
    /// Returns the document with its new version.
    async fn replace(
        &self,
        document: StoredDocument,
        expected_version: i64,
    ) -> Result<StoredDocument, StoreError>;

    /// Appends `value` to the array `field` of the document body.
    async fn push(
        &self,
        collection: &str,
        organization_id: Uuid,
        id: Uuid,
        field: &str,
        value: Value,
    ) -> Result<(), StoreError>;

    /// Deletes a document outright. Only used to withdraw a write that
    /// lost a race; everything else soft-deletes.
    async fn remove(&self, collection: &str, organization_id: Uuid, id: Uuid) -> Result<(), StoreError>;

    /// Number of documents matching `filter`.
    async fn count(
        &self,
        collection: &str,
        organization_id: Uuid,
        filter: &Value,
    ) -> Result<u64, StoreError>;
}

/// Returns true if `haystack` contains `needle` under JSONB containment
/// rules: objects match key-wise, every needle array element must match
/// some haystack element, scalars compare by equality.
#[must_use]
pub fn json_contains(haystack: &Value, needle: &Value) -> bool {
    match (haystack, needle) {
        (Value::Object(hay), Value::Object(need)) => need
            .iter()
            .all(|(key, want)| hay.get(key).is_some_and(|have| json_contains(have, want))),
        (Value::Array(hay), Value::Array(need)) => need
            .iter()
            .all(|want| hay.iter().any(|have| json_contains(have, want))),
        (have, want) => have == want,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_object_containment() {
        let doc = json!({"status": "Pending", "amount": "1000", "disabled": false});
        assert!(json_contains(&doc, &json!({})));
        assert!(json_contains(&doc, &json!({"status": "Pending"})));
        assert!(json_contains(&doc, &json!({"status": "Pending", "disabled": false})));
        assert!(!json_contains(&doc, &json!({"status": "Loaded"})));
        assert!(!json_contains(&doc, &json!({"vehicleId": null})));
    }

    #[test]
    fn test_array_element_match() {
        let doc = json!({
            "requestIds": [
                {"requestId": "111111", "amount": "400"},
                {"requestId": "222222", "amount": "100"}
            ]
        });
        assert!(json_contains(&doc, &json!({"requestIds": [{"requestId": "222222"}]})));
        assert!(json_contains(
            &doc,
            &json!({"requestIds": [{"requestId": "111111"}, {"requestId": "222222"}]})
        ));
        assert!(!json_contains(&doc, &json!({"requestIds": [{"requestId": "333333"}]})));
        assert!(!json_contains(&doc, &json!({"requestIds": {"requestId": "111111"}})));
    }
}
