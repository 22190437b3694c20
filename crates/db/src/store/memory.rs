//! Process-local document store.
//!
//! Intended for tests and single-node development. Contents are lost when
//! the process exits.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

use super::{DocumentStore, StoreError, StoredDocument, json_contains};

/// In-memory [`DocumentStore`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<String, Vec<StoredDocument>>>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn poisoned() -> StoreError {
        StoreError::Database("memory store lock poisoned".to_string())
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn insert(&self, document: StoredDocument) -> Result<StoredDocument, StoreError> {
        let mut collections = self.collections.write().map_err(|_| Self::poisoned())?;
        let docs = collections.entry(document.collection.clone()).or_default();

        if let Some(code) = &document.code {
            let taken = docs.iter().any(|d| {
                d.organization_id == document.organization_id && d.code.as_ref() == Some(code)
            });
            if taken {
                return Err(StoreError::DuplicateCode {
                    collection: document.collection,
                    code: code.clone(),
                });
            }
        }
        if docs.iter().any(|d| d.id == document.id) {
            return Err(StoreError::Database(format!(
                "duplicate id {} in {}",
                document.id, document.collection
            )));
        }

        docs.push(document.clone());
        Ok(document)
    }

    async fn find(
        &self,
        collection: &str,
        organization_id: Uuid,
        filter: &Value,
    ) -> Result<Vec<StoredDocument>, StoreError> {
        let collections = self.collections.read().map_err(|_| Self::poisoned())?;
        Ok(collections
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .filter(|d| d.organization_id == organization_id)
                    .filter(|d| json_contains(&d.body, filter))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn find_by_id(
        &self,
        collection: &str,
        organization_id: Uuid,
        id: Uuid,
    ) -> Result<Option<StoredDocument>, StoreError> {
        let collections = self.collections.read().map_err(|_| Self::poisoned())?;
        Ok(collections.get(collection).and_then(|docs| {
            docs.iter()
                .find(|d| d.id == id && d.organization_id == organization_id)
                .cloned()
        }))
    }

    async fn replace(
        &self,
        mut document: StoredDocument,
        expected_version: i64,
    ) -> Result<StoredDocument, StoreError> {
        let mut collections = self.collections.write().map_err(|_| Self::poisoned())?;
        let stored = collections
            .get_mut(&document.collection)
            .and_then(|docs| {
                docs.iter_mut().find(|d| {
                    d.id == document.id && d.organization_id == document.organization_id
                })
            })
            .ok_or_else(|| StoreError::NotFound {
                collection: document.collection.clone(),
                id: document.id,
            })?;

        if stored.version != expected_version {
            return Err(StoreError::Conflict {
                collection: document.collection,
                id: document.id,
                expected: expected_version,
            });
        }

        document.version = expected_version + 1;
        *stored = document.clone();
        Ok(document)
    }

    async fn push(
        &self,
        collection: &str,
        organization_id: Uuid,
        id: Uuid,
        field: &str,
        value: Value,
    ) -> Result<(), StoreError> {
        let mut collections = self.collections.write().map_err(|_| Self::poisoned())?;
        let stored = collections
            .get_mut(collection)
            .and_then(|docs| {
                docs.iter_mut()
                    .find(|d| d.id == id && d.organization_id == organization_id)
            })
            .ok_or_else(|| StoreError::NotFound {
                collection: collection.to_string(),
                id,
            })?;

        let Value::Object(body) = &mut stored.body else {
            return Err(StoreError::Database(format!(
                "{collection} document {id} is not an object"
            )));
        };
        match body.entry(field).or_insert_with(|| Value::Array(Vec::new())) {
            Value::Array(items) => items.push(value),
            _ => {
                return Err(StoreError::Database(format!(
                    "field {field} of {collection} document {id} is not an array"
                )));
            }
        }
        stored.version += 1;
        Ok(())
    }

    async fn remove(&self, collection: &str, organization_id: Uuid, id: Uuid) -> Result<(), StoreError> {
        let not_found = || StoreError::NotFound {
            collection: collection.to_string(),
            id,
        };
        let mut collections = self.collections.write().map_err(|_| Self::poisoned())?;
        let docs = collections.get_mut(collection).ok_or_else(not_found)?;
        let index = docs
            .iter()
            .position(|d| d.id == id && d.organization_id == organization_id)
            .ok_or_else(not_found)?;
        docs.remove(index);
        Ok(())
    }

    async fn count(
        &self,
        collection: &str,
        organization_id: Uuid,
        filter: &Value,
    ) -> Result<u64, StoreError> {
        let found = self.find(collection, organization_id, filter).await?;
        Ok(found.len() as u64)
    }
}
