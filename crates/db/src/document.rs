//! Typed access to stored documents.

use haulage_core::audit::LogEntry;
use haulage_core::billing::{Invoice, Payment};
use haulage_core::trip::Trip;
use haulage_core::vehicle::Vehicle;
use haulage_shared::types::OrganizationId;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use uuid::Uuid;

use crate::store::{DocumentStore, StoreError, StoredDocument};

/// A domain type persisted in its own collection.
pub trait Document: Serialize + DeserializeOwned + Send + Sync {
    /// Collection name.
    const COLLECTION: &'static str;
    /// Human label used in log details and error messages.
    const LABEL: &'static str;

    /// Document id.
    fn id(&self) -> Uuid;
    /// Owning organisation.
    fn organization_id(&self) -> OrganizationId;
    /// Organisation-unique short code, if any.
    fn code(&self) -> Option<&str>;
    /// Write version last read.
    fn version(&self) -> i64;
    /// Records the version after a write.
    fn set_version(&mut self, version: i64);
    /// Soft-delete flag.
    fn is_disabled(&self) -> bool;
}

macro_rules! impl_document {
    ($ty:ty, $collection:literal, $label:literal, |$doc:ident| $code:expr) => {
        impl Document for $ty {
            const COLLECTION: &'static str = $collection;
            const LABEL: &'static str = $label;

            fn id(&self) -> Uuid {
                self.id.into_inner()
            }

            fn organization_id(&self) -> OrganizationId {
                self.organization_id
            }

            fn code(&self) -> Option<&str> {
                let $doc = self;
                $code
            }

            fn version(&self) -> i64 {
                self.version
            }

            fn set_version(&mut self, version: i64) {
                self.version = version;
            }

            fn is_disabled(&self) -> bool {
                self.disabled
            }
        }
    };
}

impl_document!(Trip, "trips", "Trip", |t| Some(t.request_id.as_str()));
impl_document!(Payment, "payments", "Payment", |p| Some(p.payment_id.as_str()));
impl_document!(Invoice, "invoices", "Invoice", |i| Some(i.invoice_id.as_str()));
impl_document!(Vehicle, "vehicles", "Vehicle", |_v| None);

/// Serializes a document for the store.
pub fn to_stored<D: Document>(document: &D) -> Result<StoredDocument, StoreError> {
    Ok(StoredDocument {
        id: document.id(),
        collection: D::COLLECTION.to_string(),
        organization_id: document.organization_id().into_inner(),
        code: document.code().map(str::to_string),
        version: document.version(),
        disabled: document.is_disabled(),
        body: serde_json::to_value(document)?,
    })
}

/// Deserializes a stored document; the store's version wins over the body's.
pub fn from_stored<D: Document>(stored: StoredDocument) -> Result<D, StoreError> {
    let mut document: D = serde_json::from_value(stored.body)?;
    document.set_version(stored.version);
    Ok(document)
}

/// Loads one document by id.
pub async fn load<D: Document>(
    store: &dyn DocumentStore,
    organization_id: OrganizationId,
    id: Uuid,
) -> Result<Option<D>, StoreError> {
    store
        .find_by_id(D::COLLECTION, organization_id.into_inner(), id)
        .await?
        .map(from_stored)
        .transpose()
}

/// Loads every document matching `filter`, oldest first.
pub async fn find<D: Document>(
    store: &dyn DocumentStore,
    organization_id: OrganizationId,
    filter: &Value,
) -> Result<Vec<D>, StoreError> {
    store
        .find(D::COLLECTION, organization_id.into_inner(), filter)
        .await?
        .into_iter()
        .map(from_stored)
        .collect()
}

/// Loads the first document matching `filter`.
pub async fn find_one<D: Document>(
    store: &dyn DocumentStore,
    organization_id: OrganizationId,
    filter: &Value,
) -> Result<Option<D>, StoreError> {
    Ok(find(store, organization_id, filter).await?.into_iter().next())
}

/// Inserts a new document and returns it with the stored version.
pub async fn insert<D: Document>(store: &dyn DocumentStore, document: &mut D) -> Result<(), StoreError> {
    let stored = store.insert(to_stored(document)?).await?;
    document.set_version(stored.version);
    Ok(())
}

/// Writes `document` back if nobody else has since it was read.
pub async fn save<D: Document>(store: &dyn DocumentStore, document: &mut D) -> Result<(), StoreError> {
    let expected = document.version();
    let stored = store.replace(to_stored(document)?, expected).await?;
    document.set_version(stored.version);
    Ok(())
}

/// Deletes a document that was inserted but must not stand.
pub async fn remove<D: Document>(store: &dyn DocumentStore, document: &D) -> Result<(), StoreError> {
    store
        .remove(D::COLLECTION, document.organization_id().into_inner(), document.id())
        .await
}

/// Appends a log entry to a stored document without reading it.
pub async fn push_log<D: Document>(
    store: &dyn DocumentStore,
    organization_id: OrganizationId,
    id: Uuid,
    entry: &LogEntry,
) -> Result<(), StoreError> {
    store
        .push(
            D::COLLECTION,
            organization_id.into_inner(),
            id,
            "logs",
            serde_json::to_value(entry)?,
        )
        .await
}

/// Returns true if a document with this short code exists.
pub async fn code_exists<D: Document>(
    store: &dyn DocumentStore,
    organization_id: OrganizationId,
    field: &str,
    code: &str,
) -> Result<bool, StoreError> {
    let filter = serde_json::json!({ field: code });
    Ok(store
        .count(D::COLLECTION, organization_id.into_inner(), &filter)
        .await?
        > 0)
}
