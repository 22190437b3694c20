//! Organisation membership and display names.
//!
//! Users, vendors and customers are owned by the contacts service; this
//! crate only reads the `{id, organizationId, name, disabled}` entries it
//! keeps in the users, vendors and customers collections.

use async_trait::async_trait;
use haulage_shared::types::{CustomerId, OrganizationId, UserId, VendorId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::store::{SharedStore, StoreError, StoredDocument};

/// Directory entry kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectoryKind {
    /// Organisation members.
    User,
    /// Carriers a trip can be billed to.
    Vendor,
    /// Customers a trip can be billed to.
    Customer,
}

impl DirectoryKind {
    /// Collection holding this kind.
    #[must_use]
    pub const fn collection(self) -> &'static str {
        match self {
            Self::User => "users",
            Self::Vendor => "vendors",
            Self::Customer => "customers",
        }
    }
}

/// A member, vendor or customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryEntry {
    /// Entry id.
    pub id: Uuid,
    /// Owning organisation.
    pub organization_id: OrganizationId,
    /// Display name.
    pub name: String,
    /// Soft-delete flag.
    #[serde(default)]
    pub disabled: bool,
}

/// Membership and name lookups.
#[async_trait]
pub trait Directory: Send + Sync {
    /// Returns true if `user` belongs to the organisation.
    async fn is_member(&self, organization_id: OrganizationId, user: UserId) -> Result<bool, StoreError>;

    /// Returns true if the vendor exists in the organisation.
    async fn vendor_exists(&self, organization_id: OrganizationId, vendor: VendorId) -> Result<bool, StoreError>;

    /// Returns true if the customer exists in the organisation.
    async fn customer_exists(
        &self,
        organization_id: OrganizationId,
        customer: CustomerId,
    ) -> Result<bool, StoreError>;

    /// Display name of an entry.
    async fn name(
        &self,
        kind: DirectoryKind,
        organization_id: OrganizationId,
        id: Uuid,
    ) -> Result<Option<String>, StoreError>;
}

/// [`Directory`] reading entries from the document store.
#[derive(Clone)]
pub struct StoreDirectory {
    store: SharedStore,
}

impl std::fmt::Debug for StoreDirectory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreDirectory").finish_non_exhaustive()
    }
}

impl StoreDirectory {
    /// Creates a directory over a store.
    #[must_use]
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    /// Live entry by id.
    pub async fn entry(
        &self,
        kind: DirectoryKind,
        organization_id: OrganizationId,
        id: Uuid,
    ) -> Result<Option<DirectoryEntry>, StoreError> {
        let Some(stored) = self
            .store
            .find_by_id(kind.collection(), organization_id.into_inner(), id)
            .await?
        else {
            return Ok(None);
        };
        let entry: DirectoryEntry = serde_json::from_value(stored.body)?;
        Ok((!entry.disabled).then_some(entry))
    }

    /// Adds an entry. Used by the contacts sync and by tests.
    pub async fn register(
        &self,
        kind: DirectoryKind,
        organization_id: OrganizationId,
        id: Uuid,
        name: &str,
    ) -> Result<DirectoryEntry, StoreError> {
        let entry = DirectoryEntry {
            id,
            organization_id,
            name: name.to_string(),
            disabled: false,
        };
        self.store
            .insert(StoredDocument {
                id,
                collection: kind.collection().to_string(),
                organization_id: organization_id.into_inner(),
                code: None,
                version: 0,
                disabled: false,
                body: serde_json::to_value(&entry)?,
            })
            .await?;
        Ok(entry)
    }
}

#[async_trait]
impl Directory for StoreDirectory {
    async fn is_member(&self, organization_id: OrganizationId, user: UserId) -> Result<bool, StoreError> {
        Ok(self
            .entry(DirectoryKind::User, organization_id, user.into_inner())
            .await?
            .is_some())
    }

    async fn vendor_exists(&self, organization_id: OrganizationId, vendor: VendorId) -> Result<bool, StoreError> {
        Ok(self
            .entry(DirectoryKind::Vendor, organization_id, vendor.into_inner())
            .await?
            .is_some())
    }

    async fn customer_exists(
        &self,
        organization_id: OrganizationId,
        customer: CustomerId,
    ) -> Result<bool, StoreError> {
        Ok(self
            .entry(DirectoryKind::Customer, organization_id, customer.into_inner())
            .await?
            .is_some())
    }

    async fn name(
        &self,
        kind: DirectoryKind,
        organization_id: OrganizationId,
        id: Uuid,
    ) -> Result<Option<String>, StoreError> {
        Ok(self
            .entry(kind, organization_id, id)
            .await?
            .map(|entry| entry.name))
    }
}
