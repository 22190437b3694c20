//! Repositories: load documents, run the core rules, persist the result.
//!
//! Each repository sequences one family of operations. Validation,
//! authorization and consistency failures return before any write;
//! secondary writes after a primary financial write are best effort and
//! only logged on failure.

pub mod invoice;
pub mod payment;
pub mod remark;
pub mod trip;
pub mod vehicle;

#[cfg(test)]
pub(crate) mod test_support;

use std::sync::Arc;

use haulage_core::audit::{FieldChange, diff_fields};
use haulage_core::identifier::CodeGenerator;
use haulage_shared::{AppError, AppResult};
use haulage_shared::config::InvoiceConfig;
use haulage_shared::types::OrganizationId;
use serde::Serialize;
use serde_json::Value;

use crate::access::{AccessPolicy, AccessRequest, Actor, ensure_can_edit};
use crate::directory::Directory;
use crate::document::{self, Document};
use crate::locks::TripLocks;
use crate::store::{SharedStore, StoreError};

pub use invoice::{InvoiceListQuery, InvoiceRepository, InvoiceView};
pub use payment::{PaymentListQuery, PaymentRepository};
pub use remark::{RemarkRepository, RemarkTarget};
pub use trip::{TripListQuery, TripRepository, TripView};
pub use vehicle::{VehicleListQuery, VehicleRepository};

/// Bookkeeping fields never reported in update diffs.
pub(crate) const DIFF_IGNORED: &[&str] = &["logs", "remarks", "version", "updatedAt", "timeline"];

/// Everything a repository needs besides its own logic.
#[derive(Clone)]
pub struct StoreContext {
    /// Document store backend.
    pub store: SharedStore,
    /// Membership and name lookups.
    pub directory: Arc<dyn Directory>,
    /// Edit permissions.
    pub policy: Arc<dyn AccessPolicy>,
    /// Per-trip locks.
    pub locks: TripLocks,
    /// Short-code generator.
    pub codes: CodeGenerator,
    /// Invoice settings.
    pub invoices: InvoiceConfig,
}

impl std::fmt::Debug for StoreContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreContext")
            .field("codes", &self.codes)
            .field("invoices", &self.invoices)
            .finish_non_exhaustive()
    }
}

impl StoreContext {
    /// Fails with `Forbidden` unless the actor may edit entities of
    /// `organization_id`.
    pub(crate) async fn authorize(&self, actor: Actor, organization_id: OrganizationId) -> AppResult<()> {
        ensure_can_edit(
            self.policy.as_ref(),
            AccessRequest {
                entity_organization: organization_id,
                remark_author: None,
                user_id: actor.user_id,
            },
        )
        .await
    }

    /// Draws a short code not yet used in `D`'s collection.
    pub(crate) async fn next_code<D: Document>(
        &self,
        organization_id: OrganizationId,
        field: &str,
    ) -> AppResult<String> {
        let store = self.store.as_ref();
        self.codes
            .generate(|code| async move {
                let taken = document::code_exists::<D>(store, organization_id, field, &code).await?;
                Ok::<_, AppError>(taken)
            })
            .await
    }
}

/// The repositories sharing one context.
#[derive(Debug, Clone)]
pub struct Repositories {
    /// Trips and the trip state machine.
    pub trips: TripRepository,
    /// Vehicles.
    pub vehicles: VehicleRepository,
    /// Payments.
    pub payments: PaymentRepository,
    /// Invoices.
    pub invoices: InvoiceRepository,
    /// Remarks on any document.
    pub remarks: RemarkRepository,
}

impl Repositories {
    /// Builds every repository over one context.
    #[must_use]
    pub fn new(ctx: StoreContext) -> Self {
        Self {
            trips: TripRepository::new(ctx.clone()),
            vehicles: VehicleRepository::new(ctx.clone()),
            payments: PaymentRepository::new(ctx.clone()),
            invoices: InvoiceRepository::new(ctx.clone()),
            remarks: RemarkRepository::new(ctx),
        }
    }
}

/// Serializes a document for diffing.
pub(crate) fn snapshot<T: Serialize>(value: &T) -> Result<Value, StoreError> {
    Ok(serde_json::to_value(value)?)
}

/// Field-level diff between two snapshots, bookkeeping fields excluded.
pub(crate) fn changes(before: &Value, after: &Value) -> Vec<FieldChange> {
    diff_fields(before, after, DIFF_IGNORED)
}

/// "amount, pickupLocation" style summary of a diff.
pub(crate) fn changed_fields(changes: &[FieldChange]) -> String {
    changes
        .iter()
        .map(|c| c.field.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}
