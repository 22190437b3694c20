//! Remark threads on trips, vehicles, payments and invoices.

use std::str::FromStr;

use chrono::Utc;
use haulage_core::audit::{Auditable, FieldChange, LogEntry, Remark, Remarkable};
use haulage_core::billing::{Invoice, Payment};
use haulage_core::trip::Trip;
use haulage_core::vehicle::Vehicle;
use haulage_shared::types::RemarkId;
use haulage_shared::{AppError, AppResult};
use serde::Deserialize;
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use super::StoreContext;
use crate::access::{AccessRequest, Actor, ensure_can_edit};
use crate::document::{self, Document};
use crate::store::DocumentStore;

/// Documents that carry remarks, named as in their URL segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum RemarkTarget {
    /// `trips`
    #[serde(rename = "trips")]
    Trip,
    /// `vehicles`
    #[serde(rename = "vehicles")]
    Vehicle,
    /// `payments`
    #[serde(rename = "payments")]
    Payment,
    /// `invoices`
    #[serde(rename = "invoices")]
    Invoice,
}

impl FromStr for RemarkTarget {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "trips" => Ok(Self::Trip),
            "vehicles" => Ok(Self::Vehicle),
            "payments" => Ok(Self::Payment),
            "invoices" => Ok(Self::Invoice),
            other => Err(AppError::NotFound(format!("Unknown remark target '{other}'"))),
        }
    }
}

/// Remark repository.
#[derive(Debug, Clone)]
pub struct RemarkRepository {
    ctx: StoreContext,
}

/// Expands to a call of `$method::<D>` for the document type of `$target`.
macro_rules! dispatch {
    ($self:ident, $target:expr, $method:ident ( $($arg:expr),* )) => {
        match $target {
            RemarkTarget::Trip => $self.$method::<Trip>($($arg),*).await,
            RemarkTarget::Vehicle => $self.$method::<Vehicle>($($arg),*).await,
            RemarkTarget::Payment => $self.$method::<Payment>($($arg),*).await,
            RemarkTarget::Invoice => $self.$method::<Invoice>($($arg),*).await,
        }
    };
}

impl RemarkRepository {
    /// Creates a new remark repository.
    #[must_use]
    pub const fn new(ctx: StoreContext) -> Self {
        Self { ctx }
    }

    fn store(&self) -> &dyn DocumentStore {
        self.ctx.store.as_ref()
    }

    /// Adds a remark by the actor.
    ///
    /// # Errors
    ///
    /// Returns `Validation` for blank text and `NotFound` for a missing
    /// document.
    pub async fn add(&self, actor: Actor, target: RemarkTarget, id: Uuid, text: &str) -> AppResult<Remark> {
        dispatch!(self, target, add_to(actor, id, text))
    }

    /// Replaces the text of the actor's own remark.
    ///
    /// # Errors
    ///
    /// Returns `Forbidden` when the actor did not write the remark.
    pub async fn edit(
        &self,
        actor: Actor,
        target: RemarkTarget,
        id: Uuid,
        remark_id: RemarkId,
        text: &str,
    ) -> AppResult<Remark> {
        dispatch!(self, target, edit_on(actor, id, remark_id, text))
    }

    /// Removes the actor's own remark.
    ///
    /// # Errors
    ///
    /// Returns `Forbidden` when the actor did not write the remark.
    pub async fn delete(
        &self,
        actor: Actor,
        target: RemarkTarget,
        id: Uuid,
        remark_id: RemarkId,
    ) -> AppResult<Remark> {
        dispatch!(self, target, delete_on(actor, id, remark_id))
    }

    /// The remark thread of a document, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for a missing document.
    pub async fn list(&self, actor: Actor, target: RemarkTarget, id: Uuid) -> AppResult<Vec<Remark>> {
        dispatch!(self, target, list_on(actor, id))
    }

    async fn load<D: Document>(&self, actor: Actor, id: Uuid) -> AppResult<D> {
        document::load::<D>(self.store(), actor.organization_id, id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("{} {id} not found", D::LABEL)))
    }

    async fn authorize_remark<D: Document + Remarkable>(
        &self,
        actor: Actor,
        document: &D,
        remark_id: RemarkId,
    ) -> AppResult<()> {
        let author = document
            .remark_author(remark_id)
            .ok_or_else(|| AppError::NotFound(format!("Remark {remark_id} not found")))?;
        ensure_can_edit(
            self.ctx.policy.as_ref(),
            AccessRequest {
                entity_organization: document.organization_id(),
                remark_author: Some(author),
                user_id: actor.user_id,
            },
        )
        .await
    }

    async fn add_to<D>(&self, actor: Actor, id: Uuid, text: &str) -> AppResult<Remark>
    where
        D: Document + Remarkable + Auditable,
    {
        let mut document: D = self.load(actor, id).await?;
        self.ctx.authorize(actor, document.organization_id()).await?;

        let now = Utc::now();
        let remark_id = document.add_remark(actor.user_id, text, now)?;
        let remark = find_remark(&document, remark_id)?;
        document.record(
            LogEntry::new(actor.user_id, "remark added", format!("{} remark added", D::LABEL), now)
                .with_difference(vec![FieldChange::new(
                    "remark",
                    json!(null),
                    json!(remark.remark),
                )]),
        );
        document::save(self.store(), &mut document).await?;
        info!(collection = D::COLLECTION, document_id = %id, remark_id = %remark_id, "Remark added");
        Ok(remark)
    }

    async fn edit_on<D>(&self, actor: Actor, id: Uuid, remark_id: RemarkId, text: &str) -> AppResult<Remark>
    where
        D: Document + Remarkable + Auditable,
    {
        let mut document: D = self.load(actor, id).await?;
        self.authorize_remark(actor, &document, remark_id).await?;

        let now = Utc::now();
        let previous = document.edit_remark(remark_id, actor.user_id, text, now)?;
        let remark = find_remark(&document, remark_id)?;
        document.record(
            LogEntry::new(actor.user_id, "remark edited", format!("{} remark edited", D::LABEL), now)
                .with_difference(vec![FieldChange::new(
                    "remark",
                    json!(previous),
                    json!(remark.remark),
                )]),
        );
        document::save(self.store(), &mut document).await?;
        info!(collection = D::COLLECTION, document_id = %id, remark_id = %remark_id, "Remark edited");
        Ok(remark)
    }

    async fn delete_on<D>(&self, actor: Actor, id: Uuid, remark_id: RemarkId) -> AppResult<Remark>
    where
        D: Document + Remarkable + Auditable,
    {
        let mut document: D = self.load(actor, id).await?;
        self.authorize_remark(actor, &document, remark_id).await?;

        let now = Utc::now();
        let removed = document.delete_remark(remark_id, actor.user_id)?;
        document.record(
            LogEntry::new(actor.user_id, "remark deleted", format!("{} remark deleted", D::LABEL), now)
                .with_difference(vec![FieldChange::new(
                    "remark",
                    json!(removed.remark),
                    json!(null),
                )]),
        );
        document::save(self.store(), &mut document).await?;
        info!(collection = D::COLLECTION, document_id = %id, remark_id = %remark_id, "Remark deleted");
        Ok(removed)
    }

    async fn list_on<D>(&self, actor: Actor, id: Uuid) -> AppResult<Vec<Remark>>
    where
        D: Document + Remarkable + Auditable,
    {
        let document: D = self.load(actor, id).await?;
        self.ctx.authorize(actor, document.organization_id()).await?;
        Ok(document.remarks().to_vec())
    }
}

fn find_remark<D: Remarkable>(document: &D, remark_id: RemarkId) -> AppResult<Remark> {
    document
        .remarks()
        .iter()
        .find(|r| r.id == remark_id)
        .cloned()
        .ok_or_else(|| AppError::Internal(format!("Remark {remark_id} vanished after write")))
}
