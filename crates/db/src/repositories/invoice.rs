//! Invoice repository: bundling trips, status views and share links.

use std::collections::HashSet;

use chrono::{Duration, Utc};
use haulage_core::audit::{Auditable, LogEntry};
use haulage_core::billing::{
    BillingError, CreateInvoiceInput, Invoice, InvoiceService, InvoiceSummary, Payment,
    UpdateInvoiceInput,
};
use haulage_core::identifier::share_token;
use haulage_core::trip::Trip;
use haulage_shared::types::{InvoiceId, OrganizationId, PageRequest, PageResponse};
use haulage_shared::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

use super::trip::{find_by_request_id, payments_for};
use super::{StoreContext, changed_fields, changes, snapshot};
use crate::access::Actor;
use crate::document;
use crate::store::{DocumentStore, StoreError};

/// An invoice with its derived status and balances.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InvoiceView {
    /// The invoice.
    #[serde(flatten)]
    pub invoice: Invoice,
    /// Status, totals and per-line balances.
    #[serde(flatten)]
    pub summary: InvoiceSummary,
}

/// Invoice list filters.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceListQuery {
    /// Include soft-deleted invoices.
    #[serde(default)]
    pub include_disabled: bool,
}

/// Live invoices with a line for `request_id`.
pub(crate) async fn open_invoices_for(
    store: &dyn DocumentStore,
    organization_id: OrganizationId,
    request_id: &str,
) -> Result<Vec<Invoice>, StoreError> {
    document::find::<Invoice>(
        store,
        organization_id,
        &json!({ "requestIds": [{ "requestId": request_id }], "disabled": false }),
    )
    .await
}

/// Invoice repository.
#[derive(Debug, Clone)]
pub struct InvoiceRepository {
    ctx: StoreContext,
}

impl InvoiceRepository {
    /// Creates a new invoice repository.
    #[must_use]
    pub const fn new(ctx: StoreContext) -> Self {
        Self { ctx }
    }

    fn store(&self) -> &dyn DocumentStore {
        self.ctx.store.as_ref()
    }

    async fn load(&self, actor: Actor, invoice_id: InvoiceId) -> AppResult<Invoice> {
        document::load::<Invoice>(self.store(), actor.organization_id, invoice_id.into_inner())
            .await?
            .ok_or_else(|| BillingError::InvoiceNotFound(invoice_id.to_string()).into())
    }

    async fn summarized(&self, invoice: Invoice) -> AppResult<InvoiceView> {
        let payments = document::find::<Payment>(
            self.store(),
            invoice.organization_id,
            &json!({ "invoiceId": invoice.invoice_id, "disabled": false }),
        )
        .await?;
        let summary = InvoiceService::summarize(&invoice, &payments);
        Ok(InvoiceView { invoice, summary })
    }

    /// Bundles trips into a new invoice.
    ///
    /// Each line snapshots the trip's current amount due, and the supplied
    /// total must match their sum. The trips stay locked until the invoice
    /// is stored so two invoices cannot claim the same trip.
    ///
    /// # Errors
    ///
    /// Returns `Validation` for an empty or repeating trip list, `NotFound`
    /// for unknown trips or customer, `BusinessRule` for mixed vendors,
    /// trips already invoiced or a total mismatch.
    pub async fn create(&self, actor: Actor, input: CreateInvoiceInput) -> AppResult<InvoiceView> {
        let org = actor.organization_id;
        self.ctx.authorize(actor, org).await?;
        if let Some(customer) = input.customer_id {
            if !self.ctx.directory.customer_exists(org, customer).await? {
                return Err(AppError::NotFound(format!("Customer {customer} not found")));
            }
        }

        let _guard = self
            .ctx
            .locks
            .acquire(org, input.request_ids.iter().map(String::as_str))
            .await;

        let mut trips: Vec<Trip> = Vec::with_capacity(input.request_ids.len());
        let mut payments: Vec<Payment> = Vec::new();
        let mut invoices: Vec<Invoice> = Vec::new();
        let mut seen_payments = HashSet::new();
        let mut seen_invoices = HashSet::new();
        for request_id in &input.request_ids {
            if let Some(trip) = find_by_request_id(self.store(), org, request_id).await? {
                trips.push(trip);
            }
            for payment in payments_for(self.store(), org, request_id).await? {
                if seen_payments.insert(payment.id) {
                    payments.push(payment);
                }
            }
            for invoice in open_invoices_for(self.store(), org, request_id).await? {
                if seen_invoices.insert(invoice.id) {
                    invoices.push(invoice);
                }
            }
        }

        let code = self.ctx.next_code::<Invoice>(org, "invoiceId").await?;
        let mut invoice = InvoiceService::build(
            org,
            code,
            input,
            &trips,
            &payments,
            &invoices,
            actor.user_id,
            Utc::now(),
        )?;
        document::insert(self.store(), &mut invoice).await?;

        info!(
            invoice_id = %invoice.invoice_id,
            amount = %invoice.amount,
            trips = invoice.request_ids.len(),
            "Invoice created"
        );
        self.summarized(invoice).await
    }

    /// Edits due date or sent flag.
    ///
    /// # Errors
    ///
    /// Returns `BusinessRule` if the invoice is deleted.
    pub async fn update(
        &self,
        actor: Actor,
        invoice_id: InvoiceId,
        input: UpdateInvoiceInput,
    ) -> AppResult<InvoiceView> {
        let mut invoice = self.load(actor, invoice_id).await?;
        self.ctx.authorize(actor, invoice.organization_id).await?;

        let now = Utc::now();
        let before = snapshot(&invoice)?;
        InvoiceService::apply_update(&mut invoice, input, now)?;
        let difference = changes(&before, &snapshot(&invoice)?);
        if !difference.is_empty() {
            let details = format!(
                "Invoice {} updated: {}",
                invoice.invoice_id,
                changed_fields(&difference)
            );
            invoice.record(
                LogEntry::new(actor.user_id, "updated", details, now).with_difference(difference),
            );
            document::save(self.store(), &mut invoice).await?;
            info!(invoice_id = %invoice.invoice_id, "Invoice updated");
        }
        self.summarized(invoice).await
    }

    /// Issues a fresh public share code, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns `BusinessRule` if the invoice is deleted or the configured
    /// lifetime is not positive or runs past the representable range.
    pub async fn share(&self, actor: Actor, invoice_id: InvoiceId) -> AppResult<InvoiceView> {
        let mut invoice = self.load(actor, invoice_id).await?;
        self.ctx.authorize(actor, invoice.organization_id).await?;

        let now = Utc::now();
        let ttl = Duration::try_hours(self.ctx.invoices.share_code_ttl_hours)
            .ok_or(BillingError::InvalidShareTtl)?;
        let share = InvoiceService::share(&mut invoice, share_token(), ttl, now)?;
        invoice.record(LogEntry::new(
            actor.user_id,
            "shared",
            format!(
                "Invoice {} shared until {}",
                invoice.invoice_id,
                share.expires_at.to_rfc3339()
            ),
            now,
        ));
        document::save(self.store(), &mut invoice).await?;
        info!(invoice_id = %invoice.invoice_id, expires_at = %share.expires_at, "Invoice shared");
        self.summarized(invoice).await
    }

    /// Resolves a public share link. No membership is required, only a
    /// matching unexpired code.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for unknown, deleted, expired or mismatched codes.
    pub async fn view_shared(
        &self,
        organization_id: OrganizationId,
        invoice_code: &str,
        token: &str,
    ) -> AppResult<InvoiceView> {
        let not_found = || AppError::from(BillingError::InvoiceNotFound(invoice_code.to_string()));
        let invoice = document::find_one::<Invoice>(
            self.store(),
            organization_id,
            &json!({ "invoiceId": invoice_code, "disabled": false }),
        )
        .await?
        .ok_or_else(not_found)?;

        let valid = invoice
            .share_code
            .as_ref()
            .is_some_and(|share| share.code == token && share.is_valid_at(Utc::now()));
        if !valid {
            return Err(not_found());
        }
        self.summarized(invoice).await
    }

    /// Soft-deletes an invoice; its trips may be invoiced again.
    ///
    /// # Errors
    ///
    /// Returns `BusinessRule` if the invoice is already deleted.
    pub async fn disable(&self, actor: Actor, invoice_id: InvoiceId) -> AppResult<Invoice> {
        let mut invoice = self.load(actor, invoice_id).await?;
        self.ctx.authorize(actor, invoice.organization_id).await?;

        let now = Utc::now();
        InvoiceService::disable(&mut invoice, now)?;
        invoice.record(LogEntry::new(
            actor.user_id,
            "deleted",
            format!("Invoice {} deleted", invoice.invoice_id),
            now,
        ));
        document::save(self.store(), &mut invoice).await?;
        info!(invoice_id = %invoice.invoice_id, "Invoice disabled");
        Ok(invoice)
    }

    /// One invoice with status and balances.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the invoice does not exist in the organisation.
    pub async fn view(&self, actor: Actor, invoice_id: InvoiceId) -> AppResult<InvoiceView> {
        let invoice = self.load(actor, invoice_id).await?;
        self.ctx.authorize(actor, invoice.organization_id).await?;
        self.summarized(invoice).await
    }

    /// Invoices of the organisation, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub async fn list(
        &self,
        actor: Actor,
        query: InvoiceListQuery,
        page: PageRequest,
    ) -> AppResult<PageResponse<InvoiceView>> {
        let org = actor.organization_id;
        self.ctx.authorize(actor, org).await?;

        let filter = if query.include_disabled {
            json!({})
        } else {
            json!({ "disabled": false })
        };
        let invoices = document::find::<Invoice>(self.store(), org, &filter).await?;
        let payments = document::find::<Payment>(self.store(), org, &json!({ "disabled": false })).await?;

        let views = invoices
            .into_iter()
            .rev()
            .map(|invoice| {
                let relevant: Vec<Payment> = payments
                    .iter()
                    .filter(|p| p.invoice_id.as_deref() == Some(invoice.invoice_id.as_str()))
                    .cloned()
                    .collect();
                let summary = InvoiceService::summarize(&invoice, &relevant);
                InvoiceView { invoice, summary }
            })
            .collect();
        Ok(PageResponse::from_items(views, page))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::test_support::Fixture;
    use haulage_core::billing::{CreatePaymentInput, InvoiceStatus, RequestLine};
    use haulage_core::trip::UpdateTripInput;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn invoice_input(request_ids: &[&str], amount: Decimal) -> CreateInvoiceInput {
        CreateInvoiceInput {
            request_ids: request_ids.iter().map(|s| (*s).to_string()).collect(),
            amount,
            ..Default::default()
        }
    }

    async fn pay_invoice(fx: &Fixture, invoice: &str, request_id: &str, amount: Decimal) {
        fx.repos
            .payments
            .create(
                fx.actor,
                CreatePaymentInput {
                    request_ids: vec![RequestLine::new(request_id, amount)],
                    invoice_id: Some(invoice.to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_create_snapshots_amount_due() {
        let fx = Fixture::new().await;
        let a = fx.trip(dec!(1000)).await;
        let b = fx.trip(dec!(500)).await;
        fx.repos
            .payments
            .create(
                fx.actor,
                CreatePaymentInput {
                    request_ids: vec![RequestLine::new(a.trip.request_id.clone(), dec!(400))],
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let rids = [a.trip.request_id.as_str(), b.trip.request_id.as_str()];
        let err = fx
            .repos
            .invoices
            .create(fx.actor, invoice_input(&rids, dec!(1500)))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BusinessRule(_)));

        let view = fx
            .repos
            .invoices
            .create(fx.actor, invoice_input(&rids, dec!(1100)))
            .await
            .unwrap();
        assert_eq!(view.invoice.amount, dec!(1100));
        assert_eq!(view.invoice.vendor_id, Some(fx.vendor));
        assert_eq!(view.invoice.request_ids[0].amount, dec!(600));
        assert_eq!(view.summary.status, InvoiceStatus::Draft);
        assert_eq!(view.summary.paid, dec!(0));
        assert_eq!(view.summary.amount_due, dec!(1100));
    }

    #[tokio::test]
    async fn test_create_rejections() {
        let fx = Fixture::new().await;
        let a = fx.trip(dec!(100)).await;
        let b = fx.trip(dec!(200)).await;
        fx.repos
            .trips
            .update(
                fx.actor,
                b.trip.id,
                UpdateTripInput {
                    vendor_id: Some(fx.other_vendor),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        let (ra, rb) = (a.trip.request_id.as_str(), b.trip.request_id.as_str());

        let err = fx
            .repos
            .invoices
            .create(fx.actor, invoice_input(&[], dec!(0)))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let err = fx
            .repos
            .invoices
            .create(fx.actor, invoice_input(&[ra, rb], dec!(300)))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BusinessRule(_)));

        let err = fx
            .repos
            .invoices
            .create(fx.actor, invoice_input(&[ra, "999999"], dec!(100)))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        fx.repos
            .invoices
            .create(fx.actor, invoice_input(&[ra], dec!(100)))
            .await
            .unwrap();
        let err = fx
            .repos
            .invoices
            .create(fx.actor, invoice_input(&[ra], dec!(100)))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BusinessRule(msg) if msg.contains(ra)));
    }

    #[tokio::test]
    async fn test_reinvoice_after_disable() {
        let fx = Fixture::new().await;
        let a = fx.trip(dec!(250)).await;
        let rid = a.trip.request_id.as_str();

        let first = fx
            .repos
            .invoices
            .create(fx.actor, invoice_input(&[rid], dec!(250)))
            .await
            .unwrap();
        let disabled = fx.repos.invoices.disable(fx.actor, first.invoice.id).await.unwrap();
        assert!(disabled.disabled);
        assert_eq!(disabled.logs.last().unwrap().action, "deleted");

        let second = fx
            .repos
            .invoices
            .create(fx.actor, invoice_input(&[rid], dec!(250)))
            .await
            .unwrap();
        assert_ne!(second.invoice.invoice_id, first.invoice.invoice_id);

        let page = fx
            .repos
            .invoices
            .list(fx.actor, InvoiceListQuery::default(), PageRequest::default())
            .await
            .unwrap();
        assert_eq!(page.meta.total, 1);
    }

    #[tokio::test]
    async fn test_status_follows_payments() {
        let fx = Fixture::new().await;
        let a = fx.trip(dec!(600)).await;
        let b = fx.trip(dec!(400)).await;
        let (ra, rb) = (a.trip.request_id.as_str(), b.trip.request_id.as_str());

        let view = fx
            .repos
            .invoices
            .create(fx.actor, invoice_input(&[ra, rb], dec!(1000)))
            .await
            .unwrap();
        let code = view.invoice.invoice_id.clone();

        let sent = fx
            .repos
            .invoices
            .update(
                fx.actor,
                view.invoice.id,
                UpdateInvoiceInput {
                    sent_to_customer: Some(true),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(sent.summary.status, InvoiceStatus::Sent);

        pay_invoice(&fx, &code, ra, dec!(600)).await;
        let partial = fx.repos.invoices.view(fx.actor, view.invoice.id).await.unwrap();
        assert_eq!(partial.summary.status, InvoiceStatus::PartiallyPaid);
        assert_eq!(partial.summary.lines[0].status, InvoiceStatus::Paid);
        assert_eq!(partial.summary.lines[1].status, InvoiceStatus::Sent);

        pay_invoice(&fx, &code, rb, dec!(400)).await;
        let paid = fx.repos.invoices.view(fx.actor, view.invoice.id).await.unwrap();
        assert_eq!(paid.summary.status, InvoiceStatus::Paid);
        assert_eq!(paid.summary.amount_due, dec!(0));
    }

    #[tokio::test]
    async fn test_share_link() {
        let fx = Fixture::new().await;
        let a = fx.trip(dec!(300)).await;
        let view = fx
            .repos
            .invoices
            .create(fx.actor, invoice_input(&[a.trip.request_id.as_str()], dec!(300)))
            .await
            .unwrap();
        let org = fx.actor.organization_id;
        let code = view.invoice.invoice_id.clone();

        let err = fx.repos.invoices.view_shared(org, &code, "nope").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        let shared = fx.repos.invoices.share(fx.actor, view.invoice.id).await.unwrap();
        let share = shared.invoice.share_code.clone().unwrap();
        assert_eq!(share.code.len(), 32);
        assert!(share.expires_at > Utc::now());

        let public = fx.repos.invoices.view_shared(org, &code, &share.code).await.unwrap();
        assert_eq!(public.invoice.id, view.invoice.id);

        let err = fx
            .repos
            .invoices
            .view_shared(OrganizationId::new(), &code, &share.code)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        fx.repos.invoices.disable(fx.actor, view.invoice.id).await.unwrap();
        let err = fx.repos.invoices.view_shared(org, &code, &share.code).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_share_rejects_out_of_range_lifetime() {
        let fx = Fixture::new().await;
        let a = fx.trip(dec!(300)).await;
        let view = fx
            .repos
            .invoices
            .create(fx.actor, invoice_input(&[a.trip.request_id.as_str()], dec!(300)))
            .await
            .unwrap();

        for hours in [i64::MAX, 3_000_000_000, 0] {
            let mut ctx = fx.repos.invoices.ctx.clone();
            ctx.invoices.share_code_ttl_hours = hours;
            let err = InvoiceRepository::new(ctx)
                .share(fx.actor, view.invoice.id)
                .await
                .unwrap_err();
            assert!(matches!(err, AppError::BusinessRule(_)));
        }

        let stored = fx.repos.invoices.view(fx.actor, view.invoice.id).await.unwrap();
        assert!(stored.invoice.share_code.is_none());
    }
}
