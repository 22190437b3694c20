//! Payment repository: validated recording, metadata edits and views.

use chrono::Utc;
use futures::future::join_all;
use haulage_core::audit::{Auditable, LogEntry};
use haulage_core::billing::{
    BillingError, CreatePaymentInput, Invoice, InvoiceService, Payment, PaymentService,
    PaymentValidator, UpdatePaymentInput,
};
use haulage_core::trip::Trip;
use haulage_shared::AppResult;
use haulage_shared::types::{PageRequest, PageResponse, PaymentId};
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info, warn};

use super::trip::{find_by_request_id, payments_for};
use super::{StoreContext, changed_fields, changes, snapshot};
use crate::access::Actor;
use crate::document;
use crate::store::DocumentStore;

/// Payment list filters.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentListQuery {
    /// Only payments with a line for this trip.
    #[serde(default)]
    pub request_id: Option<String>,
    /// Only payments against this invoice.
    #[serde(default)]
    pub invoice_id: Option<String>,
    /// Include soft-deleted payments.
    #[serde(default)]
    pub include_disabled: bool,
}

/// Payment repository.
#[derive(Debug, Clone)]
pub struct PaymentRepository {
    ctx: StoreContext,
}

impl PaymentRepository {
    /// Creates a new payment repository.
    #[must_use]
    pub const fn new(ctx: StoreContext) -> Self {
        Self { ctx }
    }

    fn store(&self) -> &dyn DocumentStore {
        self.ctx.store.as_ref()
    }

    async fn load(&self, actor: Actor, payment_id: PaymentId) -> AppResult<Payment> {
        document::load::<Payment>(self.store(), actor.organization_id, payment_id.into_inner())
            .await?
            .ok_or_else(|| BillingError::PaymentNotFound(payment_id.to_string()).into())
    }

    /// Records a payment after checking every line against its trip's
    /// current balance.
    ///
    /// The trips named by the payment stay locked from the balance read
    /// until the payment is stored, so concurrent payments cannot overpay.
    /// A rejected payment writes nothing and reports every bad line.
    ///
    /// # Errors
    ///
    /// Returns `Validation` for malformed input, `NotFound` for an unknown
    /// invoice, `BusinessRule` when any line is rejected, `Conflict` when a
    /// paid trip changed elsewhere before the payment was confirmed.
    pub async fn create(&self, actor: Actor, input: CreatePaymentInput) -> AppResult<Payment> {
        let org = actor.organization_id;
        self.ctx.authorize(actor, org).await?;
        let amount = PaymentValidator::check_input(&input)?;

        let invoice = match &input.invoice_id {
            Some(code) => {
                let invoice = document::find_one::<Invoice>(
                    self.store(),
                    org,
                    &json!({ "invoiceId": code }),
                )
                .await?
                .ok_or_else(|| BillingError::InvoiceNotFound(code.clone()))?;
                PaymentService::check_invoice(&input, &invoice)?;
                Some(invoice)
            }
            None => None,
        };

        let _guard = self
            .ctx
            .locks
            .acquire(org, input.request_ids.iter().map(|l| l.request_id.as_str()))
            .await;

        let store = self.store();
        let mut loaded = join_all(input.request_ids.iter().map(|line| async move {
            let trip = find_by_request_id(store, org, &line.request_id).await?;
            let payments = payments_for(store, org, &line.request_id).await?;
            Ok::<_, crate::store::StoreError>((trip, payments))
        }))
        .await
        .into_iter()
        .collect::<Result<Vec<_>, _>>()?;

        PaymentValidator::collect(input.request_ids.iter().zip(&loaded).map(
            |(line, (trip, payments))| PaymentValidator::check_line(line, trip.as_ref(), payments),
        ))?;

        let code = self.ctx.next_code::<Payment>(org, "paymentId").await?;
        let now = Utc::now();
        let mut payment = PaymentService::build(org, code, input, amount, actor.user_id, now);
        document::insert(self.store(), &mut payment).await?;
        if let Err(err) = self.claim_trips(&mut loaded).await {
            self.withdraw(&payment).await;
            return Err(err);
        }

        info!(
            payment_id = %payment.payment_id,
            amount = %payment.amount,
            lines = payment.request_ids.len(),
            "Payment recorded"
        );

        for trip in loaded.iter().filter_map(|(trip, _)| trip.as_ref()) {
            self.log_on_trip(&payment, trip, actor).await;
        }
        if let Some(mut invoice) = invoice {
            self.mark_invoice_sent(&mut invoice, &payment, actor).await;
        }

        Ok(payment)
    }

    /// Bumps the version of every paid trip from the version read before
    /// its payments were. The in-process lock only covers this process; a
    /// writer elsewhere that touched a trip since our read makes the claim
    /// fail, so its payment and ours cannot both have passed on one balance.
    async fn claim_trips(&self, loaded: &mut [(Option<Trip>, Vec<Payment>)]) -> AppResult<()> {
        for trip in loaded.iter_mut().filter_map(|(trip, _)| trip.as_mut()) {
            document::save(self.store(), trip).await?;
        }
        Ok(())
    }

    async fn withdraw(&self, payment: &Payment) {
        warn!(payment_id = %payment.payment_id, "Trip changed while recording payment, withdrawing it");
        if let Err(err) = document::remove(self.store(), payment).await {
            error!(
                payment_id = %payment.payment_id,
                error = %err,
                "Failed to withdraw payment"
            );
        }
    }

    async fn log_on_trip(&self, payment: &Payment, trip: &Trip, actor: Actor) {
        let entry = PaymentService::trip_log(payment, &trip.request_id, actor.user_id, Utc::now());
        if let Err(err) =
            document::push_log::<Trip>(self.store(), trip.organization_id, trip.id.into_inner(), &entry)
                .await
        {
            warn!(
                payment_id = %payment.payment_id,
                request_id = %trip.request_id,
                error = %err,
                "Failed to log payment on trip"
            );
        }
    }

    /// An invoice that receives money has evidently reached the customer.
    async fn mark_invoice_sent(&self, invoice: &mut Invoice, payment: &Payment, actor: Actor) {
        let now = Utc::now();
        if !InvoiceService::mark_sent(invoice, now) {
            return;
        }
        invoice.record(LogEntry::new(
            actor.user_id,
            "sent",
            format!(
                "Invoice {} marked sent on payment {}",
                invoice.invoice_id, payment.payment_id
            ),
            now,
        ));
        if let Err(err) = document::save(self.store(), invoice).await {
            warn!(
                invoice_id = %invoice.invoice_id,
                payment_id = %payment.payment_id,
                error = %err,
                "Failed to mark invoice sent"
            );
        }
    }

    /// Edits method, reference or date.
    ///
    /// # Errors
    ///
    /// Returns `BusinessRule` if the payment is deleted.
    pub async fn update(
        &self,
        actor: Actor,
        payment_id: PaymentId,
        input: UpdatePaymentInput,
    ) -> AppResult<Payment> {
        let mut payment = self.load(actor, payment_id).await?;
        self.ctx.authorize(actor, payment.organization_id).await?;

        let now = Utc::now();
        let before = snapshot(&payment)?;
        PaymentService::apply_update(&mut payment, input, now)?;
        let difference = changes(&before, &snapshot(&payment)?);
        if difference.is_empty() {
            return Ok(payment);
        }

        let details = format!(
            "Payment {} updated: {}",
            payment.payment_id,
            changed_fields(&difference)
        );
        payment.record(LogEntry::new(actor.user_id, "updated", details, now).with_difference(difference));
        document::save(self.store(), &mut payment).await?;
        info!(payment_id = %payment.payment_id, "Payment updated");
        Ok(payment)
    }

    /// Soft-deletes a payment; its lines stop counting towards balances.
    ///
    /// # Errors
    ///
    /// Returns `BusinessRule` if the payment is already deleted.
    pub async fn disable(&self, actor: Actor, payment_id: PaymentId) -> AppResult<Payment> {
        let mut payment = self.load(actor, payment_id).await?;
        self.ctx.authorize(actor, payment.organization_id).await?;

        let now = Utc::now();
        PaymentService::disable(&mut payment, now)?;
        payment.record(LogEntry::new(
            actor.user_id,
            "deleted",
            format!("Payment {} deleted", payment.payment_id),
            now,
        ));
        document::save(self.store(), &mut payment).await?;
        info!(payment_id = %payment.payment_id, "Payment disabled");
        Ok(payment)
    }

    /// One payment.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the payment does not exist in the organisation.
    pub async fn view(&self, actor: Actor, payment_id: PaymentId) -> AppResult<Payment> {
        let payment = self.load(actor, payment_id).await?;
        self.ctx.authorize(actor, payment.organization_id).await?;
        Ok(payment)
    }

    /// Payments of the organisation, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub async fn list(
        &self,
        actor: Actor,
        query: PaymentListQuery,
        page: PageRequest,
    ) -> AppResult<PageResponse<Payment>> {
        let org = actor.organization_id;
        self.ctx.authorize(actor, org).await?;

        let mut filter = json!({});
        if let Some(request_id) = query.request_id {
            filter["requestIds"] = json!([{ "requestId": request_id }]);
        }
        if let Some(invoice_id) = query.invoice_id {
            filter["invoiceId"] = json!(invoice_id);
        }
        if !query.include_disabled {
            filter["disabled"] = json!(false);
        }

        let mut payments = document::find::<Payment>(self.store(), org, &filter).await?;
        payments.reverse();
        Ok(PageResponse::from_items(payments, page))
    }
}
