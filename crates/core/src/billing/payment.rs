//! Payment recording and metadata edits.

use chrono::{DateTime, Utc};
use haulage_shared::types::{OrganizationId, PaymentId, UserId};
use rust_decimal::Decimal;

use crate::audit::{Auditable, LogEntry};
use crate::billing::error::BillingError;
use crate::billing::types::{CreatePaymentInput, Invoice, Payment, UpdatePaymentInput};

/// Stateless payment operations.
pub struct PaymentService;

impl PaymentService {
    /// Builds a payment from an input already accepted by
    /// [`PaymentValidator`](crate::billing::PaymentValidator).
    pub fn build(
        organization_id: OrganizationId,
        payment_code: String,
        input: CreatePaymentInput,
        amount: Decimal,
        actor: UserId,
        now: DateTime<Utc>,
    ) -> Payment {
        let is_trip = !input.request_ids.is_empty();
        let mut payment = Payment {
            id: PaymentId::new(),
            organization_id,
            payment_id: payment_code,
            request_ids: input.request_ids,
            invoice_id: input.invoice_id,
            is_trip,
            amount,
            payment_date: input.payment_date.unwrap_or(now),
            method: input.method,
            reference: input.reference,
            disabled: false,
            logs: Vec::new(),
            remarks: Vec::new(),
            created_by: actor,
            created_at: now,
            updated_at: now,
            version: 0,
        };
        let details = match &payment.invoice_id {
            Some(invoice) => format!(
                "Payment {} of {} recorded against invoice {invoice}",
                payment.payment_id, payment.amount
            ),
            None => format!("Payment {} of {} recorded", payment.payment_id, payment.amount),
        };
        payment.record(LogEntry::new(actor, "created", details, now));
        payment
    }

    /// Checks that every line of an invoice payment is bundled on `invoice`.
    pub fn check_invoice(input: &CreatePaymentInput, invoice: &Invoice) -> Result<(), BillingError> {
        if invoice.disabled {
            return Err(BillingError::InvoiceDeleted(invoice.invoice_id.clone()));
        }
        for line in &input.request_ids {
            if !invoice.contains(&line.request_id) {
                return Err(BillingError::NotOnInvoice {
                    invoice_id: invoice.invoice_id.clone(),
                    request_id: line.request_id.clone(),
                });
            }
        }
        Ok(())
    }

    /// Log entry pushed onto a trip the payment was applied to.
    #[must_use]
    pub fn trip_log(payment: &Payment, request_id: &str, actor: UserId, now: DateTime<Utc>) -> LogEntry {
        LogEntry::new(
            actor,
            "paid",
            format!(
                "{} paid towards trip {request_id} by payment {}",
                payment.paid_towards(request_id),
                payment.payment_id
            ),
            now,
        )
    }

    /// Applies a metadata edit.
    pub fn apply_update(
        payment: &mut Payment,
        input: UpdatePaymentInput,
        now: DateTime<Utc>,
    ) -> Result<(), BillingError> {
        if payment.disabled {
            return Err(BillingError::PaymentDeleted(payment.payment_id.clone()));
        }
        if let Some(method) = input.method {
            payment.method = Some(method);
        }
        if let Some(reference) = input.reference {
            payment.reference = Some(reference);
        }
        if let Some(date) = input.payment_date {
            payment.payment_date = date;
        }
        payment.updated_at = now;
        Ok(())
    }

    /// Soft-deletes the payment, removing it from every balance.
    pub fn disable(payment: &mut Payment, now: DateTime<Utc>) -> Result<(), BillingError> {
        if payment.disabled {
            return Err(BillingError::PaymentDeleted(payment.payment_id.clone()));
        }
        payment.disabled = true;
        payment.updated_at = now;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::billing::types::RequestLine;
    use rust_decimal_macros::dec;

    fn payment() -> Payment {
        PaymentService::build(
            OrganizationId::new(),
            "818181".into(),
            CreatePaymentInput {
                request_ids: vec![
                    RequestLine::new("100001", dec!(250)),
                    RequestLine::new("100002", dec!(50)),
                ],
                method: Some("transfer".into()),
                ..Default::default()
            },
            dec!(300),
            UserId::new(),
            Utc::now(),
        )
    }

    #[test]
    fn test_build_marks_trip_payment() {
        let p = payment();
        assert!(p.is_trip);
        assert_eq!(p.amount, dec!(300));
        assert_eq!(p.logs.len(), 1);
        assert_eq!(p.paid_towards("100002"), dec!(50));
    }

    #[test]
    fn test_trip_log_names_amount() {
        let p = payment();
        let entry = PaymentService::trip_log(&p, "100001", UserId::new(), Utc::now());
        assert_eq!(entry.action, "paid");
        assert!(entry.details.contains("250"));
        assert!(entry.details.contains("818181"));
    }

    #[test]
    fn test_update_and_disable() {
        let mut p = payment();
        PaymentService::apply_update(
            &mut p,
            UpdatePaymentInput {
                reference: Some("TRX-99".into()),
                ..Default::default()
            },
            Utc::now(),
        )
        .unwrap();
        assert_eq!(p.reference.as_deref(), Some("TRX-99"));
        assert_eq!(p.method.as_deref(), Some("transfer"));

        PaymentService::disable(&mut p, Utc::now()).unwrap();
        assert!(p.disabled);
        assert!(matches!(
            PaymentService::disable(&mut p, Utc::now()),
            Err(BillingError::PaymentDeleted(_))
        ));
        assert!(PaymentService::apply_update(&mut p, UpdatePaymentInput::default(), Utc::now()).is_err());
    }
}
