//! Invoice assembly and status derivation.

use std::collections::HashSet;
use std::fmt;

use chrono::{DateTime, Duration, Utc};
use haulage_shared::types::{CustomerId, InvoiceId, OrganizationId, UserId, VendorId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::audit::{Auditable, LogEntry};
use crate::billing::balance::{BalanceCalculator, BalanceScope};
use crate::billing::error::BillingError;
use crate::billing::types::{
    Balance, CreateInvoiceInput, Invoice, Payment, RequestLine, ShareCode, UpdateInvoiceInput,
};
use crate::trip::Trip;

/// Derived invoice status. Never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InvoiceStatus {
    /// Not sent, nothing paid.
    Draft,
    /// Sent, nothing paid.
    Sent,
    /// Some money received, some still due.
    #[serde(rename = "Partially Paid")]
    PartiallyPaid,
    /// Fully settled.
    Paid,
}

impl InvoiceStatus {
    /// Returns the string representation of the status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "Draft",
            Self::Sent => "Sent",
            Self::PartiallyPaid => "Partially Paid",
            Self::Paid => "Paid",
        }
    }

    /// Status of a single line.
    #[must_use]
    pub fn for_line(sent_to_customer: bool, balance: Balance) -> Self {
        if balance.paid > Decimal::ZERO {
            if balance.amount_due <= Decimal::ZERO {
                Self::Paid
            } else {
                Self::PartiallyPaid
            }
        } else if sent_to_customer {
            Self::Sent
        } else {
            Self::Draft
        }
    }
}

impl fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One bundled trip with its invoice-scoped balance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceLineView {
    /// The trip's request id.
    pub request_id: String,
    /// Snapshotted amount.
    pub amount: Decimal,
    /// Paid against this invoice.
    pub paid: Decimal,
    /// Still due.
    pub amount_due: Decimal,
    /// Line status.
    pub status: InvoiceStatus,
}

/// Derived totals and status of an invoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceSummary {
    /// Aggregate status.
    pub status: InvoiceStatus,
    /// Sum of line payments.
    pub paid: Decimal,
    /// Sum of line balances.
    pub amount_due: Decimal,
    /// Per-line breakdown.
    pub lines: Vec<InvoiceLineView>,
}

/// Stateless invoice operations.
pub struct InvoiceService;

impl InvoiceService {
    /// Derives per-line balances and the aggregate status.
    ///
    /// The invoice is Paid only when every line is Paid, Partially Paid when
    /// any line has received money, and otherwise Sent or Draft.
    #[must_use]
    pub fn summarize(invoice: &Invoice, payments: &[Payment]) -> InvoiceSummary {
        let lines: Vec<InvoiceLineView> = invoice
            .request_ids
            .iter()
            .map(|line| {
                let balance =
                    BalanceCalculator::for_invoice_line(line, &invoice.invoice_id, payments);
                InvoiceLineView {
                    request_id: line.request_id.clone(),
                    amount: line.amount,
                    paid: balance.paid,
                    amount_due: balance.amount_due,
                    status: InvoiceStatus::for_line(invoice.sent_to_customer, balance),
                }
            })
            .collect();

        let status = Self::aggregate(invoice.sent_to_customer, &lines);
        InvoiceSummary {
            status,
            paid: lines.iter().map(|l| l.paid).sum(),
            amount_due: lines.iter().map(|l| l.amount_due).sum(),
            lines,
        }
    }

    fn aggregate(sent_to_customer: bool, lines: &[InvoiceLineView]) -> InvoiceStatus {
        if !lines.is_empty() && lines.iter().all(|l| l.status == InvoiceStatus::Paid) {
            InvoiceStatus::Paid
        } else if lines.iter().any(|l| l.paid > Decimal::ZERO) {
            InvoiceStatus::PartiallyPaid
        } else if sent_to_customer {
            InvoiceStatus::Sent
        } else {
            InvoiceStatus::Draft
        }
    }

    /// Checks that trips can be billed together and returns their vendor.
    ///
    /// All trips must share one vendor (or all have none) and none may
    /// already sit on an active invoice in `invoices`.
    pub fn verify_trips(trips: &[Trip], invoices: &[Invoice]) -> Result<Option<VendorId>, BillingError> {
        let vendors: HashSet<Option<VendorId>> = trips.iter().map(|t| t.vendor_id).collect();
        if vendors.len() > 1 {
            return Err(BillingError::VendorMismatch);
        }

        let invoiced: Vec<String> = trips
            .iter()
            .filter(|t| {
                invoices
                    .iter()
                    .any(|inv| !inv.disabled && inv.contains(&t.request_id))
            })
            .map(|t| t.request_id.clone())
            .collect();
        if !invoiced.is_empty() {
            return Err(BillingError::AlreadyInvoiced(invoiced));
        }

        Ok(vendors.into_iter().next().flatten())
    }

    /// Builds a new invoice over `trips`.
    ///
    /// `trips` holds the trips found for `input.request_ids`; a requested id
    /// with no trip is reported as not found. `payments` must cover every
    /// payment referencing those trips and `invoices` every invoice that
    /// might already bundle them.
    #[allow(clippy::too_many_arguments)]
    pub fn build(
        organization_id: OrganizationId,
        invoice_code: String,
        input: CreateInvoiceInput,
        trips: &[Trip],
        payments: &[Payment],
        invoices: &[Invoice],
        actor: UserId,
        now: DateTime<Utc>,
    ) -> Result<Invoice, BillingError> {
        if input.request_ids.is_empty() {
            return Err(BillingError::EmptyInvoice);
        }

        let mut seen = HashSet::new();
        let mut selected = Vec::with_capacity(input.request_ids.len());
        for request_id in &input.request_ids {
            if !seen.insert(request_id.as_str()) {
                return Err(BillingError::DuplicateRequestLine(request_id.clone()));
            }
            let trip = trips
                .iter()
                .find(|t| &t.request_id == request_id)
                .ok_or_else(|| BillingError::TripNotFound(request_id.clone()))?;
            if trip.ensure_live().is_err() {
                return Err(BillingError::TripNotFound(request_id.clone()));
            }
            selected.push(trip.clone());
        }

        let vendor_id = Self::verify_trips(&selected, invoices)?;

        let mut lines = Vec::with_capacity(selected.len());
        for trip in &selected {
            let due = BalanceCalculator::for_trip(trip, payments, BalanceScope::All).amount_due;
            if due <= Decimal::ZERO {
                return Err(BillingError::TripSettled(trip.request_id.clone()));
            }
            lines.push(RequestLine::new(trip.request_id.clone(), due));
        }

        let computed: Decimal = lines.iter().map(|l| l.amount).sum();
        if computed != input.amount {
            return Err(BillingError::InvoiceTotalMismatch {
                expected: input.amount,
                computed,
            });
        }

        let customer_id = invoice_customer(input.customer_id, &selected)?;

        let mut invoice = Invoice {
            id: InvoiceId::new(),
            organization_id,
            invoice_id: invoice_code,
            request_ids: lines,
            vendor_id,
            customer_id,
            amount: computed,
            due_date: input.due_date,
            sent_to_customer: false,
            share_code: None,
            disabled: false,
            logs: Vec::new(),
            remarks: Vec::new(),
            created_by: actor,
            created_at: now,
            updated_at: now,
            version: 0,
        };
        let details = format!(
            "Invoice {} created for {} trip(s) totalling {}",
            invoice.invoice_id,
            invoice.request_ids.len(),
            invoice.amount
        );
        invoice.record(LogEntry::new(actor, "created", details, now));
        Ok(invoice)
    }

    /// Applies a metadata edit.
    pub fn apply_update(
        invoice: &mut Invoice,
        input: UpdateInvoiceInput,
        now: DateTime<Utc>,
    ) -> Result<(), BillingError> {
        ensure_live(invoice)?;
        if let Some(due_date) = input.due_date {
            invoice.due_date = Some(due_date);
        }
        if let Some(sent) = input.sent_to_customer {
            invoice.sent_to_customer = sent;
        }
        invoice.updated_at = now;
        Ok(())
    }

    /// Stamps the invoice as sent. Returns false if it already was.
    pub fn mark_sent(invoice: &mut Invoice, now: DateTime<Utc>) -> bool {
        if invoice.sent_to_customer {
            return false;
        }
        invoice.sent_to_customer = true;
        invoice.updated_at = now;
        true
    }

    /// Issues a fresh share code valid for `ttl`.
    pub fn share(
        invoice: &mut Invoice,
        code: String,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> Result<ShareCode, BillingError> {
        ensure_live(invoice)?;
        if ttl <= Duration::zero() {
            return Err(BillingError::InvalidShareTtl);
        }
        let expires_at = now
            .checked_add_signed(ttl)
            .ok_or(BillingError::InvalidShareTtl)?;
        let share = ShareCode { code, expires_at };
        invoice.share_code = Some(share.clone());
        invoice.updated_at = now;
        Ok(share)
    }

    /// Soft-deletes the invoice, releasing its trips for re-invoicing.
    pub fn disable(invoice: &mut Invoice, now: DateTime<Utc>) -> Result<(), BillingError> {
        ensure_live(invoice)?;
        invoice.disabled = true;
        invoice.share_code = None;
        invoice.updated_at = now;
        Ok(())
    }
}

fn ensure_live(invoice: &Invoice) -> Result<(), BillingError> {
    if invoice.disabled {
        return Err(BillingError::InvoiceDeleted(invoice.invoice_id.clone()));
    }
    Ok(())
}

/// The customer an invoice bills: the requested one, which must agree with
/// every customer trip, or else the trips' single shared customer.
fn invoice_customer(
    requested: Option<CustomerId>,
    trips: &[Trip],
) -> Result<Option<CustomerId>, BillingError> {
    let billed: HashSet<CustomerId> = trips.iter().filter_map(|t| t.customer_id).collect();
    match requested {
        Some(customer) if billed.iter().any(|c| *c != customer) => Err(BillingError::CustomerMismatch),
        Some(customer) => Ok(Some(customer)),
        None if billed.len() > 1 => Err(BillingError::CustomerMismatch),
        None => Ok(billed.into_iter().next()),
    }
}
