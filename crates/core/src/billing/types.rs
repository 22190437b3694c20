//! Payment and invoice documents.

use chrono::{DateTime, Utc};
use haulage_shared::types::{CustomerId, InvoiceId, OrganizationId, PaymentId, UserId, VendorId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::audit::{LogEntry, Remark};

/// An amount applied to (or billed for) one trip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestLine {
    /// The trip's request id.
    pub request_id: String,
    /// Amount for this trip.
    pub amount: Decimal,
}

impl RequestLine {
    /// Creates a line.
    #[must_use]
    pub fn new(request_id: impl Into<String>, amount: Decimal) -> Self {
        Self {
            request_id: request_id.into(),
            amount,
        }
    }
}

/// `{paid, amountDue}` for a trip or invoice line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Balance {
    /// Sum of applied payment lines.
    pub paid: Decimal,
    /// What is still owed.
    pub amount_due: Decimal,
}

/// A money receipt, optionally spread across trips or settling an invoice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    /// Document id.
    pub id: PaymentId,
    /// Owning organisation.
    pub organization_id: OrganizationId,
    /// Organisation-unique six digit code.
    pub payment_id: String,
    /// Per-trip amounts, in the order supplied.
    #[serde(default)]
    pub request_ids: Vec<RequestLine>,
    /// Invoice code this payment settles.
    #[serde(default)]
    pub invoice_id: Option<String>,
    /// True when the payment is applied to trips.
    pub is_trip: bool,
    /// Total received.
    pub amount: Decimal,
    /// When the money was received.
    pub payment_date: DateTime<Utc>,
    /// Bank transfer, cash, ...
    #[serde(default)]
    pub method: Option<String>,
    /// External reference.
    #[serde(default)]
    pub reference: Option<String>,
    /// Soft-delete flag.
    #[serde(default)]
    pub disabled: bool,
    /// Audit log.
    #[serde(default)]
    pub logs: Vec<LogEntry>,
    /// Remarks.
    #[serde(default)]
    pub remarks: Vec<Remark>,
    /// Creator.
    pub created_by: UserId,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last modification time.
    pub updated_at: DateTime<Utc>,
    /// Optimistic concurrency version.
    #[serde(default)]
    pub version: i64,
}

crate::impl_audit_trail!(Payment);

impl Payment {
    /// Sum of this payment's lines for `request_id`.
    #[must_use]
    pub fn paid_towards(&self, request_id: &str) -> Decimal {
        self.request_ids
            .iter()
            .filter(|line| line.request_id == request_id)
            .map(|line| line.amount)
            .sum()
    }

    /// Returns true if any line references `request_id`.
    #[must_use]
    pub fn references(&self, request_id: &str) -> bool {
        self.request_ids.iter().any(|line| line.request_id == request_id)
    }
}

/// Time-limited token for sharing an invoice outside the organisation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareCode {
    /// Opaque token.
    pub code: String,
    /// When the token stops working.
    pub expires_at: DateTime<Utc>,
}

impl ShareCode {
    /// Returns true while the token is usable.
    #[must_use]
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

/// A bundle of trip charges billed together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Invoice {
    /// Document id.
    pub id: InvoiceId,
    /// Owning organisation.
    pub organization_id: OrganizationId,
    /// Organisation-unique six digit code.
    pub invoice_id: String,
    /// Bundled trips with amounts snapshotted at creation.
    pub request_ids: Vec<RequestLine>,
    /// Vendor shared by every bundled trip.
    #[serde(default)]
    pub vendor_id: Option<VendorId>,
    /// Billed customer.
    #[serde(default)]
    pub customer_id: Option<CustomerId>,
    /// Invoice total.
    pub amount: Decimal,
    /// Payment due date.
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
    /// Whether the invoice went out.
    #[serde(default)]
    pub sent_to_customer: bool,
    /// External access token.
    #[serde(default)]
    pub share_code: Option<ShareCode>,
    /// Soft-delete flag.
    #[serde(default)]
    pub disabled: bool,
    /// Audit log.
    #[serde(default)]
    pub logs: Vec<LogEntry>,
    /// Remarks.
    #[serde(default)]
    pub remarks: Vec<Remark>,
    /// Creator.
    pub created_by: UserId,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last modification time.
    pub updated_at: DateTime<Utc>,
    /// Optimistic concurrency version.
    #[serde(default)]
    pub version: i64,
}

crate::impl_audit_trail!(Invoice);

impl Invoice {
    /// Returns true if `request_id` is one of the bundled lines.
    #[must_use]
    pub fn contains(&self, request_id: &str) -> bool {
        self.request_ids.iter().any(|line| line.request_id == request_id)
    }
}

/// Input for recording a payment.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaymentInput {
    /// Per-trip amounts.
    #[serde(default)]
    pub request_ids: Vec<RequestLine>,
    /// Invoice being settled.
    #[serde(default)]
    pub invoice_id: Option<String>,
    /// Total, required when there are no lines.
    #[serde(default)]
    pub amount: Option<Decimal>,
    /// Defaults to now.
    #[serde(default)]
    pub payment_date: Option<DateTime<Utc>>,
    /// Payment method.
    #[serde(default)]
    pub method: Option<String>,
    /// External reference.
    #[serde(default)]
    pub reference: Option<String>,
}

/// Metadata edit of a payment. Financial fields are immutable.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePaymentInput {
    /// Payment method.
    #[serde(default)]
    pub method: Option<String>,
    /// External reference.
    #[serde(default)]
    pub reference: Option<String>,
    /// Received date.
    #[serde(default)]
    pub payment_date: Option<DateTime<Utc>>,
}

/// Input for creating an invoice.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateInvoiceInput {
    /// Request ids of the trips to bundle.
    pub request_ids: Vec<String>,
    /// Expected total; must equal the trips' combined amount due.
    pub amount: Decimal,
    /// Billed customer.
    #[serde(default)]
    pub customer_id: Option<CustomerId>,
    /// Payment due date.
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
}

/// Metadata edit of an invoice.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateInvoiceInput {
    /// Payment due date.
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
    /// Mark as sent (or unsent).
    #[serde(default)]
    pub sent_to_customer: Option<bool>,
}
