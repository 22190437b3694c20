//! Billing error types.

use haulage_shared::AppError;
use rust_decimal::Decimal;
use thiserror::Error;

use crate::billing::validation::LineRejection;

/// Errors raised by payment and invoice operations.
#[derive(Debug, Error)]
pub enum BillingError {
    /// One or more payment lines were refused.
    #[error("Payment rejected: {}", join(.0))]
    PaymentRejected(Vec<LineRejection>),

    /// The same trip appears twice in one request.
    #[error("Trip {0} is listed more than once")]
    DuplicateRequestLine(String),

    /// A required field was blank.
    #[error("{0} is required")]
    MissingField(&'static str),

    /// Invoice payment that names none of the invoiced trips.
    #[error("A payment against invoice {0} must list the trips it pays")]
    InvoiceLinesRequired(String),

    /// Free-standing payment without a positive amount.
    #[error("Payment amount must be greater than zero")]
    InvalidAmount,

    /// Stated total disagrees with the lines.
    #[error("Payment amount {stated} does not match the lines total {lines_total}")]
    AmountMismatch {
        /// Amount supplied by the caller.
        stated: Decimal,
        /// Sum of the lines.
        lines_total: Decimal,
    },

    /// No such trip.
    #[error("Trip {0} not found")]
    TripNotFound(String),

    /// No such payment.
    #[error("Payment {0} not found")]
    PaymentNotFound(String),

    /// Payment is soft-deleted.
    #[error("Payment {0} has been deleted")]
    PaymentDeleted(String),

    /// No such invoice.
    #[error("Invoice {0} not found")]
    InvoiceNotFound(String),

    /// Invoice is soft-deleted.
    #[error("Invoice {0} has been deleted")]
    InvoiceDeleted(String),

    /// Invoice payment names a trip the invoice does not bundle.
    #[error("Trip {request_id} is not on invoice {invoice_id}")]
    NotOnInvoice {
        /// The invoice code.
        invoice_id: String,
        /// The stray trip.
        request_id: String,
    },

    /// Invoice without trips.
    #[error("An invoice needs at least one trip")]
    EmptyInvoice,

    /// Trips billed to different vendors.
    #[error("All trips on an invoice must belong to the same vendor")]
    VendorMismatch,

    /// Invoice customer disagrees with the customer its trips are billed to.
    #[error("The invoice customer must be the customer its trips are billed to")]
    CustomerMismatch,

    /// Supplied total disagrees with the trips' combined amount due.
    #[error("Invoice amount {expected} does not match the amount due {computed}")]
    InvoiceTotalMismatch {
        /// Amount supplied by the caller.
        expected: Decimal,
        /// Sum of the trips' amount due.
        computed: Decimal,
    },

    /// Trips already bundled on an active invoice.
    #[error("Trips already invoiced: {}", .0.join(", "))]
    AlreadyInvoiced(Vec<String>),

    /// Trip has nothing left to bill.
    #[error("Trip {0} has nothing left to invoice")]
    TripSettled(String),

    /// Share code lifetime must be positive and end at a representable time.
    #[error("Share code lifetime must be positive and within range")]
    InvalidShareTtl,
}

fn join(rejections: &[LineRejection]) -> String {
    rejections
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl BillingError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::DuplicateRequestLine(_)
            | Self::MissingField(_)
            | Self::InvoiceLinesRequired(_)
            | Self::InvalidAmount
            | Self::AmountMismatch { .. }
            | Self::EmptyInvoice => 400,

            Self::TripNotFound(_) | Self::PaymentNotFound(_) | Self::InvoiceNotFound(_) => 404,

            Self::PaymentRejected(_)
            | Self::PaymentDeleted(_)
            | Self::InvoiceDeleted(_)
            | Self::NotOnInvoice { .. }
            | Self::VendorMismatch
            | Self::CustomerMismatch
            | Self::InvoiceTotalMismatch { .. }
            | Self::AlreadyInvoiced(_)
            | Self::TripSettled(_)
            | Self::InvalidShareTtl => 422,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::PaymentRejected(_) => "PAYMENT_REJECTED",
            Self::DuplicateRequestLine(_) => "DUPLICATE_REQUEST_LINE",
            Self::MissingField(_) => "MISSING_FIELD",
            Self::InvoiceLinesRequired(_) => "INVOICE_LINES_REQUIRED",
            Self::InvalidAmount => "INVALID_AMOUNT",
            Self::AmountMismatch { .. } => "AMOUNT_MISMATCH",
            Self::TripNotFound(_) => "TRIP_NOT_FOUND",
            Self::PaymentNotFound(_) => "PAYMENT_NOT_FOUND",
            Self::PaymentDeleted(_) => "PAYMENT_DELETED",
            Self::InvoiceNotFound(_) => "INVOICE_NOT_FOUND",
            Self::InvoiceDeleted(_) => "INVOICE_DELETED",
            Self::NotOnInvoice { .. } => "NOT_ON_INVOICE",
            Self::EmptyInvoice => "EMPTY_INVOICE",
            Self::VendorMismatch => "VENDOR_MISMATCH",
            Self::CustomerMismatch => "CUSTOMER_MISMATCH",
            Self::InvoiceTotalMismatch { .. } => "INVOICE_TOTAL_MISMATCH",
            Self::AlreadyInvoiced(_) => "ALREADY_INVOICED",
            Self::TripSettled(_) => "TRIP_SETTLED",
            Self::InvalidShareTtl => "INVALID_SHARE_TTL",
        }
    }
}

impl From<BillingError> for AppError {
    fn from(err: BillingError) -> Self {
        let message = err.to_string();
        match err.status_code() {
            400 => Self::Validation(message),
            404 => Self::NotFound(message),
            _ => Self::BusinessRule(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::billing::validation::RejectionReason;
    use rust_decimal_macros::dec;

    #[test]
    fn test_payment_rejected_lists_every_line() {
        let err = BillingError::PaymentRejected(vec![
            LineRejection {
                request_id: "111111".into(),
                amount: dec!(5),
                reason: RejectionReason::TripNotFound,
            },
            LineRejection {
                request_id: "222222".into(),
                amount: dec!(5),
                reason: RejectionReason::NothingDue,
            },
        ]);
        let message = err.to_string();
        assert!(message.contains("111111"));
        assert!(message.contains("222222"));
        assert_eq!(err.status_code(), 422);
    }

    #[test]
    fn test_already_invoiced_message() {
        let err = BillingError::AlreadyInvoiced(vec!["1".into(), "2".into()]);
        assert_eq!(err.to_string(), "Trips already invoiced: 1, 2");
        let app: AppError = err.into();
        assert!(matches!(app, AppError::BusinessRule(_)));
    }

    #[test]
    fn test_duplicate_line_is_validation() {
        let app: AppError = BillingError::DuplicateRequestLine("1".into()).into();
        assert_eq!(app.status_code(), 400);
    }
}
