//! Payment admissibility checks.

use std::collections::HashSet;
use std::fmt;

use rust_decimal::Decimal;
use serde::Serialize;

use crate::billing::balance::{BalanceCalculator, BalanceScope};
use crate::billing::error::BillingError;
use crate::billing::types::{Balance, CreatePaymentInput, Payment, RequestLine};
use crate::trip::Trip;

/// Why a payment line was refused.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "camelCase")]
pub enum RejectionReason {
    /// No trip with this request id.
    TripNotFound,
    /// The trip is soft-deleted.
    TripDeleted,
    /// Line amount is zero or negative.
    NonPositiveAmount,
    /// Nothing left owed on the trip.
    NothingDue,
    /// Line exceeds the remaining balance.
    #[serde(rename_all = "camelCase")]
    ExceedsAmountDue {
        /// Remaining balance.
        amount_due: Decimal,
    },
    /// Line would push the paid total past the billable amount.
    #[serde(rename_all = "camelCase")]
    ExceedsBillable {
        /// Already paid.
        paid: Decimal,
        /// Billable amount after shortage.
        billable: Decimal,
    },
}

/// A refused payment line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LineRejection {
    /// The trip's request id.
    pub request_id: String,
    /// The amount offered.
    pub amount: Decimal,
    /// Why it was refused.
    #[serde(flatten)]
    pub reason: RejectionReason,
}

impl fmt::Display for LineRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let id = &self.request_id;
        match &self.reason {
            RejectionReason::TripNotFound => write!(f, "trip {id} not found"),
            RejectionReason::TripDeleted => write!(f, "trip {id} has been deleted"),
            RejectionReason::NonPositiveAmount => {
                write!(f, "amount for trip {id} must be greater than zero")
            }
            RejectionReason::NothingDue => write!(f, "trip {id} has nothing left to pay"),
            RejectionReason::ExceedsAmountDue { amount_due } => write!(
                f,
                "{} exceeds the {amount_due} due on trip {id}",
                self.amount
            ),
            RejectionReason::ExceedsBillable { paid, billable } => write!(
                f,
                "{} on top of {paid} paid exceeds the {billable} billable on trip {id}",
                self.amount
            ),
        }
    }
}

/// Stateless payment validation.
pub struct PaymentValidator;

impl PaymentValidator {
    /// Checks the shape of a payment request before any trip is read.
    ///
    /// Rejects empty request ids, request ids repeated within the payment,
    /// an invoice payment without lines, a free-standing payment without a
    /// positive amount, and a stated total that disagrees with the lines.
    pub fn check_input(input: &CreatePaymentInput) -> Result<Decimal, BillingError> {
        let mut seen = HashSet::new();
        for line in &input.request_ids {
            if line.request_id.trim().is_empty() {
                return Err(BillingError::MissingField("requestId"));
            }
            if !seen.insert(line.request_id.as_str()) {
                return Err(BillingError::DuplicateRequestLine(line.request_id.clone()));
            }
        }

        if input.request_ids.is_empty() {
            if let Some(invoice_id) = &input.invoice_id {
                return Err(BillingError::InvoiceLinesRequired(invoice_id.clone()));
            }
            return match input.amount {
                Some(amount) if amount > Decimal::ZERO => Ok(amount),
                _ => Err(BillingError::InvalidAmount),
            };
        }

        let lines_total: Decimal = input.request_ids.iter().map(|l| l.amount).sum();
        if let Some(amount) = input.amount {
            if amount != lines_total {
                return Err(BillingError::AmountMismatch {
                    stated: amount,
                    lines_total,
                });
            }
        }
        Ok(lines_total)
    }

    /// Checks one line against the trip's current balance.
    ///
    /// Accepted iff `0 < amount <= amountDue` and `paid + amount <= billable`.
    /// Returns the balance the decision was made against.
    pub fn check_line(
        line: &RequestLine,
        trip: Option<&Trip>,
        payments: &[Payment],
    ) -> Result<Balance, LineRejection> {
        let reject = |reason| LineRejection {
            request_id: line.request_id.clone(),
            amount: line.amount,
            reason,
        };

        let trip = trip.ok_or_else(|| reject(RejectionReason::TripNotFound))?;
        if trip.ensure_live().is_err() {
            return Err(reject(RejectionReason::TripDeleted));
        }

        if line.amount <= Decimal::ZERO {
            return Err(reject(RejectionReason::NonPositiveAmount));
        }

        let balance = BalanceCalculator::for_trip(trip, payments, BalanceScope::All);

        if balance.amount_due <= Decimal::ZERO {
            return Err(reject(RejectionReason::NothingDue));
        }
        if balance.amount_due < line.amount {
            return Err(reject(RejectionReason::ExceedsAmountDue {
                amount_due: balance.amount_due,
            }));
        }
        let billable = trip.billable();
        if balance.paid + line.amount > billable {
            return Err(reject(RejectionReason::ExceedsBillable {
                paid: balance.paid,
                billable,
            }));
        }

        Ok(balance)
    }

    /// Folds per-line results; every rejected line is reported.
    pub fn collect<I>(results: I) -> Result<Vec<Balance>, BillingError>
    where
        I: IntoIterator<Item = Result<Balance, LineRejection>>,
    {
        let mut accepted = Vec::new();
        let mut rejected = Vec::new();
        for result in results {
            match result {
                Ok(balance) => accepted.push(balance),
                Err(rejection) => rejected.push(rejection),
            }
        }

        if rejected.is_empty() {
            Ok(accepted)
        } else {
            Err(BillingError::PaymentRejected(rejected))
        }
    }
}
