//! Trip and invoice-line balances.
//!
//! Balances are never stored. They are recomputed from the payment set on
//! every read, so a disabled payment drops out of every balance at once.

use rust_decimal::Decimal;

use crate::billing::types::{Balance, Payment, RequestLine};
use crate::trip::Trip;

/// Which payments count towards a trip's balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BalanceScope<'a> {
    /// Every live payment referencing the trip.
    #[default]
    All,
    /// Only payments not settling an invoice.
    ExcludeInvoices,
    /// Only payments settling this invoice code.
    Invoice(&'a str),
}

impl BalanceScope<'_> {
    fn admits(&self, payment: &Payment) -> bool {
        match self {
            Self::All => true,
            Self::ExcludeInvoices => payment.invoice_id.is_none(),
            Self::Invoice(code) => payment.invoice_id.as_deref() == Some(*code),
        }
    }
}

/// Stateless balance calculations.
pub struct BalanceCalculator;

impl BalanceCalculator {
    /// Sum of live payment lines for `request_id` within `scope`.
    ///
    /// `payments` may contain unrelated or disabled payments; they are
    /// skipped.
    #[must_use]
    pub fn paid(request_id: &str, payments: &[Payment], scope: BalanceScope<'_>) -> Decimal {
        payments
            .iter()
            .filter(|p| !p.disabled && scope.admits(p))
            .map(|p| p.paid_towards(request_id))
            .sum()
    }

    /// `{paid, amountDue}` for a trip.
    ///
    /// `amountDue = amount - shortage - paid` in every scope.
    #[must_use]
    pub fn for_trip(trip: &Trip, payments: &[Payment], scope: BalanceScope<'_>) -> Balance {
        let paid = Self::paid(&trip.request_id, payments, scope);
        Balance {
            paid,
            amount_due: trip.billable() - paid,
        }
    }

    /// `{paid, amountDue}` for one invoice line.
    ///
    /// Only payments settling `invoice_code` count, and the due amount is
    /// seeded from the amount snapshotted on the line.
    #[must_use]
    pub fn for_invoice_line(line: &RequestLine, invoice_code: &str, payments: &[Payment]) -> Balance {
        let paid = Self::paid(&line.request_id, payments, BalanceScope::Invoice(invoice_code));
        Balance {
            paid,
            amount_due: line.amount - paid,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trip::{CreateTripInput, Shortage, TripService};
    use chrono::Utc;
    use haulage_shared::types::{OrganizationId, PaymentId, UserId, VendorId};
    use rust_decimal_macros::dec;

    fn trip(amount: Decimal) -> Trip {
        TripService::create(
            OrganizationId::new(),
            "555001".into(),
            CreateTripInput {
                vendor_id: Some(VendorId::new()),
                amount,
                pickup_location: "Ikeja".into(),
                delivery_location: "Ibadan".into(),
                ..Default::default()
            },
            UserId::new(),
            Utc::now(),
        )
        .unwrap()
    }

    fn payment(lines: Vec<RequestLine>, invoice_id: Option<&str>) -> Payment {
        let amount = lines.iter().map(|l| l.amount).sum();
        Payment {
            id: PaymentId::new(),
            organization_id: OrganizationId::new(),
            payment_id: "900001".into(),
            request_ids: lines,
            invoice_id: invoice_id.map(str::to_string),
            is_trip: true,
            amount,
            payment_date: Utc::now(),
            method: None,
            reference: None,
            disabled: false,
            logs: Vec::new(),
            remarks: Vec::new(),
            created_by: UserId::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
            version: 0,
        }
    }

    #[test]
    fn test_no_payments() {
        let t = trip(dec!(1000));
        let balance = BalanceCalculator::for_trip(&t, &[], BalanceScope::All);
        assert_eq!(balance.paid, dec!(0));
        assert_eq!(balance.amount_due, dec!(1000));
    }

    #[test]
    fn test_sums_only_matching_lines() {
        let t = trip(dec!(1000));
        let payments = vec![
            payment(
                vec![
                    RequestLine::new("555001", dec!(250)),
                    RequestLine::new("777777", dec!(900)),
                ],
                None,
            ),
            payment(vec![RequestLine::new("555001", dec!(100))], None),
        ];

        let balance = BalanceCalculator::for_trip(&t, &payments, BalanceScope::All);
        assert_eq!(balance.paid, dec!(350));
        assert_eq!(balance.amount_due, dec!(650));
    }

    #[test]
    fn test_disabled_payments_ignored() {
        let t = trip(dec!(1000));
        let mut p = payment(vec![RequestLine::new("555001", dec!(400))], None);
        p.disabled = true;

        let balance = BalanceCalculator::for_trip(&t, &[p], BalanceScope::All);
        assert_eq!(balance.paid, dec!(0));
    }

    #[test]
    fn test_shortage_reduces_due_in_every_scope() {
        let mut t = trip(dec!(1000));
        t.shortage = Some(Shortage {
            shortage_amount: dec!(150),
            reason: Some("two bags torn".into()),
            recorded_at: Utc::now(),
        });
        let payments = vec![
            payment(vec![RequestLine::new("555001", dec!(200))], None),
            payment(vec![RequestLine::new("555001", dec!(300))], Some("310310")),
        ];

        let all = BalanceCalculator::for_trip(&t, &payments, BalanceScope::All);
        assert_eq!(all, Balance { paid: dec!(500), amount_due: dec!(350) });

        let direct = BalanceCalculator::for_trip(&t, &payments, BalanceScope::ExcludeInvoices);
        assert_eq!(direct, Balance { paid: dec!(200), amount_due: dec!(650) });

        let invoiced = BalanceCalculator::for_trip(&t, &payments, BalanceScope::Invoice("310310"));
        assert_eq!(invoiced, Balance { paid: dec!(300), amount_due: dec!(550) });
    }

    #[test]
    fn test_invoice_line_seeded_from_snapshot() {
        let line = RequestLine::new("555001", dec!(800));
        let payments = vec![
            payment(vec![RequestLine::new("555001", dec!(300))], Some("310310")),
            payment(vec![RequestLine::new("555001", dec!(100))], Some("999999")),
            payment(vec![RequestLine::new("555001", dec!(50))], None),
        ];

        let balance = BalanceCalculator::for_invoice_line(&line, "310310", &payments);
        assert_eq!(balance.paid, dec!(300));
        assert_eq!(balance.amount_due, dec!(500));
    }
}
