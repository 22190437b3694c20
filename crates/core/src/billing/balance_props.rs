//! Property-based tests for balance computation.

use chrono::Utc;
use haulage_shared::types::{OrganizationId, PaymentId, UserId, VendorId};
use proptest::prelude::*;
use rust_decimal::Decimal;

use crate::billing::balance::{BalanceCalculator, BalanceScope};
use crate::billing::types::{Payment, RequestLine};
use crate::trip::{CreateTripInput, Shortage, Trip, TripService};

const REQUEST_ID: &str = "246810";

/// Amounts from 0.01 to 100,000.00.
fn positive_amount() -> impl Strategy<Value = Decimal> {
    (1i64..10_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

fn trip(amount: Decimal, shortage: Option<Decimal>) -> Trip {
    let mut trip = TripService::create(
        OrganizationId::new(),
        REQUEST_ID.into(),
        CreateTripInput {
            vendor_id: Some(VendorId::new()),
            amount,
            pickup_location: "Lokoja".into(),
            delivery_location: "Abuja".into(),
            ..Default::default()
        },
        UserId::new(),
        Utc::now(),
    )
    .unwrap();
    trip.shortage = shortage.map(|shortage_amount| Shortage {
        shortage_amount,
        reason: None,
        recorded_at: Utc::now(),
    });
    trip
}

fn payment(lines: Vec<RequestLine>, disabled: bool, invoice_id: Option<String>) -> Payment {
    Payment {
        id: PaymentId::new(),
        organization_id: OrganizationId::new(),
        payment_id: "135790".into(),
        amount: lines.iter().map(|l| l.amount).sum(),
        request_ids: lines,
        invoice_id,
        is_trip: true,
        payment_date: Utc::now(),
        method: None,
        reference: None,
        disabled,
        logs: Vec::new(),
        remarks: Vec::new(),
        created_by: UserId::new(),
        created_at: Utc::now(),
        updated_at: Utc::now(),
        version: 0,
    }
}

/// A payment with one line for the trip and one for an unrelated trip.
fn arb_payment() -> impl Strategy<Value = Payment> {
    (
        positive_amount(),
        positive_amount(),
        any::<bool>(),
        prop::option::of(Just("808080".to_string())),
    )
        .prop_map(|(mine, other, disabled, invoice)| {
            payment(
                vec![
                    RequestLine::new(REQUEST_ID, mine),
                    RequestLine::new("999000", other),
                ],
                disabled,
                invoice,
            )
        })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// No payments: nothing paid, the whole billable amount due.
    #[test]
    fn prop_no_payments(amount in positive_amount(), shortage_pct in 0u32..100) {
        let shortage = amount * Decimal::from(shortage_pct) / Decimal::from(100);
        let t = trip(amount, Some(shortage));
        let balance = BalanceCalculator::for_trip(&t, &[], BalanceScope::All);
        prop_assert_eq!(balance.paid, Decimal::ZERO);
        prop_assert_eq!(balance.amount_due, amount - shortage);
    }

    /// `paid + amountDue` always equals the billable amount, in every scope.
    #[test]
    fn prop_split_is_exact(
        amount in positive_amount(),
        payments in prop::collection::vec(arb_payment(), 0..8),
    ) {
        let t = trip(amount, None);
        for scope in [BalanceScope::All, BalanceScope::ExcludeInvoices, BalanceScope::Invoice("808080")] {
            let balance = BalanceCalculator::for_trip(&t, &payments, scope);
            prop_assert_eq!(balance.paid + balance.amount_due, t.billable());
        }
    }

    /// Disabled payments never count.
    #[test]
    fn prop_disabled_ignored(payments in prop::collection::vec(arb_payment(), 0..8)) {
        let t = trip(Decimal::from(1_000_000), None);
        let live: Vec<Payment> = payments.iter().filter(|p| !p.disabled).cloned().collect();
        prop_assert_eq!(
            BalanceCalculator::for_trip(&t, &payments, BalanceScope::All),
            BalanceCalculator::for_trip(&t, &live, BalanceScope::All)
        );
    }

    /// Direct and invoice-settled payments partition the total.
    #[test]
    fn prop_scopes_partition(payments in prop::collection::vec(arb_payment(), 0..8)) {
        let t = trip(Decimal::from(1_000_000), None);
        let all = BalanceCalculator::paid(REQUEST_ID, &payments, BalanceScope::All);
        let direct = BalanceCalculator::paid(REQUEST_ID, &payments, BalanceScope::ExcludeInvoices);
        let invoiced = BalanceCalculator::paid(REQUEST_ID, &payments, BalanceScope::Invoice("808080"));
        prop_assert_eq!(all, direct + invoiced);
        prop_assert!(BalanceCalculator::for_trip(&t, &payments, BalanceScope::All).paid == all);
    }
}
