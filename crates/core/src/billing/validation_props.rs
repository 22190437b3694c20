//! Property-based tests for payment line validation.

use chrono::Utc;
use haulage_shared::types::{OrganizationId, PaymentId, UserId, VendorId};
use proptest::prelude::*;
use rust_decimal::Decimal;

use crate::billing::balance::{BalanceCalculator, BalanceScope};
use crate::billing::types::{Payment, RequestLine};
use crate::billing::validation::PaymentValidator;
use crate::trip::{CreateTripInput, Trip, TripService};

const REQUEST_ID: &str = "975310";

/// Whole amounts from 1 to 10,000.
fn amount() -> impl Strategy<Value = Decimal> {
    (1i64..=10_000i64).prop_map(Decimal::from)
}

fn trip(amount: Decimal) -> Trip {
    TripService::create(
        OrganizationId::new(),
        REQUEST_ID.into(),
        CreateTripInput {
            vendor_id: Some(VendorId::new()),
            amount,
            pickup_location: "Kaduna".into(),
            delivery_location: "Zaria".into(),
            ..Default::default()
        },
        UserId::new(),
        Utc::now(),
    )
    .unwrap()
}

fn paid(amount: Decimal) -> Payment {
    Payment {
        id: PaymentId::new(),
        organization_id: OrganizationId::new(),
        payment_id: "864200".into(),
        request_ids: vec![RequestLine::new(REQUEST_ID, amount)],
        invoice_id: None,
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

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// A line of `A` against due `D` is accepted iff `0 < A <= D` and
    /// `paid + A <= billable`.
    #[test]
    fn prop_acceptance_rule(
        contract in amount(),
        already in 0i64..=10_000i64,
        offered in -100i64..=10_100i64,
    ) {
        let already = Decimal::from(already).min(contract);
        let t = trip(contract);
        let ledger = if already > Decimal::ZERO { vec![paid(already)] } else { vec![] };
        let offered = Decimal::from(offered);

        let balance = BalanceCalculator::for_trip(&t, &ledger, BalanceScope::All);
        let expected = offered > Decimal::ZERO
            && offered <= balance.amount_due
            && balance.paid + offered <= t.billable();

        let line = RequestLine::new(REQUEST_ID, offered);
        let result = PaymentValidator::check_line(&line, Some(&t), &ledger);
        prop_assert_eq!(result.is_ok(), expected);
    }

    /// Accepting lines one after another never overpays the trip.
    #[test]
    fn prop_sequential_payments_never_overpay(
        contract in amount(),
        offers in prop::collection::vec(amount(), 1..12),
    ) {
        let t = trip(contract);
        let mut ledger = Vec::new();

        for offer in offers {
            let line = RequestLine::new(REQUEST_ID, offer);
            if PaymentValidator::check_line(&line, Some(&t), &ledger).is_ok() {
                ledger.push(paid(offer));
            }
            let balance = BalanceCalculator::for_trip(&t, &ledger, BalanceScope::All);
            prop_assert!(balance.paid <= t.billable());
            prop_assert!(balance.amount_due >= Decimal::ZERO);
        }
    }
}
