//! Property-based tests for the trip state machine.

use chrono::Utc;
use haulage_shared::types::{OrganizationId, UserId, VendorId};
use proptest::prelude::*;
use rust_decimal_macros::dec;

use crate::trip::error::TripError;
use crate::trip::service::TripService;
use crate::trip::types::{CreateTripInput, FuelReading, Trip, TripAction, TripStatus};

fn arb_status() -> impl Strategy<Value = TripStatus> {
    prop_oneof![
        Just(TripStatus::Pending),
        Just(TripStatus::VehicleAssigned),
        Just(TripStatus::Loaded),
        Just(TripStatus::EnRoute),
        Just(TripStatus::AtDestination),
        Just(TripStatus::Delivered),
        Just(TripStatus::Cancelled),
    ]
}

/// Actions that need no vehicle document.
fn arb_action() -> impl Strategy<Value = TripAction> {
    prop_oneof![
        Just(TripAction::MarkLoaded),
        Just(TripAction::MarkEnRoute),
        Just(TripAction::MarkAtDestination),
        Just(TripAction::MarkDelivered(FuelReading::default())),
        "[a-z ]{0,12}".prop_map(TripAction::Cancel),
        "[a-z ]{0,12}".prop_map(TripAction::Resume),
    ]
}

/// Actions that need no vehicle document, with usable reasons.
fn arb_ready_action() -> impl Strategy<Value = TripAction> {
    prop_oneof![
        Just(TripAction::MarkLoaded),
        Just(TripAction::MarkEnRoute),
        Just(TripAction::MarkAtDestination),
        Just(TripAction::MarkDelivered(FuelReading::default())),
        "[a-z]{1,12}".prop_map(TripAction::Cancel),
        "[a-z]{1,12}".prop_map(TripAction::Resume),
    ]
}

fn trip_in(status: TripStatus) -> Trip {
    let mut trip = TripService::create(
        OrganizationId::new(),
        "100200".into(),
        CreateTripInput {
            vendor_id: Some(VendorId::new()),
            amount: dec!(1000),
            pickup_location: "Onne".into(),
            delivery_location: "Aba".into(),
            ..Default::default()
        },
        UserId::new(),
        Utc::now(),
    )
    .unwrap();
    trip.status = status;
    trip.requested_waybill_image_url = Some("https://files.example/r.jpg".into());
    trip.delivered_waybill_image_url = Some("https://files.example/d.jpg".into());
    trip
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// A planned move always agrees with the transition table.
    #[test]
    fn prop_planned_moves_are_valid(status in arb_status(), action in arb_action()) {
        let trip = trip_in(status);
        if let Ok(transition) = TripService::plan(&trip, action, None, UserId::new(), Utc::now()) {
            prop_assert!(TripService::is_valid_transition(transition.from, transition.to));
        }
    }

    /// With preconditions met, a move is planned exactly when the table allows it.
    #[test]
    fn prop_plan_follows_transition_table(status in arb_status(), action in arb_ready_action()) {
        let trip = trip_in(status);
        let target = action.target();
        let result = TripService::plan(&trip, action, None, UserId::new(), Utc::now());

        if TripService::is_valid_transition(status, target) {
            prop_assert!(result.is_ok());
        } else {
            let refused = matches!(result, Err(TripError::InvalidTransition { .. }));
            prop_assert!(refused);
        }
    }

    /// Operational moves never go backwards or repeat.
    #[test]
    fn prop_no_backward_moves(status in arb_status(), action in arb_action()) {
        let trip = trip_in(status);
        let target = action.target();
        let result = TripService::plan(&trip, action, None, UserId::new(), Utc::now());

        if let (Some(from), Some(to)) = (status.stage(), target.stage()) {
            if to <= from && target != TripStatus::Pending {
                prop_assert!(result.is_err());
            }
        }
    }

    /// Applying a move appends exactly one log entry and ends in the target status.
    #[test]
    fn prop_apply_logs_once(status in arb_status(), action in arb_action()) {
        let mut trip = trip_in(status);
        let logs_before = trip.logs.len();

        if let Ok(transition) = TripService::plan(&trip, action, None, UserId::new(), Utc::now()) {
            transition.apply(&mut trip);
            prop_assert_eq!(trip.logs.len(), logs_before + 1);
            prop_assert_eq!(trip.status, transition.to);
            prop_assert_eq!(trip.timeline.last().map(|e| e.status), Some(transition.to));
        }
    }

    /// Blank reasons never cancel or resume.
    #[test]
    fn prop_blank_reason_rejected(status in arb_status(), spaces in " {0,6}") {
        let trip = trip_in(status);
        let cancel = TripService::plan(&trip, TripAction::Cancel(spaces.clone()), None, UserId::new(), Utc::now());
        prop_assert!(matches!(cancel, Err(TripError::CancelReasonRequired)));

        let resume = TripService::plan(&trip, TripAction::Resume(spaces), None, UserId::new(), Utc::now());
        prop_assert!(matches!(resume, Err(TripError::ResumeReasonRequired)));
    }
}
