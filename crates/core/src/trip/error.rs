//! Trip error types.

use haulage_shared::AppError;
use haulage_shared::types::VehicleId;
use rust_decimal::Decimal;
use thiserror::Error;

use crate::trip::types::TripStatus;
use crate::vehicle::VehicleStatus;

/// Errors raised by trip creation, editing and the status state machine.
#[derive(Debug, Error)]
pub enum TripError {
    /// Attempted a status move the state machine does not allow.
    #[error("Cannot move trip from {from} to {to}")]
    InvalidTransition {
        /// The current status.
        from: TripStatus,
        /// The attempted target status.
        to: TripStatus,
    },

    /// Action name not recognised.
    #[error("Unknown trip action '{0}'")]
    UnknownAction(String),

    /// `assignVehicle` without a vehicle id.
    #[error("vehicleId is required to assign a vehicle")]
    VehicleRequired,

    /// Vehicle is not available for this trip.
    #[error("Vehicle {vehicle_id} is not available (status: {status})")]
    VehicleUnavailable {
        /// The requested vehicle.
        vehicle_id: VehicleId,
        /// Its current status.
        status: VehicleStatus,
    },

    /// Vehicle is marked inactive.
    #[error("Vehicle {0} is inactive")]
    VehicleInactive(VehicleId),

    /// Vehicle does not exist in the organisation.
    #[error("Vehicle {0} not found")]
    VehicleNotFound(VehicleId),

    /// Vehicles only change through `assignVehicle`.
    #[error("Vehicle cannot be changed through an update, use assignVehicle")]
    VehicleChangeNotAllowed,

    /// En Route needs the requested waybill.
    #[error("Upload the requested waybill before marking the trip en route")]
    RequestedWaybillRequired,

    /// Delivered needs the signed waybill.
    #[error("Upload the delivered waybill before marking the trip delivered")]
    DeliveredWaybillRequired,

    /// Cancel needs a reason.
    #[error("Cancel reason is required")]
    CancelReasonRequired,

    /// Resume needs a reason.
    #[error("Resume reason is required")]
    ResumeReasonRequired,

    /// Trip is soft-deleted.
    #[error("Trip {0} has been deleted")]
    TripDeleted(String),

    /// No trip with this request id or document id.
    #[error("Trip {0} not found")]
    TripNotFound(String),

    /// Amount must be positive.
    #[error("Trip amount must be greater than zero")]
    InvalidAmount,

    /// A required text field was blank.
    #[error("{0} is required")]
    MissingField(&'static str),

    /// Exactly one of vendor or customer must be set.
    #[error("A trip must be billed to either a vendor or a customer, not both")]
    PartyRequired,

    /// Shortage outside `0..=amount`.
    #[error("Shortage must be between zero and the trip amount")]
    InvalidShortage,

    /// Edit would drop the billable amount below what is already paid.
    #[error("Billable amount {billable} is below the {paid} already paid")]
    AmountBelowPaid {
        /// Billable amount after the edit.
        billable: Decimal,
        /// Sum of recorded payments.
        paid: Decimal,
    },

    /// Vendor or customer edit on a trip an open invoice still bills.
    #[error("Trip {request_id} is on invoice {invoice_id}; disable the invoice before changing the vendor or customer")]
    PartyLockedByInvoice {
        /// The trip's request id.
        request_id: String,
        /// Short code of the invoice holding it.
        invoice_id: String,
    },
}

impl TripError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::UnknownAction(_)
            | Self::VehicleRequired
            | Self::VehicleChangeNotAllowed
            | Self::RequestedWaybillRequired
            | Self::DeliveredWaybillRequired
            | Self::CancelReasonRequired
            | Self::ResumeReasonRequired
            | Self::InvalidAmount
            | Self::MissingField(_)
            | Self::PartyRequired
            | Self::InvalidShortage => 400,

            Self::VehicleNotFound(_) | Self::TripNotFound(_) => 404,

            Self::InvalidTransition { .. }
            | Self::VehicleUnavailable { .. }
            | Self::VehicleInactive(_)
            | Self::TripDeleted(_)
            | Self::AmountBelowPaid { .. } => 422,

            Self::PartyLockedByInvoice { .. } => 409,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidTransition { .. } => "INVALID_TRANSITION",
            Self::UnknownAction(_) => "UNKNOWN_ACTION",
            Self::VehicleRequired => "VEHICLE_REQUIRED",
            Self::VehicleUnavailable { .. } => "VEHICLE_UNAVAILABLE",
            Self::VehicleInactive(_) => "VEHICLE_INACTIVE",
            Self::VehicleNotFound(_) => "VEHICLE_NOT_FOUND",
            Self::VehicleChangeNotAllowed => "VEHICLE_CHANGE_NOT_ALLOWED",
            Self::RequestedWaybillRequired => "REQUESTED_WAYBILL_REQUIRED",
            Self::DeliveredWaybillRequired => "DELIVERED_WAYBILL_REQUIRED",
            Self::CancelReasonRequired => "CANCEL_REASON_REQUIRED",
            Self::ResumeReasonRequired => "RESUME_REASON_REQUIRED",
            Self::TripDeleted(_) => "TRIP_DELETED",
            Self::TripNotFound(_) => "TRIP_NOT_FOUND",
            Self::InvalidAmount => "INVALID_AMOUNT",
            Self::MissingField(_) => "MISSING_FIELD",
            Self::PartyRequired => "PARTY_REQUIRED",
            Self::InvalidShortage => "INVALID_SHORTAGE",
            Self::AmountBelowPaid { .. } => "AMOUNT_BELOW_PAID",
            Self::PartyLockedByInvoice { .. } => "PARTY_LOCKED_BY_INVOICE",
        }
    }
}

impl From<TripError> for AppError {
    fn from(err: TripError) -> Self {
        let message = err.to_string();
        match err.status_code() {
            400 => Self::Validation(message),
            404 => Self::NotFound(message),
            409 => Self::Conflict(message),
            _ => Self::BusinessRule(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_transition_error() {
        let err = TripError::InvalidTransition {
            from: TripStatus::EnRoute,
            to: TripStatus::Loaded,
        };
        assert_eq!(err.status_code(), 422);
        assert_eq!(err.error_code(), "INVALID_TRANSITION");
        assert!(err.to_string().contains("En Route"));
        assert!(err.to_string().contains("Loaded"));
    }

    #[test]
    fn test_reason_required_is_validation() {
        let app: AppError = TripError::CancelReasonRequired.into();
        assert!(matches!(app, AppError::Validation(_)));
        assert_eq!(app.status_code(), 400);
    }

    #[test]
    fn test_unavailable_vehicle_is_business_rule() {
        let err = TripError::VehicleUnavailable {
            vehicle_id: VehicleId::new(),
            status: VehicleStatus::OnTrip,
        };
        assert!(err.to_string().contains("On Trip"));
        let app: AppError = err.into();
        assert!(matches!(app, AppError::BusinessRule(_)));
    }

    #[test]
    fn test_party_locked_is_conflict() {
        let err = TripError::PartyLockedByInvoice {
            request_id: "482913".into(),
            invoice_id: "INV1234".into(),
        };
        assert_eq!(err.error_code(), "PARTY_LOCKED_BY_INVOICE");
        let app: AppError = err.into();
        assert!(matches!(app, AppError::Conflict(_)));
        assert_eq!(app.status_code(), 409);
    }

    #[test]
    fn test_not_found_maps_to_404() {
        let app: AppError = TripError::TripNotFound("123456".into()).into();
        assert_eq!(app.status_code(), 404);
    }
}
