//! Vehicle error types.

use haulage_shared::AppError;
use haulage_shared::types::VehicleId;
use thiserror::Error;

use crate::vehicle::types::VehicleStatus;

/// Errors raised by direct vehicle operations.
#[derive(Debug, Error)]
pub enum VehicleError {
    /// Plate number was blank.
    #[error("plateNumber is required")]
    PlateNumberRequired,

    /// Another vehicle in the organisation has this plate.
    #[error("A vehicle with plate {0} already exists")]
    DuplicatePlate(String),

    /// No such vehicle.
    #[error("Vehicle {0} not found")]
    VehicleNotFound(VehicleId),

    /// Vehicle is soft-deleted.
    #[error("Vehicle {0} has been deleted")]
    VehicleDeleted(VehicleId),

    /// The edit would pull the vehicle off its current trip.
    #[error("Vehicle {0} is on a trip")]
    VehicleOnTrip(VehicleId),

    /// Status can only be set directly to Available or Inactive.
    #[error("Vehicle status cannot be set to {0} directly")]
    StatusNotEditable(VehicleStatus),
}

impl VehicleError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::PlateNumberRequired | Self::StatusNotEditable(_) => 400,
            Self::VehicleNotFound(_) => 404,
            Self::DuplicatePlate(_) => 409,
            Self::VehicleDeleted(_) | Self::VehicleOnTrip(_) => 422,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::PlateNumberRequired => "PLATE_NUMBER_REQUIRED",
            Self::DuplicatePlate(_) => "DUPLICATE_PLATE",
            Self::VehicleNotFound(_) => "VEHICLE_NOT_FOUND",
            Self::VehicleDeleted(_) => "VEHICLE_DELETED",
            Self::VehicleOnTrip(_) => "VEHICLE_ON_TRIP",
            Self::StatusNotEditable(_) => "STATUS_NOT_EDITABLE",
        }
    }
}

impl From<VehicleError> for AppError {
    fn from(err: VehicleError) -> Self {
        let message = err.to_string();
        match err.status_code() {
            400 => Self::Validation(message),
            404 => Self::NotFound(message),
            409 => Self::Conflict(message),
            _ => Self::BusinessRule(message),
        }
    }
}
