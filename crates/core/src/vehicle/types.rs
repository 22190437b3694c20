//! Vehicle domain types.

use std::fmt;

use chrono::{DateTime, Utc};
use haulage_shared::types::{OrganizationId, TripId, UserId, VehicleId};
use serde::{Deserialize, Serialize};

use crate::audit::{LogEntry, Remark};

/// Vehicle availability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VehicleStatus {
    /// Free to be assigned.
    Available,
    /// Held by a trip.
    #[serde(rename = "On Trip")]
    OnTrip,
    /// Taken out of service.
    Inactive,
    /// Soft-deleted.
    Deleted,
}

impl VehicleStatus {
    /// Returns the string representation of the status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Available => "Available",
            Self::OnTrip => "On Trip",
            Self::Inactive => "Inactive",
            Self::Deleted => "Deleted",
        }
    }
}

impl fmt::Display for VehicleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A truck in the fleet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vehicle {
    /// Document id.
    pub id: VehicleId,
    /// Owning organisation.
    pub organization_id: OrganizationId,
    /// Registration plate, unique per organisation.
    pub plate_number: String,
    /// Free-form description.
    #[serde(default)]
    pub description: Option<String>,
    /// Availability.
    pub status: VehicleStatus,
    /// In service.
    pub active: bool,
    /// Trip currently holding the vehicle.
    #[serde(default)]
    pub current_trip_id: Option<TripId>,
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

crate::impl_audit_trail!(Vehicle);

impl Vehicle {
    /// Returns true if `trip_id` currently holds this vehicle.
    #[must_use]
    pub fn is_held_by(&self, trip_id: TripId) -> bool {
        self.current_trip_id == Some(trip_id)
    }

    /// Marks the vehicle as held by `trip_id`.
    pub fn occupy(&mut self, trip_id: TripId, now: DateTime<Utc>) {
        self.status = VehicleStatus::OnTrip;
        self.current_trip_id = Some(trip_id);
        self.updated_at = now;
    }

    /// Frees the vehicle if `trip_id` is the trip holding it.
    ///
    /// Returns false and leaves the vehicle untouched otherwise, so a stale
    /// trip can never release a vehicle another trip has since taken.
    pub fn release(&mut self, trip_id: TripId, now: DateTime<Utc>) -> bool {
        if !self.is_held_by(trip_id) {
            return false;
        }
        self.status = if self.active {
            VehicleStatus::Available
        } else {
            VehicleStatus::Inactive
        };
        self.current_trip_id = None;
        self.updated_at = now;
        true
    }
}

/// Input for registering a vehicle.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateVehicleInput {
    /// Registration plate.
    pub plate_number: String,
    /// Free-form description.
    #[serde(default)]
    pub description: Option<String>,
}

/// Partial update of a vehicle.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateVehicleInput {
    /// New plate.
    #[serde(default)]
    pub plate_number: Option<String>,
    /// New description.
    #[serde(default)]
    pub description: Option<String>,
    /// Take in or out of service.
    #[serde(default)]
    pub active: Option<bool>,
    /// Direct status edit; only `Available` and `Inactive` are accepted.
    #[serde(default)]
    pub status: Option<VehicleStatus>,
}
