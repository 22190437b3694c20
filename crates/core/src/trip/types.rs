//! Trip domain types.

use std::fmt;

use chrono::{DateTime, Utc};
use haulage_shared::types::{CustomerId, OrganizationId, TripId, UserId, VehicleId, VendorId};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

use crate::audit::{LogEntry, Remark};
use crate::trip::error::TripError;

/// Timeline action recorded when a trip is created.
pub const CREATED_ACTION: &str = "created";

/// Trip lifecycle status.
///
/// The operational order is:
/// Pending → Vehicle Assigned → Loaded → En Route → At Destination → Delivered
///
/// `Cancelled` is reachable from any live state before delivery, and
/// `Deleted` only through disabling the trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TripStatus {
    /// Created, no vehicle yet.
    Pending,
    /// A vehicle holds this trip.
    #[serde(rename = "Vehicle Assigned")]
    VehicleAssigned,
    /// Cargo loaded.
    Loaded,
    /// Travelling; requires the requested waybill.
    #[serde(rename = "En Route")]
    EnRoute,
    /// Arrived, not yet signed off.
    #[serde(rename = "At Destination")]
    AtDestination,
    /// Delivered; requires the delivered waybill. Terminal.
    Delivered,
    /// Cancelled with a reason. Can be resumed.
    Cancelled,
    /// Soft-deleted. Terminal.
    Deleted,
}

impl TripStatus {
    /// Returns the string representation of the status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::VehicleAssigned => "Vehicle Assigned",
            Self::Loaded => "Loaded",
            Self::EnRoute => "En Route",
            Self::AtDestination => "At Destination",
            Self::Delivered => "Delivered",
            Self::Cancelled => "Cancelled",
            Self::Deleted => "Deleted",
        }
    }

    /// Position in the operational order, `None` for Cancelled and Deleted.
    #[must_use]
    pub fn stage(&self) -> Option<u8> {
        match self {
            Self::Pending => Some(0),
            Self::VehicleAssigned => Some(1),
            Self::Loaded => Some(2),
            Self::EnRoute => Some(3),
            Self::AtDestination => Some(4),
            Self::Delivered => Some(5),
            Self::Cancelled | Self::Deleted => None,
        }
    }

    /// Returns true if `target` is strictly later in the operational order.
    #[must_use]
    pub fn precedes(&self, target: Self) -> bool {
        matches!((self.stage(), target.stage()), (Some(from), Some(to)) if to > from)
    }

    /// Returns true for states no action leaves. Cancelled is not one: it
    /// resumes to Pending.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Delivered | Self::Deleted)
    }
}

impl fmt::Display for TripStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One step in a trip's status history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineEntry {
    /// When the step happened.
    pub date: DateTime<Utc>,
    /// Who triggered it.
    pub user_id: UserId,
    /// Action name (`created`, `assignVehicle`, `cancel`, ...).
    pub action: String,
    /// Status after the step.
    pub status: TripStatus,
}

/// Amount lost in transit, deducted from what the trip can bill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Shortage {
    /// Deducted amount.
    pub shortage_amount: Decimal,
    /// Optional explanation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// When it was recorded.
    pub recorded_at: DateTime<Utc>,
}

/// A haulage job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trip {
    /// Document id.
    pub id: TripId,
    /// Owning organisation.
    pub organization_id: OrganizationId,
    /// Organisation-unique six digit code.
    pub request_id: String,
    /// Assigned vehicle.
    #[serde(default)]
    pub vehicle_id: Option<VehicleId>,
    /// Billed customer (exclusive with `vendor_id`).
    #[serde(default)]
    pub customer_id: Option<CustomerId>,
    /// Billed vendor (exclusive with `customer_id`).
    #[serde(default)]
    pub vendor_id: Option<VendorId>,
    /// Contracted amount.
    pub amount: Decimal,
    /// Current status.
    pub status: TripStatus,
    /// Status history.
    #[serde(default)]
    pub timeline: Vec<TimelineEntry>,
    /// Recorded shortage.
    #[serde(default)]
    pub shortage: Option<Shortage>,
    /// Waybill captured at loading, required before En Route.
    #[serde(default)]
    pub requested_waybill_image_url: Option<String>,
    /// Signed waybill, required before Delivered.
    #[serde(default)]
    pub delivered_waybill_image_url: Option<String>,
    /// Origin.
    pub pickup_location: String,
    /// Destination.
    pub delivery_location: String,
    /// What is carried.
    #[serde(default)]
    pub cargo_description: Option<String>,
    /// Planned departure.
    #[serde(default)]
    pub trip_date: Option<DateTime<Utc>>,
    /// Planned fuel.
    #[serde(default)]
    pub estimated_fuel_litres: Option<Decimal>,
    /// Fuel used, recorded on delivery.
    #[serde(default)]
    pub actual_fuel_litres: Option<Decimal>,
    /// Fuel cost, recorded on delivery.
    #[serde(default)]
    pub actual_fuel_cost: Option<Decimal>,
    /// Set on delivery.
    #[serde(default)]
    pub drop_off_date: Option<DateTime<Utc>>,
    /// Reason given for the last cancellation.
    #[serde(default)]
    pub cancel_reason: Option<String>,
    /// Reason given for the last resumption.
    #[serde(default)]
    pub resume_reason: Option<String>,
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

crate::impl_audit_trail!(Trip);

impl Trip {
    /// Amount the trip can bill after shortage.
    #[must_use]
    pub fn billable(&self) -> Decimal {
        self.amount - self.shortage_amount()
    }

    /// Recorded shortage, zero when none.
    #[must_use]
    pub fn shortage_amount(&self) -> Decimal {
        self.shortage
            .as_ref()
            .map_or(Decimal::ZERO, |s| s.shortage_amount)
    }

    /// Returns an error if the trip is soft-deleted.
    pub fn ensure_live(&self) -> Result<(), TripError> {
        if self.disabled || self.status == TripStatus::Deleted {
            return Err(TripError::TripDeleted(self.request_id.clone()));
        }
        Ok(())
    }
}

/// Input for creating a trip.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTripInput {
    /// Billed customer.
    #[serde(default)]
    pub customer_id: Option<CustomerId>,
    /// Billed vendor.
    #[serde(default)]
    pub vendor_id: Option<VendorId>,
    /// Contracted amount.
    pub amount: Decimal,
    /// Origin.
    pub pickup_location: String,
    /// Destination.
    pub delivery_location: String,
    /// What is carried.
    #[serde(default)]
    pub cargo_description: Option<String>,
    /// Planned departure.
    #[serde(default)]
    pub trip_date: Option<DateTime<Utc>>,
    /// Planned fuel.
    #[serde(default)]
    pub estimated_fuel_litres: Option<Decimal>,
}

/// Shortage as supplied by a caller.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShortageInput {
    /// Deducted amount.
    pub shortage_amount: Decimal,
    /// Optional explanation.
    #[serde(default)]
    pub reason: Option<String>,
}

/// Partial update of a trip.
///
/// Absent fields are left alone. `shortage` distinguishes absent (`None`)
/// from explicitly cleared (`Some(None)`).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTripInput {
    /// Switch billing to this customer.
    #[serde(default)]
    pub customer_id: Option<CustomerId>,
    /// Switch billing to this vendor.
    #[serde(default)]
    pub vendor_id: Option<VendorId>,
    /// New contracted amount.
    #[serde(default)]
    pub amount: Option<Decimal>,
    /// New origin.
    #[serde(default)]
    pub pickup_location: Option<String>,
    /// New destination.
    #[serde(default)]
    pub delivery_location: Option<String>,
    /// New cargo description.
    #[serde(default)]
    pub cargo_description: Option<String>,
    /// New planned departure.
    #[serde(default)]
    pub trip_date: Option<DateTime<Utc>>,
    /// New planned fuel.
    #[serde(default)]
    pub estimated_fuel_litres: Option<Decimal>,
    /// Set or clear the shortage.
    #[serde(default, deserialize_with = "deserialize_some")]
    pub shortage: Option<Option<ShortageInput>>,
    /// Uploaded waybill URL.
    #[serde(default)]
    pub requested_waybill_image_url: Option<String>,
    /// Uploaded signed waybill URL.
    #[serde(default)]
    pub delivered_waybill_image_url: Option<String>,
    /// Rejected when present; vehicles change through `assignVehicle`.
    #[serde(default)]
    pub vehicle_id: Option<VehicleId>,
}

/// Maps a present JSON value (including `null`) to `Some`.
fn deserialize_some<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    T::deserialize(deserializer).map(Some)
}

/// Raw `tripAction` request as received from a caller.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripActionRequest {
    /// Action name.
    pub action: String,
    /// Target vehicle for `assignVehicle`.
    #[serde(default)]
    pub vehicle_id: Option<VehicleId>,
    /// Required for `cancel`.
    #[serde(default)]
    pub cancel_reason: Option<String>,
    /// Required for `resume`.
    #[serde(default)]
    pub resume_reason: Option<String>,
    /// Recorded on `markDelivered`.
    #[serde(default)]
    pub actual_fuel_litres: Option<Decimal>,
    /// Recorded on `markDelivered`.
    #[serde(default)]
    pub actual_fuel_cost: Option<Decimal>,
}

/// Fuel figures recorded on delivery.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FuelReading {
    /// Litres used.
    pub litres: Option<Decimal>,
    /// Cost.
    pub cost: Option<Decimal>,
}

/// A parsed trip action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TripAction {
    /// Put a vehicle on the trip.
    AssignVehicle(VehicleId),
    /// Cargo loaded.
    MarkLoaded,
    /// Departed.
    MarkEnRoute,
    /// Arrived.
    MarkAtDestination,
    /// Signed off.
    MarkDelivered(FuelReading),
    /// Cancel with a reason.
    Cancel(String),
    /// Resume a cancelled trip with a reason.
    Resume(String),
}

impl TripAction {
    /// Wire name of the action.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::AssignVehicle(_) => "assignVehicle",
            Self::MarkLoaded => "markLoaded",
            Self::MarkEnRoute => "markEnRoute",
            Self::MarkAtDestination => "markAtDestination",
            Self::MarkDelivered(_) => "markDelivered",
            Self::Cancel(_) => "cancel",
            Self::Resume(_) => "resume",
        }
    }

    /// Status the action moves the trip to.
    #[must_use]
    pub fn target(&self) -> TripStatus {
        match self {
            Self::AssignVehicle(_) => TripStatus::VehicleAssigned,
            Self::MarkLoaded => TripStatus::Loaded,
            Self::MarkEnRoute => TripStatus::EnRoute,
            Self::MarkAtDestination => TripStatus::AtDestination,
            Self::MarkDelivered(_) => TripStatus::Delivered,
            Self::Cancel(_) => TripStatus::Cancelled,
            Self::Resume(_) => TripStatus::Pending,
        }
    }
}

impl TryFrom<TripActionRequest> for TripAction {
    type Error = TripError;

    fn try_from(request: TripActionRequest) -> Result<Self, Self::Error> {
        match request.action.as_str() {
            "assignVehicle" => request
                .vehicle_id
                .map(Self::AssignVehicle)
                .ok_or(TripError::VehicleRequired),
            "markLoaded" => Ok(Self::MarkLoaded),
            "markEnRoute" => Ok(Self::MarkEnRoute),
            "markAtDestination" => Ok(Self::MarkAtDestination),
            "markDelivered" => Ok(Self::MarkDelivered(FuelReading {
                litres: request.actual_fuel_litres,
                cost: request.actual_fuel_cost,
            })),
            "cancel" => Ok(Self::Cancel(request.cancel_reason.unwrap_or_default())),
            "resume" => Ok(Self::Resume(request.resume_reason.unwrap_or_default())),
            _ => Err(TripError::UnknownAction(request.action)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    #[test]
    fn test_status_wire_names() {
        assert_eq!(
            serde_json::to_value(TripStatus::VehicleAssigned).unwrap(),
            json!("Vehicle Assigned")
        );
        assert_eq!(
            serde_json::from_value::<TripStatus>(json!("At Destination")).unwrap(),
            TripStatus::AtDestination
        );
        assert_eq!(TripStatus::EnRoute.to_string(), "En Route");
    }

    #[test]
    fn test_precedes_is_strict_and_forward() {
        assert!(TripStatus::Pending.precedes(TripStatus::Loaded));
        assert!(TripStatus::Loaded.precedes(TripStatus::Delivered));
        assert!(!TripStatus::Loaded.precedes(TripStatus::Loaded));
        assert!(!TripStatus::EnRoute.precedes(TripStatus::Loaded));
        assert!(!TripStatus::Cancelled.precedes(TripStatus::Loaded));
    }

    #[test]
    fn test_parse_actions() {
        let vehicle = VehicleId::new();
        let request = TripActionRequest {
            action: "assignVehicle".into(),
            vehicle_id: Some(vehicle),
            ..Default::default()
        };
        assert_eq!(
            TripAction::try_from(request).unwrap(),
            TripAction::AssignVehicle(vehicle)
        );

        let request = TripActionRequest {
            action: "assignVehicle".into(),
            ..Default::default()
        };
        assert!(matches!(
            TripAction::try_from(request),
            Err(TripError::VehicleRequired)
        ));

        let request = TripActionRequest {
            action: "teleport".into(),
            ..Default::default()
        };
        assert!(matches!(
            TripAction::try_from(request),
            Err(TripError::UnknownAction(name)) if name == "teleport"
        ));
    }

    #[rstest]
    #[case("markLoaded", TripStatus::Loaded)]
    #[case("markEnRoute", TripStatus::EnRoute)]
    #[case("markAtDestination", TripStatus::AtDestination)]
    #[case("markDelivered", TripStatus::Delivered)]
    #[case("cancel", TripStatus::Cancelled)]
    #[case("resume", TripStatus::Pending)]
    fn test_action_names_and_targets(#[case] name: &str, #[case] target: TripStatus) {
        let action = TripAction::try_from(TripActionRequest {
            action: name.into(),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(action.name(), name);
        assert_eq!(action.target(), target);
    }

    #[test]
    fn test_update_distinguishes_cleared_shortage() {
        let absent: UpdateTripInput = serde_json::from_value(json!({})).unwrap();
        assert!(absent.shortage.is_none());

        let cleared: UpdateTripInput = serde_json::from_value(json!({"shortage": null})).unwrap();
        assert!(matches!(cleared.shortage, Some(None)));

        let set: UpdateTripInput =
            serde_json::from_value(json!({"shortage": {"shortageAmount": "50"}})).unwrap();
        assert!(matches!(set.shortage, Some(Some(_))));
    }
}
