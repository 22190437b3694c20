//! Direct vehicle edits.

use chrono::{DateTime, Utc};
use haulage_shared::types::{OrganizationId, UserId, VehicleId};

use crate::audit::{Auditable, LogEntry};
use crate::vehicle::error::VehicleError;
use crate::vehicle::types::{CreateVehicleInput, UpdateVehicleInput, Vehicle, VehicleStatus};

/// Stateless service for vehicle registration and editing.
pub struct VehicleService;

impl VehicleService {
    /// Builds a new, available vehicle.
    pub fn register(
        organization_id: OrganizationId,
        input: CreateVehicleInput,
        actor: UserId,
        now: DateTime<Utc>,
    ) -> Result<Vehicle, VehicleError> {
        let plate_number = normalize_plate(&input.plate_number)?;

        let mut vehicle = Vehicle {
            id: VehicleId::new(),
            organization_id,
            plate_number,
            description: input.description.filter(|d| !d.trim().is_empty()),
            status: VehicleStatus::Available,
            active: true,
            current_trip_id: None,
            disabled: false,
            logs: Vec::new(),
            remarks: Vec::new(),
            created_by: actor,
            created_at: now,
            updated_at: now,
            version: 0,
        };
        let details = format!("Vehicle {} registered", vehicle.plate_number);
        vehicle.record(LogEntry::new(actor, "created", details, now));
        Ok(vehicle)
    }

    /// Applies a partial update.
    ///
    /// A vehicle held by a trip keeps its `On Trip` status; only descriptive
    /// fields can change while it is out.
    pub fn apply_update(
        vehicle: &mut Vehicle,
        input: UpdateVehicleInput,
        now: DateTime<Utc>,
    ) -> Result<(), VehicleError> {
        if vehicle.disabled {
            return Err(VehicleError::VehicleDeleted(vehicle.id));
        }

        if let Some(plate) = input.plate_number {
            vehicle.plate_number = normalize_plate(&plate)?;
        }
        if let Some(description) = input.description {
            vehicle.description = Some(description).filter(|d| !d.trim().is_empty());
        }

        let on_trip = vehicle.status == VehicleStatus::OnTrip;

        let target_active = match input.status {
            Some(VehicleStatus::Available) => Some(true),
            Some(VehicleStatus::Inactive) => Some(false),
            Some(other) => return Err(VehicleError::StatusNotEditable(other)),
            None => input.active,
        };

        if let Some(active) = target_active {
            if on_trip && !active {
                return Err(VehicleError::VehicleOnTrip(vehicle.id));
            }
            vehicle.active = active;
            if !on_trip {
                vehicle.status = if active {
                    VehicleStatus::Available
                } else {
                    VehicleStatus::Inactive
                };
            }
        }

        vehicle.updated_at = now;
        Ok(())
    }

    /// Soft-deletes the vehicle.
    pub fn disable(vehicle: &mut Vehicle, now: DateTime<Utc>) -> Result<(), VehicleError> {
        if vehicle.disabled {
            return Err(VehicleError::VehicleDeleted(vehicle.id));
        }
        if vehicle.status == VehicleStatus::OnTrip {
            return Err(VehicleError::VehicleOnTrip(vehicle.id));
        }

        vehicle.disabled = true;
        vehicle.active = false;
        vehicle.status = VehicleStatus::Deleted;
        vehicle.updated_at = now;
        Ok(())
    }
}

fn normalize_plate(plate: &str) -> Result<String, VehicleError> {
    let plate = plate.trim();
    if plate.is_empty() {
        return Err(VehicleError::PlateNumberRequired);
    }
    Ok(plate.to_uppercase())
}
