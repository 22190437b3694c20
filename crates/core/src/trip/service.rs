//! Trip service: creation, edits and the status state machine.
//!
//! Every action is planned against the current trip (and vehicle, for
//! assignment) without side effects. The resulting [`TripTransition`] says
//! what happens to the trip and which vehicle must be occupied or released;
//! the caller persists both.

use chrono::{DateTime, Utc};
use haulage_shared::types::{OrganizationId, TripId, UserId, VehicleId};
use rust_decimal::Decimal;
use serde_json::json;

use crate::audit::{Auditable, FieldChange, LogEntry};
use crate::trip::error::TripError;
use crate::trip::types::{
    CREATED_ACTION, CreateTripInput, Shortage, TimelineEntry, Trip, TripAction, TripStatus,
    UpdateTripInput,
};
use crate::vehicle::{Vehicle, VehicleStatus};

/// What a transition does to vehicles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VehicleEffect {
    /// No vehicle changes.
    None,
    /// Put `vehicle_id` on the trip, freeing `release` if it differs.
    Occupy {
        /// Vehicle taking the trip.
        vehicle_id: VehicleId,
        /// Previously assigned vehicle to free.
        release: Option<VehicleId>,
    },
    /// Free the vehicle the trip held.
    Release(VehicleId),
}

impl VehicleEffect {
    /// Vehicle that must be freed, if any.
    #[must_use]
    pub fn released(&self) -> Option<VehicleId> {
        match self {
            Self::None => None,
            Self::Occupy { release, .. } => *release,
            Self::Release(id) => Some(*id),
        }
    }

    /// Vehicle that must be marked On Trip, if any.
    #[must_use]
    pub fn occupied(&self) -> Option<VehicleId> {
        match self {
            Self::Occupy { vehicle_id, .. } => Some(*vehicle_id),
            Self::None | Self::Release(_) => None,
        }
    }
}

/// A validated status move, ready to apply.
#[derive(Debug, Clone)]
pub struct TripTransition {
    /// The action taken.
    pub action: TripAction,
    /// Status before.
    pub from: TripStatus,
    /// Status after.
    pub to: TripStatus,
    /// Vehicle side effects.
    pub vehicle_effect: VehicleEffect,
    /// Who triggered it.
    pub actor: UserId,
    /// When.
    pub at: DateTime<Utc>,
}

impl TripTransition {
    /// Applies the move to the trip, appending one timeline entry and one
    /// log entry.
    pub fn apply(&self, trip: &mut Trip) {
        let vehicle_before = trip.vehicle_id;
        trip.status = self.to;

        match &self.action {
            TripAction::AssignVehicle(vehicle_id) => trip.vehicle_id = Some(*vehicle_id),
            TripAction::MarkDelivered(fuel) => {
                trip.drop_off_date = Some(self.at);
                if fuel.litres.is_some() {
                    trip.actual_fuel_litres = fuel.litres;
                }
                if fuel.cost.is_some() {
                    trip.actual_fuel_cost = fuel.cost;
                }
            }
            TripAction::Cancel(reason) => {
                trip.vehicle_id = None;
                trip.cancel_reason = Some(reason.clone());
                prune_timeline(trip);
            }
            TripAction::Resume(reason) => {
                trip.resume_reason = Some(reason.clone());
                prune_timeline(trip);
            }
            TripAction::MarkLoaded | TripAction::MarkEnRoute | TripAction::MarkAtDestination => {}
        }

        trip.timeline.push(TimelineEntry {
            date: self.at,
            user_id: self.actor,
            action: self.action.name().to_string(),
            status: self.to,
        });
        trip.updated_at = self.at;

        let mut difference = vec![FieldChange::new(
            "status",
            json!(self.from.as_str()),
            json!(self.to.as_str()),
        )];
        if vehicle_before != trip.vehicle_id {
            difference.push(FieldChange::new(
                "vehicleId",
                json!(vehicle_before),
                json!(trip.vehicle_id),
            ));
        }

        let details = format!(
            "Trip {} moved from {} to {}",
            trip.request_id, self.from, self.to
        );
        trip.record(
            LogEntry::new(self.actor, self.action.name(), details, self.at)
                .with_difference(difference),
        );
    }
}

/// Keeps only the creation entry.
fn prune_timeline(trip: &mut Trip) {
    let created = trip
        .timeline
        .iter()
        .find(|entry| entry.action == CREATED_ACTION)
        .cloned();
    trip.timeline = created.into_iter().collect();
}

/// Stateless service for the trip lifecycle.
pub struct TripService;

impl TripService {
    /// Validates input and builds a new Pending trip.
    ///
    /// Membership of the actor and of the billed party is checked by the
    /// caller against the directory.
    pub fn create(
        organization_id: OrganizationId,
        request_id: String,
        input: CreateTripInput,
        actor: UserId,
        now: DateTime<Utc>,
    ) -> Result<Trip, TripError> {
        Self::validate_create(&input)?;

        let mut trip = Trip {
            id: TripId::new(),
            organization_id,
            request_id,
            vehicle_id: None,
            customer_id: input.customer_id,
            vendor_id: input.vendor_id,
            amount: input.amount,
            status: TripStatus::Pending,
            timeline: vec![TimelineEntry {
                date: now,
                user_id: actor,
                action: CREATED_ACTION.to_string(),
                status: TripStatus::Pending,
            }],
            shortage: None,
            requested_waybill_image_url: None,
            delivered_waybill_image_url: None,
            pickup_location: input.pickup_location.trim().to_string(),
            delivery_location: input.delivery_location.trim().to_string(),
            cargo_description: input.cargo_description,
            trip_date: input.trip_date,
            estimated_fuel_litres: input.estimated_fuel_litres,
            actual_fuel_litres: None,
            actual_fuel_cost: None,
            drop_off_date: None,
            cancel_reason: None,
            resume_reason: None,
            disabled: false,
            logs: Vec::new(),
            remarks: Vec::new(),
            created_by: actor,
            created_at: now,
            updated_at: now,
            version: 0,
        };
        let details = format!(
            "Trip {} created from {} to {}",
            trip.request_id, trip.pickup_location, trip.delivery_location
        );
        trip.record(LogEntry::new(actor, CREATED_ACTION, details, now));
        Ok(trip)
    }

    /// Field checks for trip creation.
    pub fn validate_create(input: &CreateTripInput) -> Result<(), TripError> {
        if input.amount <= Decimal::ZERO {
            return Err(TripError::InvalidAmount);
        }
        if input.pickup_location.trim().is_empty() {
            return Err(TripError::MissingField("pickupLocation"));
        }
        if input.delivery_location.trim().is_empty() {
            return Err(TripError::MissingField("deliveryLocation"));
        }
        if input.vendor_id.is_some() == input.customer_id.is_some() {
            return Err(TripError::PartyRequired);
        }
        Ok(())
    }

    /// Refuses a vendor or customer change while `open_invoice` (the short
    /// code of a live invoice billing this trip) exists.
    ///
    /// Repeating the current party is not a change.
    pub fn ensure_party_editable(
        trip: &Trip,
        input: &UpdateTripInput,
        open_invoice: Option<&str>,
    ) -> Result<(), TripError> {
        let Some(invoice_id) = open_invoice else {
            return Ok(());
        };
        let vendor_changes = input.vendor_id.is_some_and(|v| trip.vendor_id != Some(v));
        let customer_changes = input.customer_id.is_some_and(|c| trip.customer_id != Some(c));
        if vendor_changes || customer_changes {
            return Err(TripError::PartyLockedByInvoice {
                request_id: trip.request_id.clone(),
                invoice_id: invoice_id.to_string(),
            });
        }
        Ok(())
    }

    /// Applies a partial update.
    ///
    /// `paid` is the trip's current paid total; the edited billable amount
    /// may not drop below it. Nothing is changed when an error is returned.
    pub fn apply_update(
        trip: &mut Trip,
        input: UpdateTripInput,
        paid: Decimal,
        now: DateTime<Utc>,
    ) -> Result<(), TripError> {
        trip.ensure_live()?;

        if input.vehicle_id.is_some() {
            return Err(TripError::VehicleChangeNotAllowed);
        }

        let mut next = trip.clone();

        match (input.vendor_id, input.customer_id) {
            (Some(_), Some(_)) => return Err(TripError::PartyRequired),
            (Some(vendor), None) => {
                next.vendor_id = Some(vendor);
                next.customer_id = None;
            }
            (None, Some(customer)) => {
                next.customer_id = Some(customer);
                next.vendor_id = None;
            }
            (None, None) => {}
        }

        if let Some(amount) = input.amount {
            if amount <= Decimal::ZERO {
                return Err(TripError::InvalidAmount);
            }
            next.amount = amount;
        }

        if let Some(pickup) = input.pickup_location {
            next.pickup_location = required_text(&pickup, "pickupLocation")?;
        }
        if let Some(delivery) = input.delivery_location {
            next.delivery_location = required_text(&delivery, "deliveryLocation")?;
        }
        if let Some(cargo) = input.cargo_description {
            next.cargo_description = Some(cargo);
        }
        if let Some(date) = input.trip_date {
            next.trip_date = Some(date);
        }
        if let Some(fuel) = input.estimated_fuel_litres {
            next.estimated_fuel_litres = Some(fuel);
        }
        if let Some(url) = input.requested_waybill_image_url {
            next.requested_waybill_image_url = Some(required_text(&url, "requestedWaybillImageUrl")?);
        }
        if let Some(url) = input.delivered_waybill_image_url {
            next.delivered_waybill_image_url = Some(required_text(&url, "deliveredWaybillImageUrl")?);
        }

        match input.shortage {
            Some(Some(shortage)) => {
                next.shortage = Some(Shortage {
                    shortage_amount: shortage.shortage_amount,
                    reason: shortage.reason,
                    recorded_at: now,
                });
            }
            Some(None) => next.shortage = None,
            None => {}
        }

        let shortage = next.shortage_amount();
        if shortage < Decimal::ZERO || shortage > next.amount {
            return Err(TripError::InvalidShortage);
        }

        let billable = next.billable();
        if billable < paid {
            return Err(TripError::AmountBelowPaid { billable, paid });
        }

        next.updated_at = now;
        *trip = next;
        Ok(())
    }

    /// Plans a status move.
    ///
    /// `vehicle` is the target vehicle for `assignVehicle` and is ignored for
    /// every other action.
    pub fn plan(
        trip: &Trip,
        action: TripAction,
        vehicle: Option<&Vehicle>,
        actor: UserId,
        now: DateTime<Utc>,
    ) -> Result<TripTransition, TripError> {
        trip.ensure_live()?;

        let from = trip.status;
        let to = action.target();
        let allowed = Self::is_valid_transition(from, to);
        let invalid = || TripError::InvalidTransition { from, to };

        let (action, vehicle_effect) = match action {
            TripAction::AssignVehicle(vehicle_id) => {
                if !allowed {
                    return Err(invalid());
                }
                let vehicle = vehicle
                    .filter(|v| v.id == vehicle_id)
                    .ok_or(TripError::VehicleNotFound(vehicle_id))?;
                Self::ensure_assignable(trip, vehicle)?;

                let release = trip.vehicle_id.filter(|previous| *previous != vehicle_id);
                (
                    TripAction::AssignVehicle(vehicle_id),
                    VehicleEffect::Occupy {
                        vehicle_id,
                        release,
                    },
                )
            }
            TripAction::MarkEnRoute => {
                if !allowed {
                    return Err(invalid());
                }
                if is_blank(trip.requested_waybill_image_url.as_deref()) {
                    return Err(TripError::RequestedWaybillRequired);
                }
                (TripAction::MarkEnRoute, VehicleEffect::None)
            }
            TripAction::MarkDelivered(fuel) => {
                if !allowed {
                    return Err(invalid());
                }
                if is_blank(trip.delivered_waybill_image_url.as_deref()) {
                    return Err(TripError::DeliveredWaybillRequired);
                }
                let effect = trip
                    .vehicle_id
                    .map_or(VehicleEffect::None, VehicleEffect::Release);
                (TripAction::MarkDelivered(fuel), effect)
            }
            TripAction::Cancel(reason) => {
                let reason = reason.trim();
                if reason.is_empty() {
                    return Err(TripError::CancelReasonRequired);
                }
                if !allowed {
                    return Err(invalid());
                }
                let effect = trip
                    .vehicle_id
                    .map_or(VehicleEffect::None, VehicleEffect::Release);
                (TripAction::Cancel(reason.to_string()), effect)
            }
            TripAction::Resume(reason) => {
                let reason = reason.trim();
                if reason.is_empty() {
                    return Err(TripError::ResumeReasonRequired);
                }
                if !allowed {
                    return Err(invalid());
                }
                (TripAction::Resume(reason.to_string()), VehicleEffect::None)
            }
            other @ (TripAction::MarkLoaded | TripAction::MarkAtDestination) => {
                if !allowed {
                    return Err(invalid());
                }
                (other, VehicleEffect::None)
            }
        };

        Ok(TripTransition {
            action,
            from,
            to,
            vehicle_effect,
            actor,
            at: now,
        })
    }

    /// Checks that `vehicle` can take `trip`.
    pub fn ensure_assignable(trip: &Trip, vehicle: &Vehicle) -> Result<(), TripError> {
        if vehicle.disabled || vehicle.status == VehicleStatus::Deleted {
            return Err(TripError::VehicleUnavailable {
                vehicle_id: vehicle.id,
                status: vehicle.status,
            });
        }
        if !vehicle.active {
            return Err(TripError::VehicleInactive(vehicle.id));
        }
        if vehicle.status != VehicleStatus::Available && !vehicle.is_held_by(trip.id) {
            return Err(TripError::VehicleUnavailable {
                vehicle_id: vehicle.id,
                status: vehicle.status,
            });
        }
        Ok(())
    }

    /// Soft-deletes a trip and returns the vehicle to free, if any.
    pub fn disable(
        trip: &mut Trip,
        actor: UserId,
        now: DateTime<Utc>,
    ) -> Result<Option<VehicleId>, TripError> {
        trip.ensure_live()?;

        let from = trip.status;
        let vehicle = trip.vehicle_id.take();
        trip.status = TripStatus::Deleted;
        trip.disabled = true;
        trip.updated_at = now;
        trip.timeline.push(TimelineEntry {
            date: now,
            user_id: actor,
            action: "deleted".to_string(),
            status: TripStatus::Deleted,
        });

        let mut difference = vec![FieldChange::new(
            "status",
            json!(from.as_str()),
            json!(TripStatus::Deleted.as_str()),
        )];
        if vehicle.is_some() {
            difference.push(FieldChange::new("vehicleId", json!(vehicle), json!(null)));
        }
        let details = format!("Trip {} deleted", trip.request_id);
        trip.record(LogEntry::new(actor, "deleted", details, now).with_difference(difference));

        Ok(vehicle)
    }

    /// The transition table: whether a status move is allowed, ignoring
    /// action preconditions such as waybills and reasons.
    #[must_use]
    pub fn is_valid_transition(from: TripStatus, to: TripStatus) -> bool {
        let live = !from.is_terminal() && from != TripStatus::Cancelled;
        match to {
            TripStatus::VehicleAssigned => {
                matches!(from, TripStatus::Pending | TripStatus::VehicleAssigned)
            }
            TripStatus::Pending => from == TripStatus::Cancelled,
            TripStatus::Cancelled => live,
            TripStatus::Deleted => from != TripStatus::Deleted,
            _ => from.precedes(to),
        }
    }
}

fn is_blank(value: Option<&str>) -> bool {
    value.is_none_or(|v| v.trim().is_empty())
}

fn required_text(value: &str, field: &'static str) -> Result<String, TripError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(TripError::MissingField(field));
    }
    Ok(value.to_string())
}
