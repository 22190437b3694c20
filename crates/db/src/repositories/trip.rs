//! Trip repository: creation, edits, the state machine and views.

use chrono::{DateTime, Utc};
use haulage_core::audit::{Auditable, FieldChange, LogEntry};
use haulage_core::billing::{Balance, BalanceCalculator, BalanceScope, Payment};
use haulage_core::trip::{
    CreateTripInput, Trip, TripAction, TripActionRequest, TripError, TripService, TripStatus,
    UpdateTripInput,
};
use haulage_core::vehicle::{Vehicle, VehicleStatus};
use haulage_shared::types::{
    CustomerId, OrganizationId, PageRequest, PageResponse, TripId, VehicleId, VendorId,
};
use haulage_shared::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{info, warn};
use uuid::Uuid;

use super::invoice::open_invoices_for;
use super::{StoreContext, changed_fields, changes, snapshot};
use crate::access::Actor;
use crate::directory::DirectoryKind;
use crate::document;
use crate::store::{DocumentStore, StoreError};

/// A trip with its balance.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TripView {
    /// The trip.
    #[serde(flatten)]
    pub trip: Trip,
    /// `{paid, amountDue}` over every live payment.
    #[serde(flatten)]
    pub balance: Balance,
}

/// Trip list filters.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripListQuery {
    /// Only trips in this status.
    #[serde(default)]
    pub status: Option<TripStatus>,
    /// Include soft-deleted trips.
    #[serde(default)]
    pub include_disabled: bool,
}

/// A vehicle write made on behalf of a transition, kept so it can be
/// undone if the trip write fails.
#[derive(Debug, Clone, Copy)]
enum VehicleChange {
    Occupied(VehicleId),
    Released(VehicleId),
}

/// Trip repository.
#[derive(Debug, Clone)]
pub struct TripRepository {
    ctx: StoreContext,
}

/// Loads the trip with this request id, live or not.
pub(crate) async fn find_by_request_id(
    store: &dyn DocumentStore,
    organization_id: OrganizationId,
    request_id: &str,
) -> Result<Option<Trip>, StoreError> {
    document::find_one::<Trip>(store, organization_id, &json!({ "requestId": request_id })).await
}

/// Live payments with a line for `request_id`.
pub(crate) async fn payments_for(
    store: &dyn DocumentStore,
    organization_id: OrganizationId,
    request_id: &str,
) -> Result<Vec<Payment>, StoreError> {
    document::find::<Payment>(
        store,
        organization_id,
        &json!({ "requestIds": [{ "requestId": request_id }], "disabled": false }),
    )
    .await
}

impl TripRepository {
    /// Creates a new trip repository.
    #[must_use]
    pub const fn new(ctx: StoreContext) -> Self {
        Self { ctx }
    }

    fn store(&self) -> &dyn DocumentStore {
        self.ctx.store.as_ref()
    }

    async fn load(&self, actor: Actor, trip_id: TripId) -> AppResult<Trip> {
        document::load::<Trip>(self.store(), actor.organization_id, trip_id.into_inner())
            .await?
            .ok_or_else(|| TripError::TripNotFound(trip_id.to_string()).into())
    }

    async fn with_balance(&self, trip: Trip) -> AppResult<TripView> {
        let payments = payments_for(self.store(), trip.organization_id, &trip.request_id).await?;
        let balance = BalanceCalculator::for_trip(&trip, &payments, BalanceScope::All);
        Ok(TripView { trip, balance })
    }

    async fn check_parties(
        &self,
        organization_id: OrganizationId,
        vendor: Option<VendorId>,
        customer: Option<CustomerId>,
    ) -> AppResult<()> {
        if let Some(vendor) = vendor {
            if !self.ctx.directory.vendor_exists(organization_id, vendor).await? {
                return Err(AppError::NotFound(format!("Vendor {vendor} not found")));
            }
        }
        if let Some(customer) = customer {
            if !self.ctx.directory.customer_exists(organization_id, customer).await? {
                return Err(AppError::NotFound(format!("Customer {customer} not found")));
            }
        }
        Ok(())
    }

    /// Replaces vendor, customer and vehicle ids in a diff with display
    /// names. Unknown ids are left as they are.
    async fn resolve_names(
        &self,
        organization_id: OrganizationId,
        difference: &mut [FieldChange],
    ) -> Result<(), StoreError> {
        for change in difference.iter_mut() {
            let field = change.field.clone();
            change.before = self.display_name(organization_id, &field, &change.before).await?;
            change.after = self.display_name(organization_id, &field, &change.after).await?;
        }
        Ok(())
    }

    async fn display_name(
        &self,
        organization_id: OrganizationId,
        field: &str,
        value: &Value,
    ) -> Result<Value, StoreError> {
        let Some(id) = value.as_str().and_then(|s| Uuid::parse_str(s).ok()) else {
            return Ok(value.clone());
        };
        let name = match field {
            "vendorId" => {
                self.ctx
                    .directory
                    .name(DirectoryKind::Vendor, organization_id, id)
                    .await?
            }
            "customerId" => {
                self.ctx
                    .directory
                    .name(DirectoryKind::Customer, organization_id, id)
                    .await?
            }
            "vehicleId" => document::load::<Vehicle>(self.store(), organization_id, id)
                .await?
                .map(|v| v.plate_number),
            _ => None,
        };
        Ok(name.map_or_else(|| value.clone(), Value::String))
    }

    /// Creates a trip in `Pending` with a fresh request id.
    ///
    /// # Errors
    ///
    /// Returns `Validation` for bad input, `Forbidden` for non-members and
    /// `NotFound` for an unknown vendor or customer.
    pub async fn create(&self, actor: Actor, input: CreateTripInput) -> AppResult<TripView> {
        let org = actor.organization_id;
        self.ctx.authorize(actor, org).await?;
        TripService::validate_create(&input)?;
        self.check_parties(org, input.vendor_id, input.customer_id).await?;

        let request_id = self.ctx.next_code::<Trip>(org, "requestId").await?;
        let mut trip = TripService::create(org, request_id, input, actor.user_id, Utc::now())?;
        document::insert(self.store(), &mut trip).await?;

        info!(
            trip_id = %trip.id,
            request_id = %trip.request_id,
            amount = %trip.amount,
            "Trip created"
        );
        Ok(TripView {
            balance: Balance {
                paid: rust_decimal::Decimal::ZERO,
                amount_due: trip.billable(),
            },
            trip,
        })
    }

    /// Edits trip fields, logging a field-level diff.
    ///
    /// Runs under the trip lock so the amount cannot drop below what a
    /// concurrent payment is recording.
    ///
    /// # Errors
    ///
    /// Returns `BusinessRule` when the trip is deleted or the billable
    /// amount would fall below what was paid, `Conflict` on a stale write
    /// or when the vendor or customer changes while a live invoice bills
    /// the trip.
    pub async fn update(&self, actor: Actor, trip_id: TripId, input: UpdateTripInput) -> AppResult<TripView> {
        let org = actor.organization_id;
        let mut trip = self.load(actor, trip_id).await?;
        self.ctx.authorize(actor, trip.organization_id).await?;
        self.check_parties(org, input.vendor_id, input.customer_id).await?;

        let _guard = self.ctx.locks.acquire(org, [trip.request_id.as_str()]).await;
        if input.vendor_id.is_some() || input.customer_id.is_some() {
            let open = open_invoices_for(self.store(), org, &trip.request_id).await?;
            let invoice_id = open.first().map(|i| i.invoice_id.as_str());
            TripService::ensure_party_editable(&trip, &input, invoice_id)?;
        }
        let payments = payments_for(self.store(), org, &trip.request_id).await?;
        let paid = BalanceCalculator::paid(&trip.request_id, &payments, BalanceScope::All);

        let now = Utc::now();
        let before = snapshot(&trip)?;
        TripService::apply_update(&mut trip, input, paid, now)?;
        let mut difference = changes(&before, &snapshot(&trip)?);

        if difference.is_empty() {
            let balance = BalanceCalculator::for_trip(&trip, &payments, BalanceScope::All);
            return Ok(TripView { trip, balance });
        }

        let details = format!("Trip {} updated: {}", trip.request_id, changed_fields(&difference));
        self.resolve_names(org, &mut difference).await?;
        trip.record(LogEntry::new(actor.user_id, "updated", details, now).with_difference(difference));
        document::save(self.store(), &mut trip).await?;

        info!(trip_id = %trip.id, request_id = %trip.request_id, "Trip updated");
        let balance = BalanceCalculator::for_trip(&trip, &payments, BalanceScope::All);
        Ok(TripView { trip, balance })
    }

    /// Runs one state machine action.
    ///
    /// Vehicle writes happen first; if the trip write then fails they are
    /// undone (best effort, logged).
    ///
    /// # Errors
    ///
    /// Returns `Validation` for unknown actions or missing reasons,
    /// `BusinessRule` for moves the state machine refuses, `Conflict` when
    /// the trip or vehicle changed concurrently.
    pub async fn trip_action(
        &self,
        actor: Actor,
        trip_id: TripId,
        request: TripActionRequest,
    ) -> AppResult<TripView> {
        let org = actor.organization_id;
        let action = TripAction::try_from(request)?;
        let mut trip = self.load(actor, trip_id).await?;
        self.ctx.authorize(actor, trip.organization_id).await?;

        let vehicle = match &action {
            TripAction::AssignVehicle(vehicle_id) => {
                document::load::<Vehicle>(self.store(), org, vehicle_id.into_inner()).await?
            }
            _ => None,
        };

        let now = Utc::now();
        let transition = TripService::plan(&trip, action, vehicle.as_ref(), actor.user_id, now)?;

        let mut applied = Vec::new();
        if let Some(mut vehicle) = vehicle.filter(|v| !v.is_held_by(trip.id)) {
            if transition.vehicle_effect.occupied() == Some(vehicle.id) {
                self.occupy(&mut vehicle, &trip, actor, now).await?;
                applied.push(VehicleChange::Occupied(vehicle.id));
            }
        }
        if let Some(released) = transition.vehicle_effect.released() {
            match self.release(released, &trip, actor, now).await {
                Ok(true) => applied.push(VehicleChange::Released(released)),
                Ok(false) => {}
                Err(err) => {
                    self.revert(&applied, &trip, actor).await;
                    return Err(err);
                }
            }
        }

        transition.apply(&mut trip);
        if let Some(entry) = trip.logs.last_mut() {
            self.resolve_names(org, &mut entry.difference).await?;
        }

        if let Err(err) = document::save(self.store(), &mut trip).await {
            self.revert(&applied, &trip, actor).await;
            return Err(err.into());
        }

        info!(
            trip_id = %trip.id,
            request_id = %trip.request_id,
            from = %transition.from,
            to = %transition.to,
            action = transition.action.name(),
            "Trip status changed"
        );
        self.with_balance(trip).await
    }

    async fn occupy(
        &self,
        vehicle: &mut Vehicle,
        trip: &Trip,
        actor: Actor,
        now: DateTime<Utc>,
    ) -> AppResult<()> {
        let before = vehicle.status;
        vehicle.occupy(trip.id, now);
        vehicle.record(
            LogEntry::new(
                actor.user_id,
                "assigned",
                format!("Assigned to trip {}", trip.request_id),
                now,
            )
            .with_difference(vec![FieldChange::new(
                "status",
                json!(before.as_str()),
                json!(VehicleStatus::OnTrip.as_str()),
            )]),
        );
        document::save(self.store(), vehicle).await?;
        Ok(())
    }

    /// Frees `vehicle_id` if it is still held by `trip`.
    async fn release(
        &self,
        vehicle_id: VehicleId,
        trip: &Trip,
        actor: Actor,
        now: DateTime<Utc>,
    ) -> AppResult<bool> {
        let Some(mut vehicle) =
            document::load::<Vehicle>(self.store(), trip.organization_id, vehicle_id.into_inner())
                .await?
        else {
            warn!(vehicle_id = %vehicle_id, trip_id = %trip.id, "Vehicle to release not found");
            return Ok(false);
        };

        let before = vehicle.status;
        if !vehicle.release(trip.id, now) {
            return Ok(false);
        }
        vehicle.record(
            LogEntry::new(
                actor.user_id,
                "released",
                format!("Released from trip {}", trip.request_id),
                now,
            )
            .with_difference(vec![FieldChange::new(
                "status",
                json!(before.as_str()),
                json!(vehicle.status.as_str()),
            )]),
        );
        document::save(self.store(), &mut vehicle).await?;
        Ok(true)
    }

    /// Undoes vehicle writes in reverse order. Failures are only logged.
    async fn revert(&self, applied: &[VehicleChange], trip: &Trip, actor: Actor) {
        for change in applied.iter().rev() {
            if let Err(err) = self.revert_one(*change, trip, actor).await {
                warn!(
                    trip_id = %trip.id,
                    change = ?change,
                    error = %err,
                    "Failed to revert vehicle change"
                );
            }
        }
    }

    async fn revert_one(&self, change: VehicleChange, trip: &Trip, actor: Actor) -> Result<(), StoreError> {
        let (VehicleChange::Occupied(vehicle_id) | VehicleChange::Released(vehicle_id)) = change;
        let Some(mut vehicle) =
            document::load::<Vehicle>(self.store(), trip.organization_id, vehicle_id.into_inner())
                .await?
        else {
            return Ok(());
        };

        let now = Utc::now();
        let before = vehicle.status;
        match change {
            VehicleChange::Occupied(_) => {
                vehicle.release(trip.id, now);
            }
            VehicleChange::Released(_) => vehicle.occupy(trip.id, now),
        }
        vehicle.record(
            LogEntry::new(
                actor.user_id,
                "reverted",
                format!("Trip {} could not be saved", trip.request_id),
                now,
            )
            .with_difference(vec![FieldChange::new(
                "status",
                json!(before.as_str()),
                json!(vehicle.status.as_str()),
            )]),
        );
        document::save(self.store(), &mut vehicle).await
    }

    /// Soft-deletes a trip and frees its vehicle.
    ///
    /// # Errors
    ///
    /// Returns `BusinessRule` if the trip is already deleted.
    pub async fn disable(&self, actor: Actor, trip_id: TripId) -> AppResult<Trip> {
        let mut trip = self.load(actor, trip_id).await?;
        self.ctx.authorize(actor, trip.organization_id).await?;

        let now = Utc::now();
        let vehicle = TripService::disable(&mut trip, actor.user_id, now)?;
        document::save(self.store(), &mut trip).await?;
        info!(trip_id = %trip.id, request_id = %trip.request_id, "Trip disabled");

        if let Some(vehicle_id) = vehicle {
            if let Err(err) = self.release(vehicle_id, &trip, actor, now).await {
                warn!(
                    trip_id = %trip.id,
                    vehicle_id = %vehicle_id,
                    error = %err,
                    "Failed to free vehicle of disabled trip"
                );
            }
        }
        Ok(trip)
    }

    /// One trip with its balance.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the trip does not exist in the organisation.
    pub async fn view(&self, actor: Actor, trip_id: TripId) -> AppResult<TripView> {
        let trip = self.load(actor, trip_id).await?;
        self.ctx.authorize(actor, trip.organization_id).await?;
        self.with_balance(trip).await
    }

    /// Trips of the organisation, newest first, with balances.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub async fn list(
        &self,
        actor: Actor,
        query: TripListQuery,
        page: PageRequest,
    ) -> AppResult<PageResponse<TripView>> {
        let org = actor.organization_id;
        self.ctx.authorize(actor, org).await?;

        let mut filter = json!({});
        if let Some(status) = query.status {
            filter["status"] = json!(status);
        }
        if !query.include_disabled {
            filter["disabled"] = json!(false);
        }

        let trips = document::find::<Trip>(self.store(), org, &filter).await?;
        let payments =
            document::find::<Payment>(self.store(), org, &json!({ "disabled": false })).await?;

        let views = trips
            .into_iter()
            .rev()
            .map(|trip| {
                let balance = BalanceCalculator::for_trip(&trip, &payments, BalanceScope::All);
                TripView { trip, balance }
            })
            .collect();
        Ok(PageResponse::from_items(views, page))
    }
}
