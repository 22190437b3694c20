//! Vehicle repository.

use chrono::Utc;
use haulage_core::audit::{Auditable, LogEntry};
use haulage_core::vehicle::{
    CreateVehicleInput, UpdateVehicleInput, Vehicle, VehicleError, VehicleService, VehicleStatus,
};
use haulage_shared::AppResult;
use haulage_shared::types::{OrganizationId, PageRequest, PageResponse, VehicleId};
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use super::{StoreContext, changed_fields, changes, snapshot};
use crate::access::Actor;
use crate::document;
use crate::store::DocumentStore;

/// Vehicle list filters.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleListQuery {
    /// Only vehicles in this status.
    #[serde(default)]
    pub status: Option<VehicleStatus>,
    /// Include soft-deleted vehicles.
    #[serde(default)]
    pub include_disabled: bool,
}

/// Vehicle repository.
#[derive(Debug, Clone)]
pub struct VehicleRepository {
    ctx: StoreContext,
}

impl VehicleRepository {
    /// Creates a new vehicle repository.
    #[must_use]
    pub const fn new(ctx: StoreContext) -> Self {
        Self { ctx }
    }

    fn store(&self) -> &dyn DocumentStore {
        self.ctx.store.as_ref()
    }

    async fn load(&self, actor: Actor, vehicle_id: VehicleId) -> AppResult<Vehicle> {
        document::load::<Vehicle>(self.store(), actor.organization_id, vehicle_id.into_inner())
            .await?
            .ok_or_else(|| VehicleError::VehicleNotFound(vehicle_id).into())
    }

    async fn ensure_plate_free(
        &self,
        organization_id: OrganizationId,
        plate: &str,
        except: Option<VehicleId>,
    ) -> AppResult<()> {
        let taken = document::find::<Vehicle>(
            self.store(),
            organization_id,
            &json!({ "plateNumber": plate, "disabled": false }),
        )
        .await?
        .into_iter()
        .any(|v| Some(v.id) != except);
        if taken {
            return Err(VehicleError::DuplicatePlate(plate.to_string()).into());
        }
        Ok(())
    }

    /// Registers an available vehicle.
    ///
    /// # Errors
    ///
    /// Returns `Validation` for a blank plate and `Conflict` when a live
    /// vehicle already carries it.
    pub async fn create(&self, actor: Actor, input: CreateVehicleInput) -> AppResult<Vehicle> {
        let org = actor.organization_id;
        self.ctx.authorize(actor, org).await?;

        let mut vehicle = VehicleService::register(org, input, actor.user_id, Utc::now())?;
        self.ensure_plate_free(org, &vehicle.plate_number, None).await?;
        document::insert(self.store(), &mut vehicle).await?;

        info!(vehicle_id = %vehicle.id, plate = %vehicle.plate_number, "Vehicle registered");
        Ok(vehicle)
    }

    /// Edits plate, description or availability.
    ///
    /// # Errors
    ///
    /// Returns `Validation` when setting a trip-managed status and
    /// `BusinessRule` when deactivating a vehicle on a trip.
    pub async fn update(
        &self,
        actor: Actor,
        vehicle_id: VehicleId,
        input: UpdateVehicleInput,
    ) -> AppResult<Vehicle> {
        let mut vehicle = self.load(actor, vehicle_id).await?;
        self.ctx.authorize(actor, vehicle.organization_id).await?;

        let now = Utc::now();
        let before = snapshot(&vehicle)?;
        VehicleService::apply_update(&mut vehicle, input, now)?;
        let difference = changes(&before, &snapshot(&vehicle)?);
        if difference.is_empty() {
            return Ok(vehicle);
        }
        if difference.iter().any(|c| c.field == "plateNumber") {
            self.ensure_plate_free(vehicle.organization_id, &vehicle.plate_number, Some(vehicle.id))
                .await?;
        }

        let details = format!(
            "Vehicle {} updated: {}",
            vehicle.plate_number,
            changed_fields(&difference)
        );
        vehicle.record(LogEntry::new(actor.user_id, "updated", details, now).with_difference(difference));
        document::save(self.store(), &mut vehicle).await?;
        info!(vehicle_id = %vehicle.id, "Vehicle updated");
        Ok(vehicle)
    }

    /// Soft-deletes a vehicle that is not on a trip.
    ///
    /// # Errors
    ///
    /// Returns `BusinessRule` if the vehicle is on a trip or already deleted.
    pub async fn disable(&self, actor: Actor, vehicle_id: VehicleId) -> AppResult<Vehicle> {
        let mut vehicle = self.load(actor, vehicle_id).await?;
        self.ctx.authorize(actor, vehicle.organization_id).await?;

        let now = Utc::now();
        VehicleService::disable(&mut vehicle, now)?;
        vehicle.record(LogEntry::new(
            actor.user_id,
            "deleted",
            format!("Vehicle {} deleted", vehicle.plate_number),
            now,
        ));
        document::save(self.store(), &mut vehicle).await?;
        info!(vehicle_id = %vehicle.id, "Vehicle disabled");
        Ok(vehicle)
    }

    /// One vehicle.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the vehicle does not exist in the organisation.
    pub async fn view(&self, actor: Actor, vehicle_id: VehicleId) -> AppResult<Vehicle> {
        let vehicle = self.load(actor, vehicle_id).await?;
        self.ctx.authorize(actor, vehicle.organization_id).await?;
        Ok(vehicle)
    }

    /// Vehicles of the organisation, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub async fn list(
        &self,
        actor: Actor,
        query: VehicleListQuery,
        page: PageRequest,
    ) -> AppResult<PageResponse<Vehicle>> {
        let org = actor.organization_id;
        self.ctx.authorize(actor, org).await?;

        let mut filter = json!({});
        if let Some(status) = query.status {
            filter["status"] = json!(status);
        }
        if !query.include_disabled {
            filter["disabled"] = json!(false);
        }
        let vehicles = document::find::<Vehicle>(self.store(), org, &filter).await?;
        Ok(PageResponse::from_items(vehicles, page))
    }
}
