//! Fixtures for repository tests over the in-memory store.

use std::sync::Arc;

use haulage_core::identifier::CodeGenerator;
use haulage_core::trip::{CreateTripInput, TripActionRequest, UpdateTripInput};
use haulage_core::vehicle::CreateVehicleInput;
use haulage_shared::config::InvoiceConfig;
use haulage_shared::types::{CustomerId, OrganizationId, UserId, VendorId};
use rust_decimal::Decimal;

use super::{Repositories, StoreContext, TripView};
use crate::access::{Actor, MembershipPolicy};
use crate::directory::{DirectoryKind, StoreDirectory};
use crate::locks::TripLocks;
use crate::store::{MemoryStore, SharedStore};

pub(crate) struct Fixture {
    pub repos: Repositories,
    pub store: SharedStore,
    pub directory: StoreDirectory,
    pub actor: Actor,
    pub vendor: VendorId,
    pub other_vendor: VendorId,
    pub customer: CustomerId,
}

impl Fixture {
    pub async fn new() -> Self {
        let store: SharedStore = Arc::new(MemoryStore::new());
        let directory = StoreDirectory::new(store.clone());
        let org = OrganizationId::new();
        let user = UserId::new();
        let vendor = VendorId::new();
        let other_vendor = VendorId::new();
        let customer = CustomerId::new();

        directory
            .register(DirectoryKind::User, org, user.into_inner(), "Ada Obi")
            .await
            .unwrap();
        directory
            .register(DirectoryKind::Vendor, org, vendor.into_inner(), "Northline Haulage")
            .await
            .unwrap();
        directory
            .register(DirectoryKind::Vendor, org, other_vendor.into_inner(), "Delta Freight")
            .await
            .unwrap();
        directory
            .register(DirectoryKind::Customer, org, customer.into_inner(), "Kano Mills")
            .await
            .unwrap();

        let shared_directory = Arc::new(directory.clone());
        let ctx = StoreContext {
            store: store.clone(),
            directory: shared_directory.clone(),
            policy: Arc::new(MembershipPolicy::new(shared_directory)),
            locks: TripLocks::new(),
            codes: CodeGenerator::default(),
            invoices: InvoiceConfig::default(),
        };

        Self {
            repos: Repositories::new(ctx),
            store,
            directory,
            actor: Actor::new(user, org),
            vendor,
            other_vendor,
            customer,
        }
    }

    /// A second member of the same organisation.
    pub async fn colleague(&self) -> Actor {
        let user = UserId::new();
        self.directory
            .register(
                DirectoryKind::User,
                self.actor.organization_id,
                user.into_inner(),
                "Bola Ade",
            )
            .await
            .unwrap();
        Actor::new(user, self.actor.organization_id)
    }

    pub fn trip_input(&self, amount: Decimal) -> CreateTripInput {
        CreateTripInput {
            vendor_id: Some(self.vendor),
            amount,
            pickup_location: "Apapa".into(),
            delivery_location: "Kano".into(),
            ..Default::default()
        }
    }

    pub async fn trip(&self, amount: Decimal) -> TripView {
        self.repos
            .trips
            .create(self.actor, self.trip_input(amount))
            .await
            .unwrap()
    }

    /// A trip with both waybills uploaded.
    pub async fn trip_with_waybills(&self, amount: Decimal) -> TripView {
        let view = self.trip(amount).await;
        self.repos
            .trips
            .update(
                self.actor,
                view.trip.id,
                UpdateTripInput {
                    requested_waybill_image_url: Some("https://files.example/req.jpg".into()),
                    delivered_waybill_image_url: Some("https://files.example/del.jpg".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
    }

    pub async fn vehicle(&self, plate: &str) -> haulage_core::vehicle::Vehicle {
        self.repos
            .vehicles
            .create(
                self.actor,
                CreateVehicleInput {
                    plate_number: plate.into(),
                    description: None,
                },
            )
            .await
            .unwrap()
    }
}

pub(crate) fn action(name: &str) -> TripActionRequest {
    TripActionRequest {
        action: name.into(),
        ..Default::default()
    }
}
