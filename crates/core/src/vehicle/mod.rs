//! Vehicles and their trip-driven availability.
//!
//! Vehicle status moves between `Available` and `On Trip` only through the
//! trip state machine (see [`crate::trip::TripService`]). Direct edits can
//! toggle `active` and descriptive fields but never pull a vehicle off a trip.

pub mod error;
pub mod service;
pub mod types;

pub use error::VehicleError;
pub use service::VehicleService;
pub use types::{CreateVehicleInput, UpdateVehicleInput, Vehicle, VehicleStatus};
