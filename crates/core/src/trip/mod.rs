//! Trip lifecycle management.
//!
//! # Modules
//!
//! - `types` - Trip document, status and action types
//! - `error` - Trip-specific error types
//! - `service` - Creation, edits and the status state machine

pub mod error;
pub mod service;
pub mod types;

#[cfg(test)]
mod service_props;

pub use error::TripError;
pub use service::{TripService, TripTransition, VehicleEffect};
pub use types::{
    CREATED_ACTION, CreateTripInput, FuelReading, Shortage, ShortageInput, TimelineEntry, Trip,
    TripAction, TripActionRequest, TripStatus, UpdateTripInput,
};
