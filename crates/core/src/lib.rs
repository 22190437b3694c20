//! Core business logic for Haulage.
//!
//! This crate contains pure business logic with ZERO web or database dependencies.
//! Documents, state machines, balance rules and validation live here; the
//! `haulage-db` crate loads and persists the documents around these calls.
//!
//! # Modules
//!
//! - `audit` - Audit log entries, field diffs and remarks shared by all documents
//! - `trip` - Trip documents and the trip status state machine
//! - `vehicle` - Vehicles and their trip-driven availability
//! - `billing` - Payments, invoices, balances and payment validation
//! - `identifier` - Organisation-scoped short codes

pub mod audit;
pub mod billing;
pub mod identifier;
pub mod trip;
pub mod vehicle;
