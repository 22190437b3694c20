//! Persistence and orchestration for Haulage.
//!
//! This crate provides:
//! - The document store abstraction with in-memory and `SeaORM` backends
//! - Typed document helpers and the directory of users, vendors and customers
//! - Repositories that sequence the core rules against the store
//! - Database migrations

pub mod access;
pub mod directory;
pub mod document;
pub mod entities;
pub mod locks;
pub mod migration;
pub mod repositories;
pub mod store;

use std::sync::Arc;
use std::time::Duration;

use haulage_core::identifier::CodeGenerator;
use haulage_shared::AppResult;
use haulage_shared::config::{DatabaseConfig, IdentifierConfig, InvoiceConfig};
use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};

pub use access::{AccessPolicy, AccessRequest, Actor, MembershipPolicy};
pub use directory::{Directory, DirectoryEntry, DirectoryKind, StoreDirectory};
pub use locks::TripLocks;
pub use repositories::{
    InvoiceListQuery, InvoiceRepository, InvoiceView, PaymentListQuery, PaymentRepository,
    RemarkRepository, RemarkTarget, Repositories, StoreContext, TripListQuery, TripRepository,
    TripView, VehicleListQuery, VehicleRepository,
};
pub use store::{DocumentStore, MemoryStore, SeaStore, SharedStore, StoreError, StoredDocument};

/// Establishes a connection pool to the database.
///
/// # Errors
///
/// Returns an error if the connection cannot be established.
pub async fn connect(config: &DatabaseConfig) -> Result<DatabaseConnection, DbErr> {
    let mut options = ConnectOptions::new(config.url.clone());
    options
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .connect_timeout(Duration::from_secs(10))
        .sqlx_logging(false);
    Database::connect(options).await
}

/// Wires the repositories over `store`, with the directory and membership
/// policy backed by the same store.
///
/// # Errors
///
/// Returns an error if the identifier settings are invalid.
pub fn build_repositories(
    store: SharedStore,
    identifiers: &IdentifierConfig,
    invoices: InvoiceConfig,
) -> AppResult<Repositories> {
    let directory: Arc<dyn Directory> = Arc::new(StoreDirectory::new(store.clone()));
    let ctx = StoreContext {
        store,
        policy: Arc::new(MembershipPolicy::new(directory.clone())),
        directory,
        locks: TripLocks::new(),
        codes: CodeGenerator::from_config(identifiers)?,
        invoices,
    };
    Ok(Repositories::new(ctx))
}
