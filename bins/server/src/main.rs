//! Haulage API Server
//!
//! Main entry point for the fleet back-office service.

use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use haulage_api::{AppState, create_router};
use haulage_db::migration::{Migrator, MigratorTrait};
use haulage_db::{MemoryStore, SeaStore, SharedStore, build_repositories, connect};
use haulage_shared::config::StoreBackend;
use haulage_shared::{AppConfig, JwtConfig, JwtService};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "haulage=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::load().context("Failed to load configuration")?;

    let store: SharedStore = match config.database.backend {
        StoreBackend::Memory => {
            info!("Using in-memory document store");
            Arc::new(MemoryStore::new())
        }
        StoreBackend::Postgres => {
            let db = connect(&config.database).await?;
            info!("Connected to database");
            Migrator::up(&db, None).await?;
            Arc::new(SeaStore::new(db))
        }
    };

    let repos = build_repositories(store, &config.identifiers, config.invoices)?;

    let jwt_service = JwtService::new(JwtConfig {
        secret: config.jwt.secret.clone(),
        #[allow(clippy::cast_possible_wrap)]
        access_token_expires_minutes: (config.jwt.access_token_expiry_secs / 60) as i64,
    });

    let app = create_router(AppState::new(repos, jwt_service));

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
