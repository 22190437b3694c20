//! API route definitions.

use axum::{Router, middleware};

use crate::{AppState, middleware::auth::auth_middleware};

pub mod health;
pub mod invoices;
pub mod payments;
pub mod remarks;
pub mod shared;
pub mod trips;
pub mod vehicles;

/// Creates the API router with public and protected routes.
#[allow(clippy::needless_pass_by_value)]
pub fn api_routes_with_state(state: AppState) -> Router<AppState> {
    let protected_routes = Router::new()
        .merge(trips::routes())
        .merge(payments::routes())
        .merge(invoices::routes())
        .merge(vehicles::routes())
        .merge(remarks::routes())
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .merge(health::routes())
        .merge(shared::routes())
        .merge(protected_routes)
}
