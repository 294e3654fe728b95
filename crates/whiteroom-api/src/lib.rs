//! WhiteRoom API: HTTP routes and the real-time gateway.

pub mod config;
pub mod error;
pub mod gateway;
pub mod identity;
pub mod routes;
pub mod state;
pub mod telemetry;

use axum::Router;

use crate::state::AppState;

/// Builds the application router. Middleware layers are added by the
/// binary.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(routes::health::router())
        .merge(gateway::router())
        .nest(
            "/api/v1/sessions",
            routes::sessions::router().merge(routes::audits::router()),
        )
        .with_state(state)
}
