//! The complete API router.

use axum::{middleware, Router};

use super::account::account_routes;
use super::billing::billing_routes;
use super::middleware::auth_middleware;
use super::session::{callback_routes, session_routes};
use super::state::AppState;

/// Builds the API with every route and the auth middleware.
///
/// Transport layers (trace, CORS, timeouts) are added by the binary.
pub fn api_router(state: AppState) -> Router {
    Router::new()
        .nest("/api/stripe", billing_routes())
        .nest("/api/user", account_routes())
        .nest("/api/auth", session_routes())
        .nest("/auth", callback_routes())
        .layer(middleware::from_fn_with_state(
            state.session_validator.clone(),
            auth_middleware,
        ))
        .with_state(state)
}
