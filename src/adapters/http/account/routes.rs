//! Axum router configuration for user account endpoints.

use axum::{
    routing::{delete, get},
    Router,
};

use crate::adapters::http::state::AppState;

use super::handlers::{delete_account, export_data, get_profile, get_subscription, update_profile};

/// Create the user account router, mounted at `/api/user`.
///
/// Every route requires authentication.
pub fn account_routes() -> Router<AppState> {
    Router::new()
        .route("/profile", get(get_profile).put(update_profile))
        .route("/subscription", get(get_subscription))
        .route("/export", get(export_data))
        .route("/delete", delete(delete_account))
}
