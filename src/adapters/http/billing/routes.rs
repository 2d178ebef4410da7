//! Axum router configuration for billing endpoints.

use axum::{
    routing::{get, post},
    Router,
};

use crate::adapters::http::state::AppState;

use super::handlers::{
    cancel_subscription, handle_stripe_webhook, reactivate_subscription, sync_subscription,
    test_connection,
};

/// Create the billing API router, mounted at `/api/stripe`.
///
/// # Routes
///
/// ## Webhook (no session, signature verified)
/// - `POST /webhook` - Handle Stripe webhooks
///
/// ## User endpoints (require authentication)
/// - `POST /cancel` - Cancel at period end
/// - `POST /reactivate` - Undo a scheduled cancellation
/// - `POST /sync` - Pull a subscription from Stripe
/// - `GET /test` - Check Stripe connectivity
pub fn billing_routes() -> Router<AppState> {
    Router::new()
        .route("/webhook", post(handle_stripe_webhook))
        .route("/cancel", post(cancel_subscription))
        .route("/reactivate", post(reactivate_subscription))
        .route("/sync", post(sync_subscription))
        .route("/test", get(test_connection))
}
