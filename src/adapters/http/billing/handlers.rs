//! HTTP handlers for billing endpoints.
//!
//! These handlers connect axum routes to the subscription command handlers.

use axum::body::Bytes;
use axum::extract::{Json, State};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};

use crate::adapters::http::error::ApiError;
use crate::adapters::http::middleware::RequireAuth;
use crate::adapters::http::state::AppState;
use crate::application::handlers::{
    CancelSubscriptionCommand, CancelSubscriptionResult, HandleWebhookCommand,
    HandleWebhookResult, ReactivateSubscriptionCommand, SyncSubscriptionCommand,
};

use super::dto::{
    ConnectionTestResponse, SubscriptionActionRequest, SubscriptionActionResponse,
    WebhookBlockedResponse, WebhookReceivedResponse,
};

const STRIPE_SIGNATURE_HEADER: &str = "Stripe-Signature";

/// POST /api/stripe/webhook - Handle Stripe webhooks
///
/// Authenticated by signature, not by session.
pub async fn handle_stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    let signature = headers
        .get(STRIPE_SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::bad_request("No signature found"))?;

    let cmd = HandleWebhookCommand {
        payload: body.to_vec(),
        signature: signature.to_string(),
    };

    let response = match state.webhook_handler().handle(cmd).await? {
        HandleWebhookResult::Blocked { .. } => {
            Json(WebhookBlockedResponse::duplicate_subscription()).into_response()
        }
        HandleWebhookResult::Synced { .. }
        | HandleWebhookResult::Pending { .. }
        | HandleWebhookResult::Ignored => {
            Json(WebhookReceivedResponse { received: true }).into_response()
        }
    };
    Ok(response)
}

/// POST /api/stripe/cancel - Cancel at the end of the billing period
pub async fn cancel_subscription(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    request: Option<Json<SubscriptionActionRequest>>,
) -> Result<Json<SubscriptionActionResponse>, ApiError> {
    let Json(request) = request.unwrap_or_default();
    let cmd = CancelSubscriptionCommand {
        user_id: user.id,
        subscription_id: request.subscription_id(),
    };

    let result = state
        .cancel_handler()
        .handle(cmd)
        .await
        .map_err(|e| ApiError::billing("Failed to cancel subscription", e))?;

    Ok(Json(match result {
        CancelSubscriptionResult::AlreadyCanceled => SubscriptionActionResponse::already_canceled(),
        CancelSubscriptionResult::Scheduled(subscription) => {
            SubscriptionActionResponse::with_subscription(subscription)
        }
    }))
}

/// POST /api/stripe/reactivate - Undo a scheduled cancellation
pub async fn reactivate_subscription(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    request: Option<Json<SubscriptionActionRequest>>,
) -> Result<Json<SubscriptionActionResponse>, ApiError> {
    let Json(request) = request.unwrap_or_default();
    let cmd = ReactivateSubscriptionCommand {
        user_id: user.id,
        subscription_id: request.subscription_id(),
    };

    let subscription = state
        .reactivate_handler()
        .handle(cmd)
        .await
        .map_err(|e| ApiError::billing("Failed to reactivate subscription", e))?;

    Ok(Json(SubscriptionActionResponse::with_subscription(subscription)))
}

/// POST /api/stripe/sync - Pull a subscription from Stripe into the database
pub async fn sync_subscription(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    request: Option<Json<SubscriptionActionRequest>>,
) -> Result<Json<SubscriptionActionResponse>, ApiError> {
    let Json(request) = request.unwrap_or_default();
    let cmd = SyncSubscriptionCommand {
        user_id: user.id,
        subscription_id: request.subscription_id(),
    };

    state
        .sync_handler()
        .handle(cmd)
        .await
        .map_err(|e| ApiError::billing("Failed to sync subscription", e))?;

    Ok(Json(SubscriptionActionResponse::success()))
}

/// GET /api/stripe/test - Check Stripe connectivity
pub async fn test_connection(
    State(state): State<AppState>,
    RequireAuth(_user): RequireAuth,
) -> Result<Json<ConnectionTestResponse>, ApiError> {
    let result = state
        .test_connection_handler()
        .handle()
        .await
        .map_err(|e| ApiError::billing("Stripe connection failed", e))?;

    Ok(Json(ConnectionTestResponse::from(result)))
}
