//! HTTP handlers for user account endpoints.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Json, Query, State};
use serde_json::Value;

use crate::adapters::http::error::ApiError;
use crate::adapters::http::middleware::RequireAuth;
use crate::adapters::http::state::AppState;
use crate::application::handlers::{
    CurrentSubscription, DeleteAccountCommand, ExportUserDataQuery, GetCurrentSubscriptionQuery,
    GetProfileQuery, UpdateProfileCommand,
};
use crate::domain::account::UserDataExport;
use crate::domain::profile::{ProfileError, UserProfile};

use super::dto::{DeleteAccountParams, DeleteAccountResponse};

/// GET /api/user/profile - The caller's profile, created on first read
pub async fn get_profile(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<UserProfile>, ApiError> {
    let profile = state
        .get_profile_handler()
        .handle(GetProfileQuery { user })
        .await?;
    Ok(Json(profile))
}

/// PUT /api/user/profile - Partial profile update
pub async fn update_profile(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<UserProfile>, ApiError> {
    let Json(body) = body.map_err(|e| ProfileError::InvalidUpdate(e.body_text()))?;
    let cmd = UpdateProfileCommand::from_json(user, body)?;

    let profile = state.update_profile_handler().handle(cmd).await?;
    Ok(Json(profile))
}

/// GET /api/user/subscription - The caller's latest subscription
pub async fn get_subscription(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<CurrentSubscription>, ApiError> {
    let current = state
        .current_subscription_handler()
        .handle(GetCurrentSubscriptionQuery { user_id: user.id })
        .await
        .map_err(|e| ApiError::billing("Failed to fetch subscription", e))?;
    Ok(Json(current))
}

/// GET /api/user/export - Everything stored about the caller
pub async fn export_data(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<UserDataExport>, ApiError> {
    let export = state
        .export_handler()
        .handle(ExportUserDataQuery { user_id: user.id })
        .await?;
    Ok(Json(export))
}

/// DELETE /api/user/delete?userId= - Close the caller's account
pub async fn delete_account(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Query(params): Query<DeleteAccountParams>,
) -> Result<Json<DeleteAccountResponse>, ApiError> {
    let cmd = DeleteAccountCommand {
        caller: user.id,
        user_id: params.user_id,
    };

    state.delete_account_handler().handle(cmd).await?;
    Ok(Json(DeleteAccountResponse { success: true }))
}
