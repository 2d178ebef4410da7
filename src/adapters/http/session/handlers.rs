//! HTTP handlers for sign-in, session and OAuth endpoints.
//!
//! JSON endpoints return the platform session and also set it as cookies,
//! so the same routes serve API clients and the browser.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Json, Path, Query, State};
use axum::http::header::SET_COOKIE;
use axum::http::HeaderMap;
use axum::response::{AppendHeaders, IntoResponse, Redirect, Response};
use uuid::Uuid;

use crate::adapters::http::cookies::{
    clear_cookie, cookie_value, set_cookie, ACCESS_TOKEN_COOKIE, CODE_VERIFIER_COOKIE,
    CODE_VERIFIER_MAX_AGE_SECS, REFRESH_TOKEN_COOKIE, REFRESH_TOKEN_MAX_AGE_SECS,
};
use crate::adapters::http::error::ApiError;
use crate::adapters::http::middleware::{RequireAuth, SessionToken};
use crate::adapters::http::state::AppState;
use crate::ports::{code_challenge, AuthSession, Credentials, SignUpOutcome, UserAttributes};

use super::dto::{CallbackParams, RecoverRequest, RefreshRequest, SuccessResponse};

const DEFAULT_NEXT: &str = "/dashboard";
const LOGIN_PATH: &str = "/login";
const LOGIN_FAILED_PATH: &str = "/login?error=auth-failed";
const PASSWORD_RESET_PATH: &str = "/reset-password";

// ════════════════════════════════════════════════════════════════════════════════
// Helpers
// ════════════════════════════════════════════════════════════════════════════════

fn session_cookies(state: &AppState, session: &AuthSession) -> [(axum::http::HeaderName, String); 2] {
    [
        (
            SET_COOKIE,
            set_cookie(
                ACCESS_TOKEN_COOKIE,
                &session.access_token,
                session.expires_in,
                state.secure_cookies,
            ),
        ),
        (
            SET_COOKIE,
            set_cookie(
                REFRESH_TOKEN_COOKIE,
                &session.refresh_token,
                REFRESH_TOKEN_MAX_AGE_SECS,
                state.secure_cookies,
            ),
        ),
    ]
}

fn credentials(body: Result<Json<Credentials>, JsonRejection>) -> Result<Credentials, ApiError> {
    let Json(credentials) =
        body.map_err(|_| ApiError::bad_request("Email and password are required"))?;
    if credentials.email.trim().is_empty() || credentials.password.is_empty() {
        return Err(ApiError::bad_request("Email and password are required"));
    }
    Ok(credentials)
}

/// Only same-site paths are followed after sign-in.
fn safe_next(next: Option<&str>) -> &str {
    match next {
        Some(path) if path.starts_with('/') && !path.starts_with("//") => path,
        _ => DEFAULT_NEXT,
    }
}

/// 64 characters from the PKCE unreserved set.
fn new_code_verifier() -> String {
    format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple())
}

/// Keeps the verifier until the emailed link or OAuth redirect comes back.
fn verifier_cookie(state: &AppState, verifier: &str) -> (axum::http::HeaderName, String) {
    (
        SET_COOKIE,
        set_cookie(
            CODE_VERIFIER_COOKIE,
            verifier,
            CODE_VERIFIER_MAX_AGE_SECS,
            state.secure_cookies,
        ),
    )
}

// ════════════════════════════════════════════════════════════════════════════════
// JSON endpoints
// ════════════════════════════════════════════════════════════════════════════════

/// POST /api/auth/signup
pub async fn sign_up(
    State(state): State<AppState>,
    body: Result<Json<Credentials>, JsonRejection>,
) -> Result<Response, ApiError> {
    let credentials = credentials(body)?;
    let verifier = new_code_verifier();
    let outcome = state
        .auth_provider
        .sign_up(&credentials, &code_challenge(&verifier))
        .await?;

    let response = match &outcome {
        SignUpOutcome::SignedIn { session } => {
            tracing::info!(user_id = %session.user.id, "User signed up");
            (AppendHeaders(session_cookies(&state, session)), Json(&outcome)).into_response()
        }
        SignUpOutcome::ConfirmationRequired { user } => {
            tracing::info!(user_id = %user.id, "User signed up, confirmation pending");
            (AppendHeaders([verifier_cookie(&state, &verifier)]), Json(&outcome)).into_response()
        }
    };
    Ok(response)
}

/// POST /api/auth/login
pub async fn sign_in(
    State(state): State<AppState>,
    body: Result<Json<Credentials>, JsonRejection>,
) -> Result<Response, ApiError> {
    let credentials = credentials(body)?;
    let session = state
        .auth_provider
        .sign_in_with_password(&credentials)
        .await?;

    tracing::info!(user_id = %session.user.id, "User signed in");
    Ok((AppendHeaders(session_cookies(&state, &session)), Json(session)).into_response())
}

/// POST /api/auth/refresh
pub async fn refresh(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Option<Json<RefreshRequest>>,
) -> Result<Response, ApiError> {
    let Json(request) = body.unwrap_or_default();
    let refresh_token = request
        .refresh_token
        .filter(|t| !t.is_empty())
        .or_else(|| cookie_value(&headers, REFRESH_TOKEN_COOKIE))
        .ok_or_else(|| ApiError::bad_request("Refresh token is required"))?;

    let session = state.auth_provider.refresh_session(&refresh_token).await?;
    Ok((AppendHeaders(session_cookies(&state, &session)), Json(session)).into_response())
}

/// POST /api/auth/recover - Email a password reset link
///
/// The link returns through the callback, which needs this browser's verifier.
pub async fn recover(
    State(state): State<AppState>,
    body: Result<Json<RecoverRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let email = body
        .ok()
        .map(|Json(r)| r.email)
        .filter(|e| !e.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request("Email is required"))?;

    let redirect_to = format!("{}?next={}", state.auth_callback_url(), PASSWORD_RESET_PATH);
    let verifier = new_code_verifier();
    state
        .auth_provider
        .send_password_reset(email.trim(), &redirect_to, &code_challenge(&verifier))
        .await?;
    Ok((
        AppendHeaders([verifier_cookie(&state, &verifier)]),
        Json(SuccessResponse::ok()),
    )
        .into_response())
}

/// POST /api/auth/logout
///
/// Cookies are cleared even when the platform call fails.
pub async fn sign_out(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Some(token) = SessionToken::from_headers(&headers) {
        if let Err(e) = state.auth_provider.sign_out(token.as_str()).await {
            tracing::warn!(error = %e, "Sign-out at the auth platform failed");
        }
    }

    (
        AppendHeaders([
            (SET_COOKIE, clear_cookie(ACCESS_TOKEN_COOKIE)),
            (SET_COOKIE, clear_cookie(REFRESH_TOKEN_COOKIE)),
        ]),
        Json(SuccessResponse::ok()),
    )
        .into_response()
}

/// PUT /api/auth/user - Change email or password
pub async fn update_user(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    headers: HeaderMap,
    body: Result<Json<UserAttributes>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(attributes) = body.map_err(|_| ApiError::bad_request("Invalid user attributes"))?;
    if attributes.is_empty() {
        return Err(ApiError::bad_request("Nothing to update"));
    }
    let token = SessionToken::from_headers(&headers).ok_or_else(ApiError::unauthorized)?;

    let updated = state
        .auth_provider
        .update_user(token.as_str(), &attributes)
        .await?;

    tracing::info!(user_id = %user.id, "User credentials updated");
    Ok(Json(updated).into_response())
}

// ════════════════════════════════════════════════════════════════════════════════
// Browser redirects
// ════════════════════════════════════════════════════════════════════════════════

/// GET /api/auth/oauth/:provider - Start an OAuth sign-in
pub async fn oauth_start(
    State(state): State<AppState>,
    Path(provider): Path<String>,
) -> Result<Response, ApiError> {
    if provider.is_empty() || !provider.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(ApiError::bad_request("Unsupported provider"));
    }

    let verifier = new_code_verifier();
    let url = state.auth_provider.authorize_url(
        &provider,
        &state.auth_callback_url(),
        &code_challenge(&verifier),
    );

    Ok((
        AppendHeaders([verifier_cookie(&state, &verifier)]),
        Redirect::to(&url),
    )
        .into_response())
}

/// GET /auth/callback?code=&next= - Finish OAuth, magic-link and recovery flows
pub async fn auth_callback(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<CallbackParams>,
) -> Response {
    let Some(code) = params.code.filter(|c| !c.is_empty()) else {
        return Redirect::to(LOGIN_PATH).into_response();
    };
    let verifier = cookie_value(&headers, CODE_VERIFIER_COOKIE);

    match state
        .auth_provider
        .exchange_code_for_session(&code, verifier.as_deref())
        .await
    {
        Ok(session) => {
            tracing::info!(user_id = %session.user.id, "Auth callback completed");
            let [access, refresh] = session_cookies(&state, &session);
            (
                AppendHeaders([
                    access,
                    refresh,
                    (SET_COOKIE, clear_cookie(CODE_VERIFIER_COOKIE)),
                ]),
                Redirect::to(safe_next(params.next.as_deref())),
            )
                .into_response()
        }
        Err(e) => {
            tracing::warn!(error = %e, "Auth code exchange failed");
            Redirect::to(LOGIN_FAILED_PATH).into_response()
        }
    }
}
