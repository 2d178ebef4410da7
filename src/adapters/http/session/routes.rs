//! Axum router configuration for auth endpoints.

use axum::{
    routing::{get, post, put},
    Router,
};

use crate::adapters::http::state::AppState;

use super::handlers::{
    auth_callback, oauth_start, recover, refresh, sign_in, sign_out, sign_up, update_user,
};

/// Create the auth API router, mounted at `/api/auth`.
///
/// # Routes
/// - `POST /signup`, `/login`, `/refresh`, `/recover`, `/logout`
/// - `PUT /user` - Change email or password (requires authentication)
/// - `GET /oauth/:provider` - Redirect to the OAuth provider
pub fn session_routes() -> Router<AppState> {
    Router::new()
        .route("/signup", post(sign_up))
        .route("/login", post(sign_in))
        .route("/refresh", post(refresh))
        .route("/recover", post(recover))
        .route("/logout", post(sign_out))
        .route("/user", put(update_user))
        .route("/oauth/:provider", get(oauth_start))
}

/// Browser callback, mounted at `/auth`.
pub fn callback_routes() -> Router<AppState> {
    Router::new().route("/callback", get(auth_callback))
}
