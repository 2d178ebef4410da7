//! Authentication middleware and extractors for axum.
//!
//! This module provides:
//! - `auth_middleware` - Layer that validates access tokens and injects the user into extensions
//! - `RequireAuth` - Extractor that requires authentication
//! - `OptionalAuth` - Extractor for optional authentication
//!
//! # Architecture
//!
//! The middleware uses the `SessionValidator` port, keeping it provider-agnostic.
//! Whether using the hosted auth platform or a mock for testing, the middleware
//! doesn't change.
//!
//! ```text
//! Request → auth_middleware → injects AuthenticatedUser into extensions
//!                                      ↓
//!                              Handler → RequireAuth extractor reads from extensions
//! ```
//!
//! # Example
//!
//! ```ignore
//! use axum::{Router, routing::get, middleware};
//! use std::sync::Arc;
//!
//! let validator: Arc<dyn SessionValidator> = Arc::new(MockSessionValidator::new());
//!
//! let app = Router::new()
//!     .route("/api/protected", get(protected_handler))
//!     .layer(middleware::from_fn_with_state(validator.clone(), auth_middleware));
//!
//! async fn protected_handler(RequireAuth(user): RequireAuth) -> String {
//!     format!("Hello, {}!", user.email)
//! }
//! ```

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};

use crate::adapters::http::cookies::{cookie_value, ACCESS_TOKEN_COOKIE};
use crate::adapters::http::error::ErrorResponse;
use crate::domain::foundation::{AuthError, AuthenticatedUser};
use crate::ports::SessionValidator;

/// Auth middleware state - wraps the session validator.
pub type AuthState = Arc<dyn SessionValidator>;

/// Where a request's access token came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionToken {
    /// `Authorization: Bearer <token>`
    Bearer(String),
    /// The `sb-access-token` cookie set by the browser sign-in flow.
    Cookie(String),
}

impl SessionToken {
    /// Reads the token from the request headers. The `Authorization` header
    /// wins over the cookie.
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        let bearer = headers
            .get("Authorization")
            .and_then(|h| h.to_str().ok())
            .and_then(|h| h.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty());

        match bearer {
            Some(token) => Some(SessionToken::Bearer(token.to_string())),
            None => cookie_value(headers, ACCESS_TOKEN_COOKIE).map(SessionToken::Cookie),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            SessionToken::Bearer(token) | SessionToken::Cookie(token) => token,
        }
    }
}

/// Authentication middleware that validates access tokens.
///
/// This middleware:
/// 1. Extracts the token from the Authorization header or the session cookie
/// 2. Validates the token using the `SessionValidator` port
/// 3. On success, injects `AuthenticatedUser` into request extensions
/// 4. On missing token, continues without injecting (for public routes)
/// 5. On an invalid Bearer token, returns 401 Unauthorized
///
/// A stale session cookie is treated like a missing token so that public
/// routes such as sign-in keep working in a browser that still carries it.
pub async fn auth_middleware(
    State(validator): State<AuthState>,
    mut request: Request,
    next: Next,
) -> Response {
    let Some(token) = SessionToken::from_headers(request.headers()) else {
        // Handlers use RequireAuth to enforce authentication
        return next.run(request).await;
    };

    match validator.validate(token.as_str()).await {
        Ok(user) => {
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        Err(AuthError::ServiceUnavailable(msg)) => {
            tracing::error!("Auth service unavailable: {}", msg);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ErrorResponse::new("Authentication service unavailable")),
            )
                .into_response()
        }
        Err(e) => match token {
            SessionToken::Cookie(_) => {
                tracing::debug!(error = %e, "Ignoring invalid session cookie");
                next.run(request).await
            }
            SessionToken::Bearer(_) => {
                let message = match e {
                    AuthError::TokenExpired => "Token expired",
                    AuthError::InvalidToken => "Invalid token",
                    _ => "Authentication failed",
                };
                (StatusCode::UNAUTHORIZED, Json(ErrorResponse::new(message))).into_response()
            }
        },
    }
}

/// Extractor that requires authentication.
///
/// If no user is in the request extensions (i.e., auth middleware didn't
/// successfully validate a token), returns 401 `{"error":"Not authenticated"}`.
#[derive(Debug, Clone)]
pub struct RequireAuth(pub AuthenticatedUser);

impl<S> axum::extract::FromRequestParts<S> for RequireAuth
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    fn from_request_parts<'life0, 'life1, 'async_trait>(
        parts: &'life0 mut axum::http::request::Parts,
        _state: &'life1 S,
    ) -> std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self, Self::Rejection>> + Send + 'async_trait>,
    >
    where
        'life0: 'async_trait,
        'life1: 'async_trait,
        Self: 'async_trait,
    {
        Box::pin(async move {
            parts
                .extensions
                .get::<AuthenticatedUser>()
                .cloned()
                .map(RequireAuth)
                .ok_or(AuthRejection::Unauthenticated)
        })
    }
}

/// Extractor for optional authentication.
///
/// Returns `None` if no valid token was provided, `Some(user)` if authenticated.
#[derive(Debug, Clone)]
pub struct OptionalAuth(pub Option<AuthenticatedUser>);

impl<S> axum::extract::FromRequestParts<S> for OptionalAuth
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    fn from_request_parts<'life0, 'life1, 'async_trait>(
        parts: &'life0 mut axum::http::request::Parts,
        _state: &'life1 S,
    ) -> std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self, Self::Rejection>> + Send + 'async_trait>,
    >
    where
        'life0: 'async_trait,
        'life1: 'async_trait,
        Self: 'async_trait,
    {
        Box::pin(async move {
            let user = parts.extensions.get::<AuthenticatedUser>().cloned();
            Ok(OptionalAuth(user))
        })
    }
}

/// Rejection type for authentication failures.
#[derive(Debug, Clone)]
pub enum AuthRejection {
    /// No valid authentication token was provided.
    Unauthenticated,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            AuthRejection::Unauthenticated => (
                StatusCode::UNAUTHORIZED,
                Json(ErrorResponse::new("Not authenticated")),
            )
                .into_response(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::auth::MockSessionValidator;
    use crate::domain::foundation::UserId;
    use axum::body::Body;
    use axum::http::{header, HeaderValue};
    use axum::routing::get;
    use axum::Router;
    use tower::ServiceExt;

    fn test_user() -> AuthenticatedUser {
        AuthenticatedUser::new(
            UserId::new(),
            "test@example.com",
            Some("Test User".to_string()),
        )
    }

    async fn whoami(OptionalAuth(user): OptionalAuth) -> String {
        user.map(|u| u.email).unwrap_or_else(|| "anonymous".to_string())
    }

    fn app(validator: MockSessionValidator) -> Router {
        let state: AuthState = Arc::new(validator);
        Router::new()
            .route("/whoami", get(whoami))
            .layer(axum::middleware::from_fn_with_state(state, auth_middleware))
    }

    async fn body_text(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Token Extraction Tests
    // ════════════════════════════════════════════════════════════════════════════

    #[test]
    fn bearer_header_is_preferred_over_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert("Authorization", HeaderValue::from_static("Bearer header-token"));
        headers.insert(header::COOKIE, HeaderValue::from_static("sb-access-token=cookie-token"));

        assert_eq!(
            SessionToken::from_headers(&headers),
            Some(SessionToken::Bearer("header-token".into()))
        );
    }

    #[test]
    fn cookie_is_used_without_bearer_header() {
        let mut headers = HeaderMap::new();
        headers.insert("Authorization", HeaderValue::from_static("Basic dXNlcjpwYXNz"));
        headers.insert(header::COOKIE, HeaderValue::from_static("sb-access-token=cookie-token"));

        assert_eq!(
            SessionToken::from_headers(&headers),
            Some(SessionToken::Cookie("cookie-token".into()))
        );
    }

    #[test]
    fn no_token_without_header_or_cookie() {
        assert!(SessionToken::from_headers(&HeaderMap::new()).is_none());
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Middleware Tests
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn valid_bearer_token_injects_user() {
        let app = app(MockSessionValidator::new().with_user("valid-token", test_user()));

        let response = app
            .oneshot(
                axum::http::Request::get("/whoami")
                    .header("Authorization", "Bearer valid-token")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "test@example.com");
    }

    #[tokio::test]
    async fn valid_cookie_injects_user() {
        let app = app(MockSessionValidator::new().with_user("valid-token", test_user()));

        let response = app
            .oneshot(
                axum::http::Request::get("/whoami")
                    .header(header::COOKIE, "sb-access-token=valid-token")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(body_text(response).await, "test@example.com");
    }

    #[tokio::test]
    async fn invalid_bearer_token_is_rejected() {
        let app = app(MockSessionValidator::new());

        let response = app
            .oneshot(
                axum::http::Request::get("/whoami")
                    .header("Authorization", "Bearer nope")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_text(response).await, r#"{"error":"Invalid token"}"#);
    }

    #[tokio::test]
    async fn stale_cookie_is_treated_as_anonymous() {
        let app = app(MockSessionValidator::new());

        let response = app
            .oneshot(
                axum::http::Request::get("/whoami")
                    .header(header::COOKIE, "sb-access-token=expired")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "anonymous");
    }

    #[tokio::test]
    async fn unavailable_validator_returns_503() {
        let app = app(
            MockSessionValidator::new()
                .with_error(AuthError::service_unavailable("jwks fetch failed")),
        );

        let response = app
            .oneshot(
                axum::http::Request::get("/whoami")
                    .header("Authorization", "Bearer anything")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Extractor Tests
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn require_auth_extracts_user_from_extensions() {
        use axum::extract::FromRequestParts;

        let mut request: axum::http::Request<()> =
            axum::http::Request::builder().uri("/test").body(()).unwrap();
        request.extensions_mut().insert(test_user());
        let (mut parts, _body) = request.into_parts();

        let result: Result<RequireAuth, AuthRejection> =
            RequireAuth::from_request_parts(&mut parts, &()).await;

        let RequireAuth(user) = result.unwrap();
        assert_eq!(user.email, "test@example.com");
    }

    #[tokio::test]
    async fn require_auth_fails_without_user() {
        use axum::extract::FromRequestParts;

        let request: axum::http::Request<()> =
            axum::http::Request::builder().uri("/test").body(()).unwrap();
        let (mut parts, _body) = request.into_parts();

        let result: Result<RequireAuth, AuthRejection> =
            RequireAuth::from_request_parts(&mut parts, &()).await;

        assert!(matches!(result, Err(AuthRejection::Unauthenticated)));
    }

    #[tokio::test]
    async fn auth_rejection_is_401_not_authenticated() {
        let response = AuthRejection::Unauthenticated.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_text(response).await, r#"{"error":"Not authenticated"}"#);
    }

    #[test]
    fn extractors_are_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<AuthState>();
        assert_send_sync::<RequireAuth>();
        assert_send_sync::<OptionalAuth>();
    }
}
