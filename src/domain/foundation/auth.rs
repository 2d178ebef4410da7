//! Authentication types for the domain layer.
//!
//! An `AuthenticatedUser` is what remains of an access token once the
//! `SessionValidator` port has checked it. Handlers never see raw claims.

use super::UserId;
use thiserror::Error;

/// Authenticated user extracted from a validated access token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    /// The auth platform's user id (`sub` claim).
    pub id: UserId,

    /// Email address from the token claims.
    pub email: String,

    /// Full name from user metadata, when the user set one.
    pub display_name: Option<String>,
}

impl AuthenticatedUser {
    pub fn new(id: UserId, email: impl Into<String>, display_name: Option<String>) -> Self {
        Self {
            id,
            email: email.into(),
            display_name,
        }
    }

    /// Returns the user's display name, or email as fallback.
    pub fn display_name_or_email(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.email)
    }
}

/// Authentication errors from token validation and the auth platform.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// The token is missing, malformed, or has an invalid signature.
    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Token expired")]
    TokenExpired,

    /// The auth platform rejected the credentials or code.
    #[error("Authentication rejected: {0}")]
    Rejected(String),

    /// The authenticated user may not act on the requested resource.
    #[error("Insufficient permissions")]
    InsufficientPermissions,

    /// The auth platform is unreachable or misconfigured.
    #[error("Auth service unavailable: {0}")]
    ServiceUnavailable(String),
}

impl AuthError {
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected(message.into())
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::ServiceUnavailable(message.into())
    }

    /// Returns true if this error indicates the user should sign in again.
    pub fn requires_reauthentication(&self) -> bool {
        matches!(self, AuthError::InvalidToken | AuthError::TokenExpired)
    }
}
