//! Session validation port for access token validation.
//!
//! Implementations MUST validate the signature, audience and expiry of the
//! token before returning a user.

use async_trait::async_trait;

use crate::domain::foundation::{AuthError, AuthenticatedUser};

/// Validates access tokens and extracts user identity.
///
/// # Contract
///
/// - `AuthError::InvalidToken` for malformed tokens or bad signatures
/// - `AuthError::TokenExpired` for expired tokens
/// - `AuthError::ServiceUnavailable` for transient errors
#[async_trait]
pub trait SessionValidator: Send + Sync {
    /// Validate a raw access token (without the "Bearer " prefix).
    async fn validate(&self, token: &str) -> Result<AuthenticatedUser, AuthError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_validator_is_object_safe() {
        fn _accepts_dyn(_v: &dyn SessionValidator) {}
    }
}
