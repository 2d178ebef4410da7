//! Auth provider port - session issuance at the hosted auth platform.
//!
//! `SessionValidator` checks tokens on every request. This port covers the
//! rest of the session lifecycle: signing up, signing in, refreshing,
//! exchanging OAuth codes, recovering passwords and signing out.

use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::domain::foundation::AuthError;

/// Email and password credentials.
#[derive(Debug, Clone, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

/// A session issued by the auth platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthSession {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,

    /// Seconds until the access token expires.
    pub expires_in: i64,

    pub user: AuthUser,
}

/// The user as the auth platform describes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: String,
    pub email: Option<String>,
}

/// Sign-up result. With email confirmation enabled the platform returns the
/// user but no session until the address is confirmed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SignUpOutcome {
    SignedIn { session: AuthSession },
    ConfirmationRequired { user: AuthUser },
}

/// Changes to the signed-in user's credentials.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct UserAttributes {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

impl UserAttributes {
    pub fn is_empty(&self) -> bool {
        self.email.is_none() && self.password.is_none()
    }
}

/// Method name sent alongside every PKCE code challenge.
pub const CODE_CHALLENGE_METHOD: &str = "s256";

/// S256 PKCE challenge for `verifier`: the unpadded base64url SHA-256 digest.
pub fn code_challenge(verifier: &str) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()))
}

/// Port for the auth platform's session endpoints.
///
/// Flows that finish at the browser callback (email confirmation, password
/// recovery, OAuth) carry a `code_challenge` built with [`code_challenge`].
/// The matching verifier is presented to
/// [`AuthProvider::exchange_code_for_session`].
#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn sign_up(
        &self,
        credentials: &Credentials,
        code_challenge: &str,
    ) -> Result<SignUpOutcome, AuthError>;

    async fn sign_in_with_password(
        &self,
        credentials: &Credentials,
    ) -> Result<AuthSession, AuthError>;

    async fn refresh_session(&self, refresh_token: &str) -> Result<AuthSession, AuthError>;

    /// Exchanges an OAuth/magic-link authorization code for a session.
    async fn exchange_code_for_session(
        &self,
        auth_code: &str,
        code_verifier: Option<&str>,
    ) -> Result<AuthSession, AuthError>;

    /// Sends a password recovery email that links back to `redirect_to`.
    async fn send_password_reset(
        &self,
        email: &str,
        redirect_to: &str,
        code_challenge: &str,
    ) -> Result<(), AuthError>;

    /// Changes email and/or password of the user owning `access_token`.
    async fn update_user(
        &self,
        access_token: &str,
        attributes: &UserAttributes,
    ) -> Result<AuthUser, AuthError>;

    /// Revokes the session owning `access_token`.
    async fn sign_out(&self, access_token: &str) -> Result<(), AuthError>;

    /// URL that starts a PKCE OAuth sign-in with `provider` (e.g. `google`).
    fn authorize_url(&self, provider: &str, redirect_to: &str, code_challenge: &str) -> String;
}
