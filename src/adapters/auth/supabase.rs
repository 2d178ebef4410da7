//! Supabase (GoTrue) auth adapters.
//!
//! - [`SupabaseSessionValidator`] checks access tokens locally. The platform
//!   signs them with HS256 using the project's JWT secret, so no network
//!   round-trip is needed per request.
//! - [`SupabaseAuthProvider`] talks to the GoTrue REST API for everything
//!   that issues or revokes sessions.
//!
//! # Security
//!
//! Tokens are accepted only when all of these hold:
//! - **Signature**: HS256 with the configured secret
//! - **Issuer (iss)**: `{platform_url}/auth/v1`
//! - **Audience (aud)**: contains the configured audience (`authenticated`)
//! - **Expiry (exp)**: in the future

use async_trait::async_trait;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::config::AuthConfig;
use crate::domain::foundation::{AuthError, AuthenticatedUser, UserId};
use crate::ports::{
    AuthProvider, AuthSession, AuthUser, Credentials, SessionValidator, SignUpOutcome,
    UserAttributes, CODE_CHALLENGE_METHOD,
};

// ════════════════════════════════════════════════════════════════════════════════
// Session validation
// ════════════════════════════════════════════════════════════════════════════════

/// JWT claims written by the auth platform.
#[derive(Debug, Serialize, Deserialize)]
struct SupabaseClaims {
    /// Subject - the user UUID
    sub: String,

    exp: i64,

    #[serde(default)]
    aud: Audience,

    #[serde(default)]
    iss: Option<String>,

    #[serde(default)]
    email: Option<String>,

    #[serde(default)]
    user_metadata: UserMetadata,
}

/// Free-form metadata the user (or an OAuth provider) attached.
#[derive(Debug, Default, Serialize, Deserialize)]
struct UserMetadata {
    #[serde(default)]
    full_name: Option<String>,

    #[serde(default)]
    name: Option<String>,
}

/// Audience can be a single string or array of strings in JWTs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(untagged)]
enum Audience {
    #[default]
    None,
    Single(String),
    Multiple(Vec<String>),
}

/// Validates platform-issued HS256 access tokens.
pub struct SupabaseSessionValidator {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl SupabaseSessionValidator {
    pub fn new(config: &AuthConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[&config.jwt_audience]);
        validation.set_issuer(&[config.issuer()]);
        validation.set_required_spec_claims(&["exp", "sub", "aud"]);

        Self {
            decoding_key: DecodingKey::from_secret(config.jwt_secret.expose_secret().as_bytes()),
            validation,
        }
    }
}

#[async_trait]
impl SessionValidator for SupabaseSessionValidator {
    async fn validate(&self, token: &str) -> Result<AuthenticatedUser, AuthError> {
        let token_data =
            decode::<SupabaseClaims>(token, &self.decoding_key, &self.validation).map_err(|e| {
                use jsonwebtoken::errors::ErrorKind;
                match e.kind() {
                    ErrorKind::ExpiredSignature => {
                        tracing::debug!("Token expired");
                        AuthError::TokenExpired
                    }
                    ErrorKind::InvalidIssuer | ErrorKind::InvalidAudience => {
                        tracing::warn!("Token issued for another project: {}", e);
                        AuthError::InvalidToken
                    }
                    _ => {
                        tracing::debug!("Token validation failed: {}", e);
                        AuthError::InvalidToken
                    }
                }
            })?;
        let claims = token_data.claims;

        let user_id = UserId::parse(&claims.sub).map_err(|_| {
            tracing::warn!(sub = %claims.sub, "Token subject is not a user UUID");
            AuthError::InvalidToken
        })?;

        let UserMetadata { full_name, name } = claims.user_metadata;

        Ok(AuthenticatedUser::new(
            user_id,
            claims.email.unwrap_or_default(),
            full_name.or(name),
        ))
    }
}

impl std::fmt::Debug for SupabaseSessionValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SupabaseSessionValidator")
            .field("issuer", &self.validation.iss)
            .finish_non_exhaustive()
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// GoTrue REST client
// ════════════════════════════════════════════════════════════════════════════════

/// Client for the platform's GoTrue endpoints.
pub struct SupabaseAuthProvider {
    config: AuthConfig,
    http_client: reqwest::Client,
}

impl SupabaseAuthProvider {
    pub fn new(config: AuthConfig) -> Self {
        Self {
            config,
            http_client: reqwest::Client::new(),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.config.issuer(), path)
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        self.http_client
            .request(method, self.endpoint(path))
            .header("apikey", self.config.anon_key.expose_secret())
    }

    fn token_request(&self, grant_type: &str) -> reqwest::RequestBuilder {
        self.request(reqwest::Method::POST, "token")
            .query(&[("grant_type", grant_type)])
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response, AuthError> {
        let response = request.send().await.map_err(|e| {
            tracing::error!(error = %e, "Auth platform unreachable");
            AuthError::service_unavailable(e.to_string())
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(platform_error(status, &body))
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, AuthError> {
        self.send(request).await?.json().await.map_err(|e| {
            AuthError::service_unavailable(format!("Unexpected auth platform response: {}", e))
        })
    }
}

/// Maps a GoTrue error response. Client errors carry the platform's message
/// so callers can show it; server errors are reported as unavailability.
fn platform_error(status: reqwest::StatusCode, body: &str) -> AuthError {
    let message = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            ["error_description", "msg", "message", "error"]
                .iter()
                .find_map(|key| v.get(*key).and_then(|m| m.as_str()).map(String::from))
        })
        .unwrap_or_else(|| status.to_string());

    if status.is_client_error() {
        tracing::debug!(status = %status, message = %message, "Auth platform rejected request");
        AuthError::rejected(message)
    } else {
        tracing::error!(status = %status, message = %message, "Auth platform error");
        AuthError::service_unavailable(message)
    }
}

fn parse_error(e: serde_json::Error) -> AuthError {
    AuthError::service_unavailable(format!("Unexpected auth platform response: {}", e))
}

fn sign_up_body(credentials: &Credentials, code_challenge: &str) -> serde_json::Value {
    json!({
        "email": credentials.email,
        "password": credentials.password,
        "code_challenge": code_challenge,
        "code_challenge_method": CODE_CHALLENGE_METHOD,
    })
}

fn recover_body(email: &str, code_challenge: &str) -> serde_json::Value {
    json!({
        "email": email,
        "code_challenge": code_challenge,
        "code_challenge_method": CODE_CHALLENGE_METHOD,
    })
}

#[async_trait]
impl AuthProvider for SupabaseAuthProvider {
    async fn sign_up(
        &self,
        credentials: &Credentials,
        code_challenge: &str,
    ) -> Result<SignUpOutcome, AuthError> {
        let request = self
            .request(reqwest::Method::POST, "signup")
            .json(&sign_up_body(credentials, code_challenge));

        // With email confirmation on, the platform returns the bare user.
        let body: serde_json::Value = self.send_json(request).await?;
        if body.get("access_token").is_some() {
            let session: AuthSession = serde_json::from_value(body).map_err(parse_error)?;
            Ok(SignUpOutcome::SignedIn { session })
        } else {
            let user: AuthUser = serde_json::from_value(body).map_err(parse_error)?;
            Ok(SignUpOutcome::ConfirmationRequired { user })
        }
    }

    async fn sign_in_with_password(
        &self,
        credentials: &Credentials,
    ) -> Result<AuthSession, AuthError> {
        let request = self
            .token_request("password")
            .json(&json!({ "email": credentials.email, "password": credentials.password }));
        self.send_json(request).await
    }

    async fn refresh_session(&self, refresh_token: &str) -> Result<AuthSession, AuthError> {
        let request = self
            .token_request("refresh_token")
            .json(&json!({ "refresh_token": refresh_token }));
        self.send_json(request).await
    }

    async fn exchange_code_for_session(
        &self,
        auth_code: &str,
        code_verifier: Option<&str>,
    ) -> Result<AuthSession, AuthError> {
        let request = self
            .token_request("pkce")
            .json(&json!({ "auth_code": auth_code, "code_verifier": code_verifier }));
        self.send_json(request).await
    }

    async fn send_password_reset(
        &self,
        email: &str,
        redirect_to: &str,
        code_challenge: &str,
    ) -> Result<(), AuthError> {
        let request = self
            .request(reqwest::Method::POST, "recover")
            .query(&[("redirect_to", redirect_to)])
            .json(&recover_body(email, code_challenge));
        self.send(request).await.map(|_| ())
    }

    async fn update_user(
        &self,
        access_token: &str,
        attributes: &UserAttributes,
    ) -> Result<AuthUser, AuthError> {
        let mut body = serde_json::Map::new();
        if let Some(email) = &attributes.email {
            body.insert("email".into(), json!(email));
        }
        if let Some(password) = &attributes.password {
            body.insert("password".into(), json!(password));
        }

        let request = self
            .request(reqwest::Method::PUT, "user")
            .bearer_auth(access_token)
            .json(&body);
        self.send_json(request).await
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), AuthError> {
        let request = self
            .request(reqwest::Method::POST, "logout")
            .bearer_auth(access_token);
        self.send(request).await.map(|_| ())
    }

    fn authorize_url(&self, provider: &str, redirect_to: &str, code_challenge: &str) -> String {
        let base = self.endpoint("authorize");
        let params = [
            ("provider", provider),
            ("redirect_to", redirect_to),
            ("code_challenge", code_challenge),
            ("code_challenge_method", CODE_CHALLENGE_METHOD),
        ];
        match reqwest::Url::parse_with_params(&base, &params) {
            Ok(url) => url.to_string(),
            Err(e) => {
                tracing::error!(error = %e, base = %base, "Invalid auth platform URL");
                base
            }
        }
    }
}

impl std::fmt::Debug for SupabaseAuthProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SupabaseAuthProvider")
            .field("platform_url", &self.config.platform_url)
            .finish_non_exhaustive()
    }
}
