//! Authentication configuration

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use super::error::ValidationError;
use super::server::Environment;

/// Authentication configuration (hosted GoTrue auth platform)
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Project URL of the auth platform, e.g. `https://xyz.supabase.co`
    pub platform_url: String,

    /// Public (anon) API key sent as the `apikey` header
    pub anon_key: SecretString,

    /// Secret the platform signs access tokens with (HS256)
    pub jwt_secret: SecretString,

    /// Expected `aud` claim
    #[serde(default = "default_audience")]
    pub jwt_audience: String,

    /// Public URL of the web app, used for OAuth and recovery redirects
    #[serde(default = "default_site_url")]
    pub site_url: String,
}

impl AuthConfig {
    pub fn new(
        platform_url: impl Into<String>,
        anon_key: impl Into<String>,
        jwt_secret: impl Into<String>,
    ) -> Self {
        Self {
            platform_url: platform_url.into(),
            anon_key: SecretString::new(anon_key.into()),
            jwt_secret: SecretString::new(jwt_secret.into()),
            jwt_audience: default_audience(),
            site_url: default_site_url(),
        }
    }

    /// Issuer the platform writes into its tokens.
    pub fn issuer(&self) -> String {
        format!("{}/auth/v1", self.platform_url.trim_end_matches('/'))
    }

    /// Validate authentication configuration
    ///
    /// In production the platform URL must use HTTPS.
    pub fn validate(&self, environment: &Environment) -> Result<(), ValidationError> {
        if self.platform_url.is_empty() {
            return Err(ValidationError::MissingRequired("AUTH__PLATFORM_URL"));
        }
        if self.anon_key.expose_secret().is_empty() {
            return Err(ValidationError::MissingRequired("AUTH__ANON_KEY"));
        }
        if self.jwt_secret.expose_secret().len() < 32 {
            return Err(ValidationError::JwtSecretTooShort);
        }
        if *environment == Environment::Production && !self.platform_url.starts_with("https://")
        {
            return Err(ValidationError::AuthUrlMustBeHttps);
        }
        Ok(())
    }
}

fn default_audience() -> String {
    "authenticated".to_string()
}

fn default_site_url() -> String {
    "http://localhost:3000".to_string()
}
