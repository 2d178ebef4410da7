//! Payment configuration

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use super::error::ValidationError;

/// Payment configuration (Stripe)
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentConfig {
    /// Stripe secret API key
    pub stripe_api_key: SecretString,

    /// Stripe webhook signing secret
    pub stripe_webhook_secret: SecretString,

    /// Stripe API base URL (overridable for stripe-mock)
    #[serde(default = "default_api_base_url")]
    pub stripe_api_base_url: String,

    /// Reject test-mode webhook events
    #[serde(default)]
    pub require_livemode: bool,
}

impl PaymentConfig {
    pub fn new(api_key: impl Into<String>, webhook_secret: impl Into<String>) -> Self {
        Self {
            stripe_api_key: SecretString::new(api_key.into()),
            stripe_webhook_secret: SecretString::new(webhook_secret.into()),
            stripe_api_base_url: default_api_base_url(),
            require_livemode: false,
        }
    }

    /// Check if using Stripe test mode
    pub fn is_test_mode(&self) -> bool {
        self.stripe_api_key.expose_secret().starts_with("sk_test_")
    }

    /// First eight characters of the API key, safe to show in diagnostics.
    pub fn key_prefix(&self) -> String {
        let prefix: String = self.stripe_api_key.expose_secret().chars().take(8).collect();
        format!("{}...", prefix)
    }

    /// Validate payment configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        let api_key = self.stripe_api_key.expose_secret();
        let webhook_secret = self.stripe_webhook_secret.expose_secret();

        if api_key.is_empty() {
            return Err(ValidationError::MissingRequired("PAYMENT__STRIPE_API_KEY"));
        }
        if webhook_secret.is_empty() {
            return Err(ValidationError::MissingRequired(
                "PAYMENT__STRIPE_WEBHOOK_SECRET",
            ));
        }
        if !api_key.starts_with("sk_") && !api_key.starts_with("rk_") {
            return Err(ValidationError::InvalidStripeKey);
        }
        if !webhook_secret.starts_with("whsec_") {
            return Err(ValidationError::InvalidStripeWebhookSecret);
        }

        Ok(())
    }
}

fn default_api_base_url() -> String {
    "https://api.stripe.com".to_string()
}
