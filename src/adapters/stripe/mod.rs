//! Stripe payment provider adapter.
//!
//! Implements the `PaymentProvider` port for Stripe, including:
//! - Subscription retrieval, cancellation and reactivation
//! - Customer lookup
//! - Connectivity checks
//! - Webhook signature verification
//!
//! # Security
//!
//! - Webhook signatures use HMAC-SHA256 with constant-time comparison
//! - Timestamps are validated to prevent replay attacks (5-minute window)
//! - All secrets are handled via `secrecy::SecretString`
//!
//! # Configuration
//!
//! - `SAAS_ACCOUNT__PAYMENT__STRIPE_API_KEY`: Stripe secret API key
//! - `SAAS_ACCOUNT__PAYMENT__STRIPE_WEBHOOK_SECRET`: Webhook signing secret (whsec_...)

mod mock_payment_provider;
mod stripe_adapter;
mod webhook_types;

pub use mock_payment_provider::{MethodCall, MockPaymentProvider};
pub use stripe_adapter::StripePaymentAdapter;
pub use webhook_types::{
    hex_encode, SignatureHeader, SignatureParseError, StripeCheckoutSession, StripeCustomer,
    StripeSubscription, StripeWebhookEvent,
};
