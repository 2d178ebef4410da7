//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! ## Billing
//!
//! - `PaymentProvider` - the payment processor (Stripe)
//! - `SubscriptionRepository` - local subscription rows
//!
//! ## Users
//!
//! - `ProfileRepository` - user profiles and settings
//! - `UserAccountRepository` - local mirror of auth users, soft deletes
//!
//! ## Authentication
//!
//! - `SessionValidator` - access token validation on every request
//! - `AuthProvider` - session issuance at the auth platform

mod auth_provider;
mod payment_provider;
mod profile_repository;
mod session_validator;
mod subscription_repository;
mod user_account_repository;

pub use auth_provider::{
    code_challenge, AuthProvider, AuthSession, AuthUser, Credentials, SignUpOutcome,
    UserAttributes, CODE_CHALLENGE_METHOD,
};
pub use payment_provider::{
    CheckoutCompletion, ConnectionCheck, Customer, PaymentError, PaymentErrorCode,
    PaymentProvider, WebhookEvent, WebhookEventData, WebhookEventType,
};
pub use profile_repository::ProfileRepository;
pub use session_validator::SessionValidator;
pub use subscription_repository::SubscriptionRepository;
pub use user_account_repository::UserAccountRepository;
