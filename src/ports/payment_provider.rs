//! Payment provider port - external billing service integration.
//!
//! Defines the contract for the payment processor (Stripe). The processor is
//! the source of truth for subscriptions; everything here either reads that
//! truth or asks the processor to change it.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::foundation::{DomainError, ErrorCode};
use crate::domain::subscription::SubscriptionSnapshot;

/// Port for payment processor operations.
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    /// Retrieves a subscription. Returns `Ok(None)` when the processor does
    /// not know the id.
    async fn get_subscription(
        &self,
        subscription_id: &str,
    ) -> Result<Option<SubscriptionSnapshot>, PaymentError>;

    /// Retrieves a customer, including deleted ones.
    async fn get_customer(&self, customer_id: &str) -> Result<Option<Customer>, PaymentError>;

    /// Schedules (`true`) or unschedules (`false`) cancellation at the end
    /// of the current period.
    async fn set_cancel_at_period_end(
        &self,
        subscription_id: &str,
        cancel_at_period_end: bool,
    ) -> Result<SubscriptionSnapshot, PaymentError>;

    /// Cancels a subscription immediately.
    async fn cancel_subscription_now(
        &self,
        subscription_id: &str,
    ) -> Result<SubscriptionSnapshot, PaymentError>;

    /// Performs a cheap authenticated call to prove the API key works.
    async fn check_connection(&self) -> Result<ConnectionCheck, PaymentError>;

    /// Verifies a webhook signature and parses the event.
    ///
    /// # Arguments
    ///
    /// * `payload` - Raw request body, exactly as received
    /// * `signature` - Value of the `Stripe-Signature` header
    async fn verify_webhook(
        &self,
        payload: &[u8],
        signature: &str,
    ) -> Result<WebhookEvent, PaymentError>;
}

/// Customer record from the processor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub id: String,
    pub email: Option<String>,

    /// Deleted customers are still returned by the processor with this flag.
    pub deleted: bool,

    /// Our user id, stored in the customer's metadata at checkout.
    pub user_id: Option<String>,
}

/// Result of a connectivity check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectionCheck {
    /// Whether the key talks to live or test mode.
    pub livemode: bool,
}

/// Webhook event from the processor after verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookEvent {
    /// Event id (`evt_...`).
    pub id: String,
    pub event_type: WebhookEventType,
    pub data: WebhookEventData,
    pub created_at: i64,
}

/// Webhook event types this service reacts to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookEventType {
    CheckoutSessionCompleted,
    SubscriptionCreated,
    SubscriptionUpdated,
    SubscriptionDeleted,
    SubscriptionPendingUpdateApplied,
    SubscriptionPendingUpdateExpired,
    TrialWillEnd,
    Unknown(String),
}

impl WebhookEventType {
    pub fn from_stripe(event_type: &str) -> Self {
        match event_type {
            "checkout.session.completed" => Self::CheckoutSessionCompleted,
            "customer.subscription.created" => Self::SubscriptionCreated,
            "customer.subscription.updated" => Self::SubscriptionUpdated,
            "customer.subscription.deleted" => Self::SubscriptionDeleted,
            "customer.subscription.pending_update_applied" => {
                Self::SubscriptionPendingUpdateApplied
            }
            "customer.subscription.pending_update_expired" => {
                Self::SubscriptionPendingUpdateExpired
            }
            "customer.subscription.trial_will_end" => Self::TrialWillEnd,
            other => Self::Unknown(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::CheckoutSessionCompleted => "checkout.session.completed",
            Self::SubscriptionCreated => "customer.subscription.created",
            Self::SubscriptionUpdated => "customer.subscription.updated",
            Self::SubscriptionDeleted => "customer.subscription.deleted",
            Self::SubscriptionPendingUpdateApplied => {
                "customer.subscription.pending_update_applied"
            }
            Self::SubscriptionPendingUpdateExpired => {
                "customer.subscription.pending_update_expired"
            }
            Self::TrialWillEnd => "customer.subscription.trial_will_end",
            Self::Unknown(s) => s,
        }
    }
}

/// Event-specific data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookEventData {
    /// A completed checkout session.
    Checkout(CheckoutCompletion),

    /// Any `customer.subscription.*` event.
    Subscription(SubscriptionSnapshot),

    /// Events we acknowledge without interpreting.
    Raw { json: String },
}

/// The fields of a checkout session needed to link a subscription to a user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutCompletion {
    pub session_id: String,
    pub customer_id: Option<String>,
    pub subscription_id: Option<String>,

    /// Our user id, passed to checkout as `client_reference_id`.
    pub client_reference_id: Option<String>,
}

/// Errors from payment provider operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentError {
    pub code: PaymentErrorCode,
    pub message: String,

    /// Whether the operation can be retried.
    pub retryable: bool,
}

impl PaymentError {
    pub fn new(code: PaymentErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            retryable: code.is_retryable(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::NetworkError, message)
    }

    pub fn provider(message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::ProviderError, message)
    }

    pub fn not_found(resource: &str) -> Self {
        Self::new(PaymentErrorCode::NotFound, format!("{} not found", resource))
    }

    pub fn invalid_webhook(message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::InvalidWebhook, message)
    }

    /// A correctly signed webhook whose body could not be interpreted.
    pub fn invalid_payload(message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::InvalidPayload, message)
    }
}

impl std::fmt::Display for PaymentError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for PaymentError {}

impl From<PaymentError> for DomainError {
    fn from(err: PaymentError) -> Self {
        let code = match err.code {
            PaymentErrorCode::NotFound => ErrorCode::NotFound,
            PaymentErrorCode::InvalidWebhook | PaymentErrorCode::InvalidPayload => {
                ErrorCode::ValidationFailed
            }
            _ => ErrorCode::PaymentProviderError,
        };

        DomainError::new(code, err.message)
    }
}

/// Payment error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentErrorCode {
    NetworkError,
    AuthenticationError,
    NotFound,
    RateLimitExceeded,
    InvalidWebhook,
    InvalidPayload,
    ProviderError,
}

impl PaymentErrorCode {
    /// Check if this error type is typically retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PaymentErrorCode::NetworkError | PaymentErrorCode::RateLimitExceeded
        )
    }
}

impl std::fmt::Display for PaymentErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PaymentErrorCode::NetworkError => "network_error",
            PaymentErrorCode::AuthenticationError => "authentication_error",
            PaymentErrorCode::NotFound => "not_found",
            PaymentErrorCode::RateLimitExceeded => "rate_limit_exceeded",
            PaymentErrorCode::InvalidWebhook => "invalid_webhook",
            PaymentErrorCode::InvalidPayload => "invalid_payload",
            PaymentErrorCode::ProviderError => "provider_error",
        };
        write!(f, "{}", s)
    }
}
