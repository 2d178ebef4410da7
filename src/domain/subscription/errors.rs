//! Billing error types.
//!
//! # HTTP Status Mapping
//!
//! | Error | HTTP Status |
//! |-------|-------------|
//! | MissingSubscriptionId | 400 |
//! | NotCancelable | 400 |
//! | InvalidSessionData | 400 |
//! | InvalidEvent | 400 (webhook only) |
//! | Forbidden | 403 |
//! | NotFound | 500 (reported as a failed billing action) |
//! | InvalidCustomer | 500 |
//! | MissingUserMetadata | 500 |
//! | PaymentProvider | 500 |
//! | Infrastructure | 500 |

use thiserror::Error;

use crate::domain::foundation::{DomainError, ErrorCode};

use super::SubscriptionStatus;

/// Errors raised by billing actions and webhook reconciliation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BillingError {
    #[error("Subscription ID is required")]
    MissingSubscriptionId,

    #[error("Subscription {0} not found")]
    NotFound(String),

    /// Only active and trialing subscriptions can be scheduled for cancellation.
    #[error("Subscription cannot be canceled in its current state")]
    NotCancelable(SubscriptionStatus),

    /// A checkout session arrived without the user, customer or subscription.
    #[error("Invalid session data")]
    InvalidSessionData,

    /// A signed webhook whose body could not be turned into an event.
    #[error("Invalid webhook event: {0}")]
    InvalidEvent(String),

    #[error("Invalid customer")]
    InvalidCustomer,

    #[error("No user_id found in customer metadata")]
    MissingUserMetadata,

    /// The local row belongs to a different user than the caller.
    #[error("Subscription belongs to another user")]
    Forbidden,

    #[error("Payment provider error: {0}")]
    PaymentProvider(String),

    #[error("Infrastructure error: {0}")]
    Infrastructure(String),
}

impl BillingError {
    pub fn payment_provider(message: impl Into<String>) -> Self {
        BillingError::PaymentProvider(message.into())
    }

    pub fn infrastructure(message: impl Into<String>) -> Self {
        BillingError::Infrastructure(message.into())
    }

    /// Returns the error code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            BillingError::MissingSubscriptionId
            | BillingError::NotCancelable(_)
            | BillingError::InvalidSessionData
            | BillingError::InvalidEvent(_)
            | BillingError::InvalidCustomer
            | BillingError::MissingUserMetadata => ErrorCode::ValidationFailed,
            BillingError::NotFound(_) => ErrorCode::SubscriptionNotFound,
            BillingError::Forbidden => ErrorCode::Forbidden,
            BillingError::PaymentProvider(_) => ErrorCode::PaymentProviderError,
            BillingError::Infrastructure(_) => ErrorCode::DatabaseError,
        }
    }

    /// Errors the caller caused, as opposed to failures while carrying out
    /// a well-formed request.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            BillingError::MissingSubscriptionId
                | BillingError::NotCancelable(_)
                | BillingError::InvalidSessionData
                | BillingError::Forbidden
        )
    }
}

impl From<DomainError> for BillingError {
    fn from(err: DomainError) -> Self {
        BillingError::Infrastructure(err.message)
    }
}
