//! JSON error responses.
//!
//! Every failure leaves the API as `{error, details?}`. Domain errors are
//! mapped to a status code and a client-facing message here; internal causes
//! go to the log and, for billing failures, into `details`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::application::handlers::WebhookError;
use crate::domain::account::AccountError;
use crate::domain::foundation::AuthError;
use crate::domain::profile::ProfileError;
use crate::domain::subscription::BillingError;

/// Error body returned by every endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: None,
        }
    }

    pub fn with_details(error: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: Some(details.into()),
        }
    }
}

/// An error ready to be sent to the client.
#[derive(Debug, Clone)]
pub struct ApiError {
    status: StatusCode,
    body: ErrorResponse,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            body: ErrorResponse::new(message),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized() -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "Not authenticated")
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn body(&self) -> &ErrorResponse {
        &self.body
    }

    /// Maps a billing failure. Client errors keep their own message; anything
    /// else becomes a 500 with `failure` as the message and the cause in
    /// `details`.
    pub fn billing(failure: &'static str, err: BillingError) -> Self {
        match &err {
            BillingError::Forbidden => Self::new(StatusCode::FORBIDDEN, err.to_string()),
            e if e.is_client_error() => Self::bad_request(e.to_string()),
            _ => {
                tracing::error!(error = %err, "{}", failure);
                Self {
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                    body: ErrorResponse::with_details(failure, err.to_string()),
                }
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

impl From<ProfileError> for ApiError {
    fn from(err: ProfileError) -> Self {
        match &err {
            ProfileError::InvalidUpdate(reason) => {
                tracing::debug!(reason = %reason, "Rejected profile update");
                Self::bad_request(err.public_message())
            }
            _ => {
                tracing::error!(error = %err, "Profile request failed");
                Self::internal(err.public_message())
            }
        }
    }
}

impl From<AccountError> for ApiError {
    fn from(err: AccountError) -> Self {
        let status = match &err {
            AccountError::MissingUserId | AccountError::InvalidUserId(_) => StatusCode::BAD_REQUEST,
            AccountError::Forbidden => StatusCode::FORBIDDEN,
            AccountError::SoftDeleteFailed(_) | AccountError::ExportFailed(_) => {
                tracing::error!(error = %err, "Account request failed");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        Self::new(status, err.public_message())
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Rejected(message) => Self::bad_request(message),
            AuthError::InvalidToken | AuthError::TokenExpired => {
                Self::new(StatusCode::UNAUTHORIZED, err.to_string())
            }
            AuthError::InsufficientPermissions => Self::new(StatusCode::FORBIDDEN, err.to_string()),
            AuthError::ServiceUnavailable(message) => {
                tracing::error!(error = %message, "Auth platform unavailable");
                Self::new(
                    StatusCode::SERVICE_UNAVAILABLE,
                    "Authentication service unavailable",
                )
            }
        }
    }
}

/// Webhook failures are all 400 so the processor redelivers.
impl From<WebhookError> for ApiError {
    fn from(err: WebhookError) -> Self {
        match err {
            WebhookError::InvalidSignature(_) => {
                Self::bad_request("Webhook signature verification failed")
            }
            WebhookError::HandlerFailed(BillingError::InvalidSessionData) => {
                Self::bad_request(BillingError::InvalidSessionData.to_string())
            }
            WebhookError::HandlerFailed(_) => Self::bad_request("Webhook handler failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::subscription::SubscriptionStatus;

    #[test]
    fn error_response_omits_absent_details() {
        let json = serde_json::to_string(&ErrorResponse::new("Not authenticated")).unwrap();
        assert_eq!(json, r#"{"error":"Not authenticated"}"#);
    }

    #[test]
    fn error_response_includes_details_when_present() {
        let body = ErrorResponse::with_details("Failed to sync subscription", "Invalid customer");
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["details"], "Invalid customer");
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Billing
    // ════════════════════════════════════════════════════════════════════════════

    #[test]
    fn missing_subscription_id_is_bad_request() {
        let err = ApiError::billing("Failed to cancel subscription", BillingError::MissingSubscriptionId);
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.body().error, "Subscription ID is required");
    }

    #[test]
    fn not_cancelable_keeps_its_message() {
        let err = ApiError::billing(
            "Failed to cancel subscription",
            BillingError::NotCancelable(SubscriptionStatus::PastDue),
        );
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            err.body().error,
            "Subscription cannot be canceled in its current state"
        );
    }

    #[test]
    fn foreign_subscription_is_forbidden() {
        let err = ApiError::billing("Failed to cancel subscription", BillingError::Forbidden);
        assert_eq!(err.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn provider_failure_uses_action_message_with_details() {
        let err = ApiError::billing(
            "Failed to reactivate subscription",
            BillingError::payment_provider("timeout"),
        );
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.body().error, "Failed to reactivate subscription");
        assert_eq!(
            err.body().details.as_deref(),
            Some("Payment provider error: timeout")
        );
    }

    #[test]
    fn invalid_customer_on_sync_is_server_error() {
        let err = ApiError::billing("Failed to sync subscription", BillingError::InvalidCustomer);
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.body().details.as_deref(), Some("Invalid customer"));
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Profile / Account / Auth / Webhook
    // ════════════════════════════════════════════════════════════════════════════

    #[test]
    fn profile_errors_use_public_messages() {
        let invalid = ApiError::from(ProfileError::InvalidUpdate("bio too long".into()));
        assert_eq!(invalid.status(), StatusCode::BAD_REQUEST);
        assert_eq!(invalid.body().error, "Invalid update data");

        let failed = ApiError::from(ProfileError::FetchFailed("pool timed out".into()));
        assert_eq!(failed.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(failed.body().error, "Failed to fetch profile");
        assert!(failed.body().details.is_none());
    }

    #[test]
    fn account_errors_map_to_status() {
        assert_eq!(
            ApiError::from(AccountError::MissingUserId).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(AccountError::Forbidden).status(),
            StatusCode::FORBIDDEN
        );

        let failed = ApiError::from(AccountError::SoftDeleteFailed("db down".into()));
        assert_eq!(failed.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(failed.body().error, "Failed to update profile");
    }

    #[test]
    fn auth_errors_map_to_status() {
        let rejected = ApiError::from(AuthError::rejected("Invalid login credentials"));
        assert_eq!(rejected.status(), StatusCode::BAD_REQUEST);
        assert_eq!(rejected.body().error, "Invalid login credentials");

        let unavailable = ApiError::from(AuthError::service_unavailable("connect refused"));
        assert_eq!(unavailable.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn webhook_errors_are_all_bad_request() {
        let signature = ApiError::from(WebhookError::InvalidSignature("bad".into()));
        assert_eq!(signature.status(), StatusCode::BAD_REQUEST);
        assert_eq!(signature.body().error, "Webhook signature verification failed");

        let session = ApiError::from(WebhookError::HandlerFailed(BillingError::InvalidSessionData));
        assert_eq!(session.body().error, "Invalid session data");

        let failed = ApiError::from(WebhookError::HandlerFailed(BillingError::infrastructure("x")));
        assert_eq!(failed.status(), StatusCode::BAD_REQUEST);
        assert_eq!(failed.body().error, "Webhook handler failed");

        let unparseable = ApiError::from(WebhookError::HandlerFailed(BillingError::InvalidEvent(
            "Unknown subscription status: on_hold".into(),
        )));
        assert_eq!(unparseable.status(), StatusCode::BAD_REQUEST);
        assert_eq!(unparseable.body().error, "Webhook handler failed");
    }
}
