//! Request and response bodies for the billing endpoints.

use serde::{Deserialize, Serialize};

use crate::application::handlers::TestConnectionResult;
use crate::domain::subscription::Subscription;

// ════════════════════════════════════════════════════════════════════════════════
// Requests
// ════════════════════════════════════════════════════════════════════════════════

/// Body of cancel, reactivate and sync.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionActionRequest {
    #[serde(default)]
    pub subscription_id: Option<String>,
}

impl SubscriptionActionRequest {
    /// The id, or an empty string that the handlers reject as missing.
    pub fn subscription_id(self) -> String {
        self.subscription_id.unwrap_or_default()
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Responses
// ════════════════════════════════════════════════════════════════════════════════

/// `{received: true}`
#[derive(Debug, Clone, Serialize)]
pub struct WebhookReceivedResponse {
    pub received: bool,
}

/// Reply when checkout created a second subscription for a customer.
#[derive(Debug, Clone, Serialize)]
pub struct WebhookBlockedResponse {
    pub status: &'static str,
    pub message: &'static str,
}

impl WebhookBlockedResponse {
    pub fn duplicate_subscription() -> Self {
        Self {
            status: "blocked",
            message: "Customer already has an active subscription",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionActionResponse {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscription: Option<Subscription>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub already_canceled: Option<bool>,
}

impl SubscriptionActionResponse {
    pub fn success() -> Self {
        Self {
            status: "success",
            subscription: None,
            already_canceled: None,
        }
    }

    pub fn with_subscription(subscription: Subscription) -> Self {
        Self {
            subscription: Some(subscription),
            ..Self::success()
        }
    }

    pub fn already_canceled() -> Self {
        Self {
            already_canceled: Some(true),
            ..Self::success()
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionTestResponse {
    pub status: &'static str,
    pub message: &'static str,
    pub key_prefix: String,
    pub livemode: bool,
}

impl From<TestConnectionResult> for ConnectionTestResponse {
    fn from(result: TestConnectionResult) -> Self {
        Self {
            status: "success",
            message: "Stripe connection successful",
            key_prefix: result.key_prefix,
            livemode: result.livemode,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn action_request_reads_camel_case_id() {
        let req: SubscriptionActionRequest =
            serde_json::from_value(json!({"subscriptionId": "sub_1"})).unwrap();
        assert_eq!(req.subscription_id(), "sub_1");
    }

    #[test]
    fn action_request_tolerates_missing_id() {
        let req: SubscriptionActionRequest = serde_json::from_value(json!({})).unwrap();
        assert_eq!(req.subscription_id(), "");
    }

    #[test]
    fn already_canceled_response_shape() {
        let json = serde_json::to_value(SubscriptionActionResponse::already_canceled()).unwrap();
        assert_eq!(json, json!({"status": "success", "alreadyCanceled": true}));
    }

    #[test]
    fn plain_success_has_only_status() {
        let json = serde_json::to_value(SubscriptionActionResponse::success()).unwrap();
        assert_eq!(json, json!({"status": "success"}));
    }

    #[test]
    fn connection_test_response_uses_camel_case() {
        let json = serde_json::to_value(ConnectionTestResponse::from(TestConnectionResult {
            livemode: false,
            key_prefix: "sk_test_...".into(),
        }))
        .unwrap();
        assert_eq!(json["keyPrefix"], "sk_test_...");
        assert_eq!(json["message"], "Stripe connection successful");
    }
}
