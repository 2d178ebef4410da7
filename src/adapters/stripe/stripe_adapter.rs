//! Stripe payment provider adapter.
//!
//! Implements the `PaymentProvider` trait against the Stripe REST API and
//! verifies webhook signatures.
//!
//! # Security
//!
//! - HMAC-SHA256 signature verification with constant-time comparison
//! - Timestamp validation (5-minute window) for replay attack prevention
//! - Secrets handled via `secrecy::SecretString`
//!
//! # Configuration
//!
//! ```ignore
//! let adapter = StripePaymentAdapter::new(config.payment.clone());
//! ```

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::config::PaymentConfig;
use crate::domain::subscription::SubscriptionSnapshot;
use crate::ports::{
    ConnectionCheck, Customer, PaymentError, PaymentErrorCode, PaymentProvider, WebhookEvent,
    WebhookEventData, WebhookEventType,
};

use super::webhook_types::{
    SignatureHeader, StripeBalance, StripeCheckoutSession, StripeCustomer,
    StripeErrorResponse, StripeSubscription, StripeWebhookEvent,
};

type HmacSha256 = Hmac<Sha256>;

/// Maximum age for webhook events (5 minutes).
const MAX_TIMESTAMP_AGE_SECS: i64 = 300;

/// Clock skew tolerance for future timestamps (60 seconds).
const MAX_FUTURE_TOLERANCE_SECS: i64 = 60;

/// Stripe payment provider adapter.
pub struct StripePaymentAdapter {
    config: PaymentConfig,
    http_client: reqwest::Client,
}

impl StripePaymentAdapter {
    pub fn new(config: PaymentConfig) -> Self {
        Self {
            config,
            http_client: reqwest::Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/v1/{}",
            self.config.stripe_api_base_url.trim_end_matches('/'),
            path
        )
    }

    /// Verify webhook signature using HMAC-SHA256.
    ///
    /// Checks the timestamp window first, then compares the expected
    /// signature against every `v1` entry in constant time.
    fn verify_signature(
        &self,
        payload: &[u8],
        header: &SignatureHeader,
    ) -> Result<(), PaymentError> {
        let now = chrono::Utc::now().timestamp();
        let Some(age) = now.checked_sub(header.timestamp) else {
            tracing::warn!(event_timestamp = header.timestamp, "Webhook timestamp out of range");
            return Err(PaymentError::invalid_webhook("Timestamp out of range"));
        };

        if age > MAX_TIMESTAMP_AGE_SECS {
            tracing::warn!(
                event_timestamp = header.timestamp,
                current_time = now,
                age_secs = age,
                "Webhook event too old - possible replay attack"
            );
            return Err(PaymentError::invalid_webhook(format!(
                "Event too old ({} seconds)",
                age
            )));
        }

        if age < -MAX_FUTURE_TOLERANCE_SECS {
            tracing::warn!(
                event_timestamp = header.timestamp,
                current_time = now,
                "Webhook event from future - clock skew or manipulation"
            );
            return Err(PaymentError::invalid_webhook("Event timestamp in future"));
        }

        let mut mac =
            HmacSha256::new_from_slice(self.config.stripe_webhook_secret.expose_secret().as_bytes())
                .map_err(|e| PaymentError::invalid_webhook(format!("Invalid signing key: {}", e)))?;
        mac.update(header.timestamp.to_string().as_bytes());
        mac.update(b".");
        mac.update(payload);
        let expected = mac.finalize().into_bytes();
        let expected_bytes: &[u8] = expected.as_slice();

        let matched = header
            .v1_signatures
            .iter()
            .any(|provided| expected_bytes.ct_eq(provided.as_slice()).unwrap_u8() == 1);

        if !matched {
            tracing::warn!(
                candidates = header.v1_signatures.len(),
                "Invalid webhook signature"
            );
            return Err(PaymentError::invalid_webhook("Invalid signature"));
        }

        Ok(())
    }

    /// Parse a Stripe event and convert to port types.
    fn parse_event(&self, payload: &[u8]) -> Result<WebhookEvent, PaymentError> {
        let stripe_event: StripeWebhookEvent = serde_json::from_slice(payload).map_err(|e| {
            tracing::warn!(error = %e, "Failed to parse webhook payload");
            PaymentError::invalid_payload(format!("Invalid JSON: {}", e))
        })?;

        if self.config.require_livemode && !stripe_event.livemode {
            tracing::warn!(
                event_id = %stripe_event.id,
                "Rejected test mode event in production"
            );
            return Err(PaymentError::invalid_payload(
                "Test mode events not allowed in production",
            ));
        }

        let event_type = WebhookEventType::from_stripe(&stripe_event.event_type);
        let data = extract_event_data(&event_type, &stripe_event)?;

        Ok(WebhookEvent {
            id: stripe_event.id,
            event_type,
            data,
            created_at: stripe_event.created,
        })
    }

    /// Sends a request and decodes the object. A 404 becomes `Ok(None)`.
    async fn send<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
        action: &str,
    ) -> Result<Option<T>, PaymentError> {
        let response = request
            .basic_auth(self.config.stripe_api_key.expose_secret(), Option::<&str>::None)
            .send()
            .await
            .map_err(|e| PaymentError::network(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, action, error = %error_text, "Stripe request failed");
            return Err(api_error(status, &error_text));
        }

        response.json().await.map(Some).map_err(|e| {
            PaymentError::provider(format!("Failed to parse Stripe response: {}", e))
        })
    }
}

fn extract_event_data(
    event_type: &WebhookEventType,
    event: &StripeWebhookEvent,
) -> Result<WebhookEventData, PaymentError> {
    match event_type {
        WebhookEventType::CheckoutSessionCompleted => {
            let session: StripeCheckoutSession =
                serde_json::from_value(event.data.object.clone()).map_err(|e| {
                    PaymentError::invalid_payload(format!("Invalid checkout session: {}", e))
                })?;
            Ok(WebhookEventData::Checkout(session.into_completion()))
        }

        WebhookEventType::Unknown(_) => Ok(WebhookEventData::Raw {
            json: event.data.object.to_string(),
        }),

        _ => {
            let sub: StripeSubscription = serde_json::from_value(event.data.object.clone())
                .map_err(|e| PaymentError::invalid_payload(format!("Invalid subscription: {}", e)))?;
            let snapshot = sub
                .to_snapshot()
                .map_err(|e| PaymentError::invalid_payload(e.message))?;
            Ok(WebhookEventData::Subscription(snapshot))
        }
    }
}

/// Maps a non-success Stripe response to a payment error.
fn api_error(status: reqwest::StatusCode, body: &str) -> PaymentError {
    let error = serde_json::from_str::<StripeErrorResponse>(body)
        .ok()
        .map(|r| r.error);
    let stripe_code = error.as_ref().and_then(|e| e.code.clone());
    tracing::debug!(
        status = %status,
        error_type = error.as_ref().and_then(|e| e.error_type.as_deref()),
        stripe_code = stripe_code.as_deref(),
        "Stripe API error response"
    );

    let text = error
        .and_then(|e| e.message)
        .unwrap_or_else(|| body.to_string());
    let message = match stripe_code {
        Some(stripe_code) => format!("{} [{}]", text, stripe_code),
        None => text,
    };

    let code = match status.as_u16() {
        401 | 403 => PaymentErrorCode::AuthenticationError,
        429 => PaymentErrorCode::RateLimitExceeded,
        500..=599 => PaymentErrorCode::NetworkError,
        _ => PaymentErrorCode::ProviderError,
    };

    PaymentError::new(code, format!("Stripe API error: {}", message))
}

#[async_trait]
impl PaymentProvider for StripePaymentAdapter {
    async fn get_subscription(
        &self,
        subscription_id: &str,
    ) -> Result<Option<SubscriptionSnapshot>, PaymentError> {
        let request = self
            .http_client
            .get(self.url(&format!("subscriptions/{}", subscription_id)));

        let sub: Option<StripeSubscription> = self.send(request, "get_subscription").await?;
        sub.map(|s| s.to_snapshot()).transpose()
    }

    async fn get_customer(&self, customer_id: &str) -> Result<Option<Customer>, PaymentError> {
        let request = self
            .http_client
            .get(self.url(&format!("customers/{}", customer_id)));

        let customer: Option<StripeCustomer> = self.send(request, "get_customer").await?;
        Ok(customer.map(StripeCustomer::into_customer))
    }

    async fn set_cancel_at_period_end(
        &self,
        subscription_id: &str,
        cancel_at_period_end: bool,
    ) -> Result<SubscriptionSnapshot, PaymentError> {
        let flag = if cancel_at_period_end { "true" } else { "false" };
        let request = self
            .http_client
            .post(self.url(&format!("subscriptions/{}", subscription_id)))
            .form(&[("cancel_at_period_end", flag)]);

        let sub: Option<StripeSubscription> = self.send(request, "update_subscription").await?;
        sub.ok_or_else(|| PaymentError::not_found("Subscription"))?
            .to_snapshot()
    }

    async fn cancel_subscription_now(
        &self,
        subscription_id: &str,
    ) -> Result<SubscriptionSnapshot, PaymentError> {
        let request = self
            .http_client
            .delete(self.url(&format!("subscriptions/{}", subscription_id)));

        let sub: Option<StripeSubscription> = self.send(request, "cancel_subscription").await?;
        sub.ok_or_else(|| PaymentError::not_found("Subscription"))?
            .to_snapshot()
    }

    async fn check_connection(&self) -> Result<ConnectionCheck, PaymentError> {
        let request = self.http_client.get(self.url("balance"));

        let balance: Option<StripeBalance> = self.send(request, "retrieve_balance").await?;
        let balance = balance.ok_or_else(|| PaymentError::not_found("Balance"))?;

        Ok(ConnectionCheck {
            livemode: balance.livemode,
        })
    }

    async fn verify_webhook(
        &self,
        payload: &[u8],
        signature: &str,
    ) -> Result<WebhookEvent, PaymentError> {
        let header = SignatureHeader::parse(signature).map_err(|e| {
            tracing::warn!(error = %e, "Failed to parse Stripe-Signature header");
            PaymentError::invalid_webhook(e.to_string())
        })?;

        self.verify_signature(payload, &header)?;

        let webhook_event = self.parse_event(payload)?;

        tracing::info!(
            event_id = %webhook_event.id,
            event_type = webhook_event.event_type.as_str(),
            "Webhook signature verified"
        );

        Ok(webhook_event)
    }
}

#[cfg(test)]
mod tests {
    use super::super::webhook_types::hex_encode;
    use super::*;
    use crate::domain::subscription::SubscriptionStatus;

    const SECRET: &str = "whsec_test_secret";

    fn test_config() -> PaymentConfig {
        PaymentConfig::new("sk_test_key", SECRET)
    }

    fn create_test_signature(secret: &str, timestamp: i64, payload: &str) -> String {
        let signed_payload = format!("{}.{}", timestamp, payload);
        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(signed_payload.as_bytes());
        let result = mac.finalize().into_bytes();

        format!("t={},v1={}", timestamp, hex_encode(&result))
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Signature Verification Tests
    // ════════════════════════════════════════════════════════════════════════════

    #[test]
    fn verify_signature_valid() {
        let adapter = StripePaymentAdapter::new(test_config());
        let payload = r#"{"id":"evt_test"}"#;
        let timestamp = chrono::Utc::now().timestamp();
        let signature = create_test_signature(SECRET, timestamp, payload);

        let header = SignatureHeader::parse(&signature).unwrap();

        assert!(adapter.verify_signature(payload.as_bytes(), &header).is_ok());
    }

    #[test]
    fn verify_signature_wrong_secret() {
        let adapter = StripePaymentAdapter::new(test_config());
        let payload = r#"{"id":"evt_test"}"#;
        let timestamp = chrono::Utc::now().timestamp();
        let signature = create_test_signature("wrong_secret", timestamp, payload);

        let header = SignatureHeader::parse(&signature).unwrap();
        let err = adapter
            .verify_signature(payload.as_bytes(), &header)
            .unwrap_err();

        assert_eq!(err.code, PaymentErrorCode::InvalidWebhook);
    }

    #[test]
    fn verify_signature_accepts_any_matching_v1() {
        let adapter = StripePaymentAdapter::new(test_config());
        let payload = r#"{"id":"evt_test"}"#;
        let timestamp = chrono::Utc::now().timestamp();
        let good = create_test_signature(SECRET, timestamp, payload);
        let good_sig = good.split("v1=").nth(1).unwrap();
        let header_value = format!("t={},v1={},v1={}", timestamp, "00".repeat(32), good_sig);

        let header = SignatureHeader::parse(&header_value).unwrap();

        assert!(adapter.verify_signature(payload.as_bytes(), &header).is_ok());
    }

    #[test]
    fn verify_signature_tampered_payload() {
        let adapter = StripePaymentAdapter::new(test_config());
        let timestamp = chrono::Utc::now().timestamp();
        let signature = create_test_signature(SECRET, timestamp, r#"{"id":"evt_a"}"#);

        let header = SignatureHeader::parse(&signature).unwrap();

        assert!(adapter
            .verify_signature(br#"{"id":"evt_b"}"#, &header)
            .is_err());
    }

    #[test]
    fn verify_signature_expired_timestamp() {
        let adapter = StripePaymentAdapter::new(test_config());
        let payload = r#"{"id":"evt_test"}"#;
        let old_timestamp = chrono::Utc::now().timestamp() - 600;
        let signature = create_test_signature(SECRET, old_timestamp, payload);

        let header = SignatureHeader::parse(&signature).unwrap();
        let err = adapter
            .verify_signature(payload.as_bytes(), &header)
            .unwrap_err();

        assert!(err.message.contains("too old"));
    }

    #[test]
    fn verify_signature_future_timestamp() {
        let adapter = StripePaymentAdapter::new(test_config());
        let payload = r#"{"id":"evt_test"}"#;
        let future_timestamp = chrono::Utc::now().timestamp() + 120;
        let signature = create_test_signature(SECRET, future_timestamp, payload);

        let header = SignatureHeader::parse(&signature).unwrap();
        let err = adapter
            .verify_signature(payload.as_bytes(), &header)
            .unwrap_err();

        assert!(err.message.contains("future"));
    }

    #[test]
    fn verify_signature_extreme_timestamps_are_rejected() {
        let adapter = StripePaymentAdapter::new(test_config());
        let payload = r#"{"id":"evt_test"}"#;

        for timestamp in [i64::MIN, i64::MAX] {
            let header =
                SignatureHeader::parse(&format!("t={},v1={}", timestamp, "00".repeat(32)))
                    .unwrap();
            let err = adapter
                .verify_signature(payload.as_bytes(), &header)
                .unwrap_err();
            assert_eq!(err.code, PaymentErrorCode::InvalidWebhook);
        }
    }

    #[test]
    fn verify_signature_small_future_tolerance() {
        let adapter = StripePaymentAdapter::new(test_config());
        let payload = r#"{"id":"evt_test"}"#;
        let timestamp = chrono::Utc::now().timestamp() + 30;
        let signature = create_test_signature(SECRET, timestamp, payload);

        let header = SignatureHeader::parse(&signature).unwrap();

        assert!(adapter.verify_signature(payload.as_bytes(), &header).is_ok());
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Event Parsing Tests
    // ════════════════════════════════════════════════════════════════════════════

    #[test]
    fn parse_checkout_session_completed() {
        let adapter = StripePaymentAdapter::new(test_config());
        let payload = r#"{
            "id": "evt_test",
            "type": "checkout.session.completed",
            "created": 1704067200,
            "data": {
                "object": {
                    "id": "cs_test",
                    "object": "checkout.session",
                    "customer": "cus_test",
                    "subscription": "sub_test",
                    "client_reference_id": "6f1c2a8e-3c2b-4f52-9d55-1a3f5e0c9b11",
                    "mode": "subscription"
                }
            },
            "livemode": false
        }"#;

        let event = adapter.parse_event(payload.as_bytes()).unwrap();

        assert_eq!(event.id, "evt_test");
        assert_eq!(event.event_type, WebhookEventType::CheckoutSessionCompleted);
        match event.data {
            WebhookEventData::Checkout(completion) => {
                assert_eq!(completion.session_id, "cs_test");
                assert_eq!(completion.customer_id.as_deref(), Some("cus_test"));
                assert_eq!(completion.subscription_id.as_deref(), Some("sub_test"));
                assert_eq!(
                    completion.client_reference_id.as_deref(),
                    Some("6f1c2a8e-3c2b-4f52-9d55-1a3f5e0c9b11")
                );
            }
            other => panic!("Expected Checkout data, got {:?}", other),
        }
    }

    #[test]
    fn parse_subscription_updated() {
        let adapter = StripePaymentAdapter::new(test_config());
        let payload = r#"{
            "id": "evt_sub",
            "type": "customer.subscription.updated",
            "created": 1704067200,
            "data": {
                "object": {
                    "id": "sub_test",
                    "object": "subscription",
                    "customer": "cus_test",
                    "status": "past_due",
                    "current_period_end": 1706745600,
                    "cancel_at_period_end": false
                }
            },
            "livemode": false
        }"#;

        let event = adapter.parse_event(payload.as_bytes()).unwrap();

        assert_eq!(event.event_type, WebhookEventType::SubscriptionUpdated);
        match event.data {
            WebhookEventData::Subscription(snapshot) => {
                assert_eq!(snapshot.id, "sub_test");
                assert_eq!(snapshot.status, SubscriptionStatus::PastDue);
                assert!(snapshot.price_id.is_none());
            }
            other => panic!("Expected Subscription data, got {:?}", other),
        }
    }

    #[test]
    fn parse_trial_will_end_as_subscription() {
        let adapter = StripePaymentAdapter::new(test_config());
        let payload = r#"{
            "id": "evt_trial",
            "type": "customer.subscription.trial_will_end",
            "created": 1704067200,
            "data": {"object": {
                "id": "sub_t", "customer": "cus_t", "status": "trialing",
                "current_period_end": 1706745600
            }},
            "livemode": false
        }"#;

        let event = adapter.parse_event(payload.as_bytes()).unwrap();

        assert_eq!(event.event_type, WebhookEventType::TrialWillEnd);
        assert!(matches!(event.data, WebhookEventData::Subscription(_)));
    }

    #[test]
    fn parse_unknown_event_type() {
        let adapter = StripePaymentAdapter::new(test_config());
        let payload = r#"{
            "id": "evt_unknown",
            "type": "invoice.paid",
            "created": 1704067200,
            "data": {"object": {"foo": "bar"}},
            "livemode": false
        }"#;

        let event = adapter.parse_event(payload.as_bytes()).unwrap();

        assert!(matches!(
            event.event_type,
            WebhookEventType::Unknown(ref s) if s == "invoice.paid"
        ));
        assert!(matches!(event.data, WebhookEventData::Raw { .. }));
    }

    #[test]
    fn parse_rejects_test_mode_when_livemode_required() {
        let mut config = test_config();
        config.require_livemode = true;
        let adapter = StripePaymentAdapter::new(config);

        let payload = r#"{
            "id": "evt_test",
            "type": "invoice.paid",
            "created": 1704067200,
            "data": {"object": {}},
            "livemode": false
        }"#;

        let err = adapter.parse_event(payload.as_bytes()).unwrap_err();
        assert!(err.message.contains("Test mode"));
    }

    // ════════════════════════════════════════════════════════════════════════════
    // API Error Mapping
    // ════════════════════════════════════════════════════════════════════════════

    #[test]
    fn api_error_uses_stripe_message() {
        let body = r#"{"error":{"type":"invalid_request_error","message":"No such price"}}"#;
        let err = api_error(reqwest::StatusCode::BAD_REQUEST, body);

        assert_eq!(err.code, PaymentErrorCode::ProviderError);
        assert_eq!(err.message, "Stripe API error: No such price");
    }

    #[test]
    fn api_error_keeps_stripe_error_code() {
        let body = r#"{"error":{"type":"invalid_request_error","code":"resource_missing","message":"No such subscription: 'sub_x'"}}"#;
        let err = api_error(reqwest::StatusCode::BAD_REQUEST, body);

        assert_eq!(
            err.message,
            "Stripe API error: No such subscription: 'sub_x' [resource_missing]"
        );
    }

    #[test]
    fn api_error_classifies_status() {
        assert_eq!(
            api_error(reqwest::StatusCode::UNAUTHORIZED, "").code,
            PaymentErrorCode::AuthenticationError
        );
        assert!(api_error(reqwest::StatusCode::TOO_MANY_REQUESTS, "").retryable);
    }

    #[test]
    fn url_joins_base_and_path() {
        let mut config = test_config();
        config.stripe_api_base_url = "http://localhost:12111/".into();
        let adapter = StripePaymentAdapter::new(config);

        assert_eq!(adapter.url("balance"), "http://localhost:12111/v1/balance");
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Integration Tests (verify_webhook full flow)
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn verify_webhook_valid_signature_and_payload() {
        let adapter = StripePaymentAdapter::new(test_config());
        let payload = r#"{
            "id": "evt_test123",
            "type": "customer.subscription.deleted",
            "created": 1704067200,
            "data": {"object": {
                "id": "sub_1", "customer": "cus_1", "status": "canceled",
                "current_period_end": 1706745600, "ended_at": 1704067200
            }},
            "livemode": false
        }"#;
        let timestamp = chrono::Utc::now().timestamp();
        let signature = create_test_signature(SECRET, timestamp, payload);

        let event = adapter
            .verify_webhook(payload.as_bytes(), &signature)
            .await
            .unwrap();

        assert_eq!(event.id, "evt_test123");
        assert_eq!(event.event_type, WebhookEventType::SubscriptionDeleted);
        match event.data {
            WebhookEventData::Subscription(snapshot) => {
                assert_eq!(snapshot.ended_at.map(|t| t.as_unix_secs()), Some(1704067200));
            }
            other => panic!("Expected Subscription data, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn verify_webhook_rejects_malformed_header() {
        let adapter = StripePaymentAdapter::new(test_config());

        let result = adapter
            .verify_webhook(br#"{"id":"evt_test"}"#, "malformed_header")
            .await;

        assert_eq!(result.unwrap_err().code, PaymentErrorCode::InvalidWebhook);
    }

    #[tokio::test]
    async fn verify_webhook_rejects_invalid_json() {
        let adapter = StripePaymentAdapter::new(test_config());
        let payload = "not valid json";
        let timestamp = chrono::Utc::now().timestamp();
        let signature = create_test_signature(SECRET, timestamp, payload);

        let err = adapter
            .verify_webhook(payload.as_bytes(), &signature)
            .await
            .unwrap_err();

        assert!(err.message.contains("Invalid JSON"));
        assert_eq!(err.code, PaymentErrorCode::InvalidPayload);
    }

    #[tokio::test]
    async fn verify_webhook_reports_unknown_status_as_payload_error() {
        let adapter = StripePaymentAdapter::new(test_config());
        let payload = r#"{
            "id": "evt_on_hold",
            "type": "customer.subscription.updated",
            "created": 1704067200,
            "data": {"object": {
                "id": "sub_1", "customer": "cus_1", "status": "on_hold",
                "current_period_end": 1706745600
            }},
            "livemode": false
        }"#;
        let timestamp = chrono::Utc::now().timestamp();
        let signature = create_test_signature(SECRET, timestamp, payload);

        let err = adapter
            .verify_webhook(payload.as_bytes(), &signature)
            .await
            .unwrap_err();

        assert_eq!(err.code, PaymentErrorCode::InvalidPayload);
        assert!(err.message.contains("on_hold"));
    }
}
