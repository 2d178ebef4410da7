//! Stripe-specific wire types.
//!
//! These types represent Stripe API objects as they arrive in webhook
//! payloads and API responses. They parse only the fields this service
//! reads and convert into port types through [`StripeSubscription::to_snapshot`]
//! and friends.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::domain::foundation::Timestamp;
use crate::domain::subscription::{SubscriptionSnapshot, SubscriptionStatus};
use crate::ports::{CheckoutCompletion, Customer, PaymentError};

// ════════════════════════════════════════════════════════════════════════════════
// Signature Parsing
// ════════════════════════════════════════════════════════════════════════════════

/// Error parsing the Stripe-Signature header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignatureParseError {
    /// Header is empty or missing.
    MissingHeader,
    /// Missing timestamp component (t=...).
    MissingTimestamp,
    /// Missing v1 signature component.
    MissingV1Signature,
    InvalidTimestamp,
    /// Signature is not valid hex.
    InvalidSignatureFormat,
}

impl std::fmt::Display for SignatureParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingHeader => write!(f, "Missing Stripe-Signature header"),
            Self::MissingTimestamp => write!(f, "Missing timestamp (t=) in signature"),
            Self::MissingV1Signature => write!(f, "Missing v1 signature in header"),
            Self::InvalidTimestamp => write!(f, "Invalid timestamp format"),
            Self::InvalidSignatureFormat => write!(f, "Invalid signature format (not valid hex)"),
        }
    }
}

impl std::error::Error for SignatureParseError {}

/// Parsed Stripe-Signature header.
///
/// The header format is `t=timestamp,v1=signature[,v1=signature...]`.
/// Stripe sends several `v1` entries while a signing secret is being
/// rolled; a payload is authentic if any one of them matches.
#[derive(Debug, Clone)]
pub struct SignatureHeader {
    /// Unix timestamp when Stripe signed the payload.
    pub timestamp: i64,

    /// HMAC-SHA256 signatures, hex-decoded.
    pub v1_signatures: Vec<Vec<u8>>,
}

impl SignatureHeader {
    pub fn parse(header: &str) -> Result<Self, SignatureParseError> {
        if header.trim().is_empty() {
            return Err(SignatureParseError::MissingHeader);
        }

        let mut timestamp: Option<i64> = None;
        let mut v1_signatures = Vec::new();

        for part in header.split(',') {
            let (key, value) = part
                .split_once('=')
                .ok_or(SignatureParseError::MissingTimestamp)?;

            match key.trim() {
                "t" => {
                    timestamp = Some(
                        value
                            .trim()
                            .parse()
                            .map_err(|_| SignatureParseError::InvalidTimestamp)?,
                    );
                }
                "v1" => {
                    v1_signatures.push(
                        hex_decode(value).ok_or(SignatureParseError::InvalidSignatureFormat)?,
                    );
                }
                // v0 and future schemes are ignored
                _ => {}
            }
        }

        let timestamp = timestamp.ok_or(SignatureParseError::MissingTimestamp)?;
        if v1_signatures.is_empty() {
            return Err(SignatureParseError::MissingV1Signature);
        }

        Ok(Self {
            timestamp,
            v1_signatures,
        })
    }
}

/// Decode a hex string to bytes.
pub(crate) fn hex_decode(hex: &str) -> Option<Vec<u8>> {
    let hex = hex.trim();
    if hex.len() % 2 != 0 || !hex.is_ascii() {
        return None;
    }

    (0..hex.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&hex[i..i + 2], 16).ok())
        .collect()
}

/// Encode bytes to hex string.
pub fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

// ════════════════════════════════════════════════════════════════════════════════
// Event Envelope
// ════════════════════════════════════════════════════════════════════════════════

/// Raw Stripe webhook event as received from the API.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripeWebhookEvent {
    /// Unique event identifier (evt_...).
    pub id: String,

    /// Event type (e.g., "checkout.session.completed").
    #[serde(rename = "type")]
    pub event_type: String,

    /// Unix timestamp when the event was created.
    pub created: i64,

    pub data: StripeEventData,

    /// Whether this is a live or test event.
    #[serde(default)]
    pub livemode: bool,

    pub api_version: Option<String>,
}

/// Event data container.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripeEventData {
    /// The object affected by this event.
    pub object: serde_json::Value,
}

// ════════════════════════════════════════════════════════════════════════════════
// Stripe Objects
// ════════════════════════════════════════════════════════════════════════════════

/// Stripe Checkout Session object.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripeCheckoutSession {
    /// Unique session identifier (cs_...).
    pub id: String,

    pub customer: Option<String>,

    /// Subscription created by the checkout, for subscription-mode sessions.
    pub subscription: Option<String>,

    /// Our user id, set when the session was created.
    pub client_reference_id: Option<String>,

    #[serde(default)]
    pub mode: Option<String>,
}

impl StripeCheckoutSession {
    pub fn into_completion(self) -> CheckoutCompletion {
        CheckoutCompletion {
            session_id: self.id,
            customer_id: self.customer,
            subscription_id: self.subscription,
            client_reference_id: self.client_reference_id,
        }
    }
}

/// Stripe Customer object. Deleted customers come back as a stub with
/// only `id` and `deleted: true`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripeCustomer {
    /// Unique customer identifier (cus_...).
    pub id: String,

    pub email: Option<String>,

    #[serde(default)]
    pub metadata: HashMap<String, String>,

    #[serde(default)]
    pub deleted: bool,
}

impl StripeCustomer {
    pub fn into_customer(self) -> Customer {
        let user_id = self.metadata.get("user_id").cloned();
        Customer {
            id: self.id,
            email: self.email,
            deleted: self.deleted,
            user_id,
        }
    }
}

/// Stripe Subscription object.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripeSubscription {
    /// Unique subscription identifier (sub_...).
    pub id: String,

    /// Customer ID owning this subscription.
    pub customer: String,

    pub status: String,

    /// Period end (Unix timestamp). Newer API versions only report it per
    /// subscription item.
    pub current_period_end: Option<i64>,

    #[serde(default)]
    pub cancel_at_period_end: bool,

    /// When the subscription ended (Unix timestamp).
    pub ended_at: Option<i64>,

    #[serde(default)]
    pub items: StripeSubscriptionItems,
}

/// Subscription items container.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct StripeSubscriptionItems {
    #[serde(default)]
    pub data: Vec<StripeSubscriptionItem>,
}

/// Single subscription item.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripeSubscriptionItem {
    pub id: String,

    pub price: StripePrice,

    pub current_period_end: Option<i64>,
}

/// Stripe Price object (embedded in subscription items).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripePrice {
    pub id: String,
}

impl StripeSubscription {
    /// Converts to the port snapshot.
    ///
    /// The price is taken from the first subscription item.
    pub fn to_snapshot(&self) -> Result<SubscriptionSnapshot, PaymentError> {
        let status: SubscriptionStatus = self.status.parse().map_err(|_| {
            PaymentError::provider(format!("Unknown subscription status: {}", self.status))
        })?;

        let first_item = self.items.data.first();
        let period_end_secs = self
            .current_period_end
            .or_else(|| first_item.and_then(|item| item.current_period_end))
            .ok_or_else(|| {
                PaymentError::provider(format!(
                    "Subscription {} has no current_period_end",
                    self.id
                ))
            })?;

        Ok(SubscriptionSnapshot {
            id: self.id.clone(),
            customer_id: self.customer.clone(),
            status,
            price_id: first_item.map(|item| item.price.id.clone()),
            current_period_end: unix_to_timestamp(period_end_secs)?,
            cancel_at_period_end: self.cancel_at_period_end,
            ended_at: self.ended_at.map(unix_to_timestamp).transpose()?,
        })
    }
}

fn unix_to_timestamp(secs: i64) -> Result<Timestamp, PaymentError> {
    Timestamp::from_unix_secs(secs)
        .ok_or_else(|| PaymentError::provider(format!("Timestamp out of range: {}", secs)))
}

/// Stripe Balance object, fetched as a connectivity check.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripeBalance {
    #[serde(default)]
    pub livemode: bool,
}

/// Error body returned by the Stripe API.
#[derive(Debug, Clone, Deserialize)]
pub struct StripeErrorResponse {
    pub error: StripeErrorBody,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeErrorBody {
    #[serde(rename = "type")]
    pub error_type: Option<String>,
    /// Machine-readable reason such as `resource_missing`.
    pub code: Option<String>,
    pub message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    // ════════════════════════════════════════════════════════════════════════════
    // SignatureHeader Tests
    // ════════════════════════════════════════════════════════════════════════════

    #[test]
    fn parse_signature_header_valid() {
        let header = "t=1704067200,v1=5d41402abc4b2a76b9719d911017c592";
        let parsed = SignatureHeader::parse(header).unwrap();

        assert_eq!(parsed.timestamp, 1704067200);
        assert_eq!(
            hex_encode(&parsed.v1_signatures[0]),
            "5d41402abc4b2a76b9719d911017c592"
        );
    }

    #[test]
    fn parse_signature_header_keeps_every_v1() {
        let header = "t=1704067200,v1=aa,v1=bb,v0=cc";
        let parsed = SignatureHeader::parse(header).unwrap();

        assert_eq!(parsed.v1_signatures, vec![vec![0xaa], vec![0xbb]]);
    }

    #[test]
    fn parse_signature_header_missing_timestamp() {
        assert_eq!(
            SignatureHeader::parse("v1=abcd").unwrap_err(),
            SignatureParseError::MissingTimestamp
        );
    }

    #[test]
    fn parse_signature_header_missing_v1() {
        assert_eq!(
            SignatureHeader::parse("t=1704067200,v0=abcd").unwrap_err(),
            SignatureParseError::MissingV1Signature
        );
    }

    #[test]
    fn parse_signature_header_empty() {
        assert_eq!(
            SignatureHeader::parse("").unwrap_err(),
            SignatureParseError::MissingHeader
        );
    }

    #[test]
    fn parse_signature_header_invalid_timestamp() {
        assert_eq!(
            SignatureHeader::parse("t=yesterday,v1=abcd").unwrap_err(),
            SignatureParseError::InvalidTimestamp
        );
    }

    #[test]
    fn parse_signature_header_invalid_hex() {
        assert_eq!(
            SignatureHeader::parse("t=1,v1=zzzz").unwrap_err(),
            SignatureParseError::InvalidSignatureFormat
        );
        assert_eq!(
            SignatureHeader::parse("t=1,v1=abc").unwrap_err(),
            SignatureParseError::InvalidSignatureFormat
        );
    }

    #[test]
    fn hex_decode_roundtrip() {
        let bytes = vec![0x00, 0x7f, 0xff, 0x10];
        assert_eq!(hex_decode(&hex_encode(&bytes)), Some(bytes));
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Object Conversion Tests
    // ════════════════════════════════════════════════════════════════════════════

    #[test]
    fn subscription_converts_to_snapshot() {
        let json = r#"{
            "id": "sub_123",
            "object": "subscription",
            "customer": "cus_123",
            "status": "trialing",
            "current_period_end": 1706745600,
            "cancel_at_period_end": true,
            "items": {"object": "list", "data": [
                {"id": "si_1", "price": {"id": "price_monthly", "product": "prod_1"}}
            ]}
        }"#;

        let sub: StripeSubscription = serde_json::from_str(json).unwrap();
        let snap = sub.to_snapshot().unwrap();

        assert_eq!(snap.id, "sub_123");
        assert_eq!(snap.customer_id, "cus_123");
        assert_eq!(snap.status, SubscriptionStatus::Trialing);
        assert_eq!(snap.price_id.as_deref(), Some("price_monthly"));
        assert_eq!(snap.current_period_end.as_unix_secs(), 1706745600);
        assert!(snap.cancel_at_period_end);
        assert!(snap.ended_at.is_none());
    }

    #[test]
    fn period_end_falls_back_to_first_item() {
        let json = r#"{
            "id": "sub_123",
            "customer": "cus_123",
            "status": "active",
            "items": {"data": [
                {"id": "si_1", "price": {"id": "price_1"}, "current_period_end": 1706745600}
            ]}
        }"#;

        let sub: StripeSubscription = serde_json::from_str(json).unwrap();

        assert_eq!(
            sub.to_snapshot().unwrap().current_period_end.as_unix_secs(),
            1706745600
        );
    }

    #[test]
    fn subscription_without_period_end_is_rejected() {
        let json = r#"{"id": "sub_1", "customer": "cus_1", "status": "active"}"#;
        let sub: StripeSubscription = serde_json::from_str(json).unwrap();
        assert!(sub.to_snapshot().is_err());
    }

    #[test]
    fn unknown_status_is_rejected() {
        let json = r#"{"id": "sub_1", "customer": "cus_1", "status": "exploded",
                       "current_period_end": 1706745600}"#;
        let sub: StripeSubscription = serde_json::from_str(json).unwrap();
        assert!(sub.to_snapshot().is_err());
    }

    #[test]
    fn deleted_customer_stub_parses() {
        let json = r#"{"id": "cus_gone", "object": "customer", "deleted": true}"#;
        let customer: StripeCustomer = serde_json::from_str(json).unwrap();
        let customer = customer.into_customer();

        assert!(customer.deleted);
        assert!(customer.user_id.is_none());
    }

    #[test]
    fn customer_metadata_carries_user_id() {
        let json = r#"{"id": "cus_1", "email": "a@example.com",
                       "metadata": {"user_id": "6f1c2a8e-3c2b-4f52-9d55-1a3f5e0c9b11"}}"#;
        let customer: StripeCustomer = serde_json::from_str(json).unwrap();
        let customer = customer.into_customer();

        assert_eq!(
            customer.user_id.as_deref(),
            Some("6f1c2a8e-3c2b-4f52-9d55-1a3f5e0c9b11")
        );
        assert_eq!(customer.email.as_deref(), Some("a@example.com"));
    }

    #[test]
    fn checkout_session_keeps_client_reference() {
        let json = r#"{"id": "cs_1", "customer": "cus_1", "subscription": "sub_1",
                       "client_reference_id": "user-1", "mode": "subscription"}"#;
        let session: StripeCheckoutSession = serde_json::from_str(json).unwrap();
        let completion = session.into_completion();

        assert_eq!(completion.client_reference_id.as_deref(), Some("user-1"));
        assert_eq!(completion.subscription_id.as_deref(), Some("sub_1"));
    }
}
