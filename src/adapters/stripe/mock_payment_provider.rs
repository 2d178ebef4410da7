//! Mock payment provider for testing.
//!
//! Provides a configurable in-memory implementation of `PaymentProvider`
//! for unit and integration tests. Supports:
//! - Seeded subscriptions and customers that billing calls mutate
//! - Queued webhook events returned by `verify_webhook`
//! - Per-method error injection
//! - Call tracking

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use crate::domain::foundation::Timestamp;
use crate::domain::subscription::{SubscriptionSnapshot, SubscriptionStatus};
use crate::ports::{
    ConnectionCheck, Customer, PaymentError, PaymentProvider, WebhookEvent,
};

/// Mock payment provider for testing.
///
/// Clones share state, so a test can keep a handle after passing one into
/// a handler.
///
/// # Example
///
/// ```ignore
/// let mock = MockPaymentProvider::new();
/// mock.add_subscription(snapshot("sub_1", SubscriptionStatus::Active));
/// mock.set_method_error("cancel_subscription_now", PaymentError::network("down"));
/// ```
#[derive(Clone, Default)]
pub struct MockPaymentProvider {
    inner: Arc<Mutex<MockState>>,
}

#[derive(Default)]
struct MockState {
    subscriptions: HashMap<String, SubscriptionSnapshot>,
    customers: HashMap<String, Customer>,

    /// Events handed out by `verify_webhook`, oldest first.
    webhook_events: VecDeque<WebhookEvent>,
    reject_webhooks: bool,

    livemode: bool,

    /// Errors keyed by method name. They persist until cleared.
    method_errors: HashMap<String, PaymentError>,

    call_log: Vec<MethodCall>,
}

/// Recorded method call for assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodCall {
    pub method: String,
    pub args: Vec<String>,
}

impl MockPaymentProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// A mock whose webhook verification always fails.
    pub fn rejecting_webhooks() -> Self {
        let mock = Self::new();
        mock.state().reject_webhooks = true;
        mock
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Configuration Methods
    // ════════════════════════════════════════════════════════════════════════════

    pub fn add_subscription(&self, subscription: SubscriptionSnapshot) {
        self.state()
            .subscriptions
            .insert(subscription.id.clone(), subscription);
    }

    pub fn add_customer(&self, customer: Customer) {
        self.state().customers.insert(customer.id.clone(), customer);
    }

    /// Queues an event for the next `verify_webhook` call.
    pub fn push_webhook_event(&self, event: WebhookEvent) {
        self.state().webhook_events.push_back(event);
    }

    pub fn set_livemode(&self, livemode: bool) {
        self.state().livemode = livemode;
    }

    pub fn set_method_error(&self, method: &str, error: PaymentError) {
        self.state()
            .method_errors
            .insert(method.to_string(), error);
    }

    pub fn clear_errors(&self) {
        self.state().method_errors.clear();
    }

    /// Current processor-side state of a subscription.
    pub fn subscription(&self, id: &str) -> Option<SubscriptionSnapshot> {
        self.state().subscriptions.get(id).cloned()
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Call Tracking
    // ════════════════════════════════════════════════════════════════════════════

    pub fn calls(&self) -> Vec<MethodCall> {
        self.state().call_log.clone()
    }

    pub fn was_called(&self, method: &str) -> bool {
        self.call_count(method) > 0
    }

    pub fn call_count(&self, method: &str) -> usize {
        self.state()
            .call_log
            .iter()
            .filter(|c| c.method == method)
            .count()
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Internal Helpers
    // ════════════════════════════════════════════════════════════════════════════

    /// Records the call and returns the injected error for the method, if any.
    fn enter(&self, method: &str, args: &[&str]) -> Result<MutexGuard<'_, MockState>, PaymentError> {
        let mut state = self.state();
        state.call_log.push(MethodCall {
            method: method.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
        });
        if let Some(error) = state.method_errors.get(method) {
            return Err(error.clone());
        }
        Ok(state)
    }
}

#[async_trait]
impl PaymentProvider for MockPaymentProvider {
    async fn get_subscription(
        &self,
        subscription_id: &str,
    ) -> Result<Option<SubscriptionSnapshot>, PaymentError> {
        let state = self.enter("get_subscription", &[subscription_id])?;
        Ok(state.subscriptions.get(subscription_id).cloned())
    }

    async fn get_customer(&self, customer_id: &str) -> Result<Option<Customer>, PaymentError> {
        let state = self.enter("get_customer", &[customer_id])?;
        Ok(state.customers.get(customer_id).cloned())
    }

    async fn set_cancel_at_period_end(
        &self,
        subscription_id: &str,
        cancel_at_period_end: bool,
    ) -> Result<SubscriptionSnapshot, PaymentError> {
        let flag = cancel_at_period_end.to_string();
        let mut state = self.enter("set_cancel_at_period_end", &[subscription_id, flag.as_str()])?;

        let subscription = state
            .subscriptions
            .get_mut(subscription_id)
            .ok_or_else(|| PaymentError::not_found("Subscription"))?;
        subscription.cancel_at_period_end = cancel_at_period_end;

        Ok(subscription.clone())
    }

    async fn cancel_subscription_now(
        &self,
        subscription_id: &str,
    ) -> Result<SubscriptionSnapshot, PaymentError> {
        let mut state = self.enter("cancel_subscription_now", &[subscription_id])?;

        let subscription = state
            .subscriptions
            .get_mut(subscription_id)
            .ok_or_else(|| PaymentError::not_found("Subscription"))?;
        subscription.status = SubscriptionStatus::Canceled;
        subscription.cancel_at_period_end = false;
        subscription.ended_at = Some(Timestamp::now());

        Ok(subscription.clone())
    }

    async fn check_connection(&self) -> Result<ConnectionCheck, PaymentError> {
        let state = self.enter("check_connection", &[])?;
        Ok(ConnectionCheck {
            livemode: state.livemode,
        })
    }

    async fn verify_webhook(
        &self,
        _payload: &[u8],
        signature: &str,
    ) -> Result<WebhookEvent, PaymentError> {
        let mut state = self.enter("verify_webhook", &[signature])?;

        if state.reject_webhooks {
            return Err(PaymentError::invalid_webhook("Invalid signature"));
        }

        state
            .webhook_events
            .pop_front()
            .ok_or_else(|| PaymentError::invalid_webhook("No webhook event queued"))
    }
}
