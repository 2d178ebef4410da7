//! HandleWebhookHandler - reconciles processor webhook events.

use std::sync::Arc;

use thiserror::Error;

use crate::domain::foundation::{Timestamp, UserId};
use crate::domain::subscription::{
    BillingError, CheckoutLink, PendingSubscriptions, Subscription, SubscriptionSnapshot,
};
use crate::ports::{
    CheckoutCompletion, PaymentErrorCode, WebhookEvent, WebhookEventData, WebhookEventType,
};

use super::reconciler::{billing_error, SubscriptionReconciler};

/// Command carrying a raw webhook delivery.
#[derive(Debug, Clone)]
pub struct HandleWebhookCommand {
    pub payload: Vec<u8>,
    pub signature: String,
}

/// What a webhook delivery led to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandleWebhookResult {
    /// A subscription row was written.
    Synced { subscription_id: String },

    /// The customer already had an active subscription, so the new one was
    /// canceled at the processor.
    Blocked { subscription_id: Option<String> },

    /// Stored in the pending registry until its checkout session arrives.
    Pending { subscription_id: String },

    /// Nothing to do for this event.
    Ignored,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WebhookError {
    #[error("Webhook signature verification failed: {0}")]
    InvalidSignature(String),

    #[error("Webhook handler failed: {0}")]
    HandlerFailed(#[from] BillingError),
}

/// Handler for processor webhooks.
///
/// Events can arrive in any order and more than once. Every branch is an
/// upsert keyed by the processor subscription id, and the pending registry
/// links `checkout.session.completed` with `customer.subscription.created`
/// whichever comes first.
pub struct HandleWebhookHandler {
    reconciler: SubscriptionReconciler,
    pending: Arc<PendingSubscriptions>,
}

impl HandleWebhookHandler {
    pub fn new(reconciler: SubscriptionReconciler, pending: Arc<PendingSubscriptions>) -> Self {
        Self {
            reconciler,
            pending,
        }
    }

    pub async fn handle(&self, cmd: HandleWebhookCommand) -> Result<HandleWebhookResult, WebhookError> {
        let event = self
            .reconciler
            .payment_provider()
            .verify_webhook(&cmd.payload, &cmd.signature)
            .await
            .map_err(|e| match e.code {
                PaymentErrorCode::InvalidWebhook => {
                    tracing::warn!(error = %e, "Webhook signature verification failed");
                    WebhookError::InvalidSignature(e.message)
                }
                _ => {
                    tracing::error!(error = %e, "Signed webhook could not be parsed");
                    WebhookError::HandlerFailed(BillingError::InvalidEvent(e.message))
                }
            })?;

        tracing::info!(event_id = %event.id, event_type = event.event_type.as_str(), "Webhook received");

        let result = self.dispatch(&event).await;
        if let Err(e) = &result {
            tracing::error!(
                event_id = %event.id,
                event_type = event.event_type.as_str(),
                error = %e,
                "Webhook handler failed"
            );
        }
        Ok(result?)
    }

    async fn dispatch(&self, event: &WebhookEvent) -> Result<HandleWebhookResult, BillingError> {
        match (&event.event_type, &event.data) {
            (WebhookEventType::CheckoutSessionCompleted, WebhookEventData::Checkout(session)) => {
                self.checkout_completed(session).await
            }
            (WebhookEventType::CheckoutSessionCompleted, _) => {
                Err(BillingError::InvalidSessionData)
            }
            (WebhookEventType::SubscriptionCreated, WebhookEventData::Subscription(snapshot)) => {
                self.subscription_created(snapshot).await
            }
            (WebhookEventType::SubscriptionDeleted, WebhookEventData::Subscription(snapshot)) => {
                self.lifecycle_update(snapshot, true).await
            }
            (
                WebhookEventType::SubscriptionUpdated
                | WebhookEventType::SubscriptionPendingUpdateApplied
                | WebhookEventType::SubscriptionPendingUpdateExpired
                | WebhookEventType::TrialWillEnd,
                WebhookEventData::Subscription(snapshot),
            ) => self.lifecycle_update(snapshot, false).await,
            (event_type, _) => {
                tracing::debug!(event_type = event_type.as_str(), "Unhandled webhook event");
                Ok(HandleWebhookResult::Ignored)
            }
        }
    }

    async fn checkout_completed(
        &self,
        session: &CheckoutCompletion,
    ) -> Result<HandleWebhookResult, BillingError> {
        if let Some(customer_id) = &session.customer_id {
            if self
                .has_other_active_subscription(customer_id, session.subscription_id.as_deref())
                .await?
            {
                return self.block_duplicate(customer_id, session).await;
            }
        }

        let (Some(user_id), Some(customer_id), Some(subscription_id)) = (
            session.client_reference_id.as_deref(),
            session.customer_id.as_deref(),
            session.subscription_id.as_deref(),
        ) else {
            tracing::warn!(session_id = %session.session_id, "Checkout session is missing references");
            return Err(BillingError::InvalidSessionData);
        };
        let user_id = UserId::parse(user_id).map_err(|_| BillingError::InvalidSessionData)?;

        self.pending.remember_checkout(
            subscription_id,
            CheckoutLink {
                user_id,
                customer_id: customer_id.to_string(),
            },
        );

        let snapshot = self.reconciler.fetch(subscription_id).await?;
        self.reconciler.upsert(user_id, &snapshot).await?;
        self.pending.forget(subscription_id);

        Ok(HandleWebhookResult::Synced {
            subscription_id: subscription_id.to_string(),
        })
    }

    async fn has_other_active_subscription(
        &self,
        customer_id: &str,
        new_subscription_id: Option<&str>,
    ) -> Result<bool, BillingError> {
        let active = self
            .reconciler
            .repository()
            .find_access_granting_for_customer(customer_id)
            .await?;
        Ok(active
            .iter()
            .any(|s| Some(s.stripe_subscription_id.as_str()) != new_subscription_id))
    }

    async fn block_duplicate(
        &self,
        customer_id: &str,
        session: &CheckoutCompletion,
    ) -> Result<HandleWebhookResult, BillingError> {
        tracing::warn!(
            customer_id = %customer_id,
            session_id = %session.session_id,
            "Customer already has an active subscription, canceling the new one"
        );

        if let Some(subscription_id) = &session.subscription_id {
            self.reconciler
                .payment_provider()
                .cancel_subscription_now(subscription_id)
                .await
                .map_err(|e| billing_error(subscription_id, e))?;
            self.pending.forget(subscription_id);
        }

        Ok(HandleWebhookResult::Blocked {
            subscription_id: session.subscription_id.clone(),
        })
    }

    async fn subscription_created(
        &self,
        snapshot: &SubscriptionSnapshot,
    ) -> Result<HandleWebhookResult, BillingError> {
        let repository = self.reconciler.repository();
        let now = Timestamp::now();

        if let Some(mut row) = repository.find_by_stripe_id(&snapshot.id).await? {
            row.apply_snapshot(snapshot, now);
            repository.update(&row).await?;
            return Ok(HandleWebhookResult::Synced {
                subscription_id: snapshot.id.clone(),
            });
        }

        match self.pending.checkout_link(&snapshot.id) {
            Some(link) => {
                let row = Subscription::from_snapshot(link.user_id, snapshot, now);
                repository.insert(&row).await?;
                self.pending.forget(&snapshot.id);
                tracing::info!(
                    user_id = %link.user_id,
                    subscription_id = %snapshot.id,
                    "Subscription linked to completed checkout"
                );
                Ok(HandleWebhookResult::Synced {
                    subscription_id: snapshot.id.clone(),
                })
            }
            None => {
                tracing::info!(subscription_id = %snapshot.id, "Subscription created before checkout completed");
                self.pending.remember_unlinked(&snapshot.id);
                Ok(HandleWebhookResult::Pending {
                    subscription_id: snapshot.id.clone(),
                })
            }
        }
    }

    async fn lifecycle_update(
        &self,
        snapshot: &SubscriptionSnapshot,
        deleted: bool,
    ) -> Result<HandleWebhookResult, BillingError> {
        let repository = self.reconciler.repository();

        let Some(mut row) = repository.find_by_stripe_id(&snapshot.id).await? else {
            tracing::warn!(subscription_id = %snapshot.id, "Lifecycle event for unknown subscription");
            if deleted {
                // No checkout will ever complete for it now.
                self.pending.forget(&snapshot.id);
            }
            return Ok(HandleWebhookResult::Ignored);
        };

        let now = Timestamp::now();
        if deleted {
            row.apply_deletion(snapshot, now);
        } else {
            row.apply_snapshot(snapshot, now);
        }
        repository.update(&row).await?;

        tracing::info!(
            subscription_id = %snapshot.id,
            status = row.status.as_str(),
            cancel_at_period_end = row.cancel_at_period_end,
            "Subscription updated from webhook"
        );
        Ok(HandleWebhookResult::Synced {
            subscription_id: snapshot.id.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::reconciler::test_support::{fixture, Fixture};
    use super::*;
    use crate::adapters::stripe::MockPaymentProvider;
    use crate::domain::subscription::test_support::snapshot;
    use crate::domain::subscription::SubscriptionStatus;
    use crate::ports::{PaymentError, SubscriptionRepository};

    struct Harness {
        f: Fixture,
        pending: Arc<PendingSubscriptions>,
        handler: HandleWebhookHandler,
    }

    fn harness() -> Harness {
        let f = fixture();
        let pending = Arc::new(PendingSubscriptions::new());
        let handler = HandleWebhookHandler::new(f.reconciler.clone(), pending.clone());
        Harness { f, pending, handler }
    }

    fn push(provider: &MockPaymentProvider, event_type: WebhookEventType, data: WebhookEventData) {
        provider.push_webhook_event(WebhookEvent {
            id: "evt_1".into(),
            event_type,
            data,
            created_at: 0,
        });
    }

    fn checkout(user: Option<UserId>, subscription: Option<&str>) -> WebhookEventData {
        WebhookEventData::Checkout(CheckoutCompletion {
            session_id: "cs_1".into(),
            customer_id: Some("cus_test".into()),
            subscription_id: subscription.map(String::from),
            client_reference_id: user.map(|u| u.to_string()),
        })
    }

    fn cmd() -> HandleWebhookCommand {
        HandleWebhookCommand {
            payload: b"{}".to_vec(),
            signature: "t=1,v1=ab".into(),
        }
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Signature
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn rejected_signature_is_reported() {
        let h = harness();
        h.f.provider
            .set_method_error("verify_webhook", PaymentError::invalid_webhook("bad sig"));

        let err = h.handler.handle(cmd()).await.unwrap_err();

        assert!(matches!(err, WebhookError::InvalidSignature(_)));
    }

    #[tokio::test]
    async fn unparseable_signed_event_is_a_handler_failure() {
        let h = harness();
        h.f.provider.set_method_error(
            "verify_webhook",
            PaymentError::invalid_payload("Unknown subscription status: on_hold"),
        );

        let err = h.handler.handle(cmd()).await.unwrap_err();

        assert!(matches!(
            err,
            WebhookError::HandlerFailed(BillingError::InvalidEvent(_))
        ));
    }

    // ════════════════════════════════════════════════════════════════════════════
    // checkout.session.completed
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn checkout_creates_subscription_row() {
        let h = harness();
        let user = UserId::new();
        h.f.provider.add_subscription(snapshot("sub_1", SubscriptionStatus::Active));
        push(&h.f.provider, WebhookEventType::CheckoutSessionCompleted, checkout(Some(user), Some("sub_1")));

        let result = h.handler.handle(cmd()).await.unwrap();

        assert_eq!(result, HandleWebhookResult::Synced { subscription_id: "sub_1".into() });
        let row = h.f.repository.find_by_stripe_id("sub_1").await.unwrap().unwrap();
        assert_eq!(row.user_id, user);
        assert_eq!(row.price_id.as_deref(), Some("price_monthly"));
        assert!(h.pending.is_empty());
    }

    #[tokio::test]
    async fn checkout_without_reference_is_invalid() {
        let h = harness();
        push(&h.f.provider, WebhookEventType::CheckoutSessionCompleted, checkout(None, Some("sub_1")));

        let err = h.handler.handle(cmd()).await.unwrap_err();

        assert_eq!(err, WebhookError::HandlerFailed(BillingError::InvalidSessionData));
    }

    #[tokio::test]
    async fn second_active_subscription_is_canceled() {
        let h = harness();
        let user = UserId::new();
        h.f.reconciler
            .upsert(user, &snapshot("sub_old", SubscriptionStatus::Active))
            .await
            .unwrap();
        h.f.provider.add_subscription(snapshot("sub_new", SubscriptionStatus::Active));
        push(&h.f.provider, WebhookEventType::CheckoutSessionCompleted, checkout(Some(user), Some("sub_new")));

        let result = h.handler.handle(cmd()).await.unwrap();

        assert_eq!(result, HandleWebhookResult::Blocked { subscription_id: Some("sub_new".into()) });
        assert_eq!(
            h.f.provider.subscription("sub_new").unwrap().status,
            SubscriptionStatus::Canceled
        );
        assert!(h.f.repository.find_by_stripe_id("sub_new").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn redelivered_checkout_is_not_blocked_by_its_own_row() {
        let h = harness();
        let user = UserId::new();
        h.f.provider.add_subscription(snapshot("sub_1", SubscriptionStatus::Active));
        push(&h.f.provider, WebhookEventType::CheckoutSessionCompleted, checkout(Some(user), Some("sub_1")));
        push(&h.f.provider, WebhookEventType::CheckoutSessionCompleted, checkout(Some(user), Some("sub_1")));

        h.handler.handle(cmd()).await.unwrap();
        let second = h.handler.handle(cmd()).await.unwrap();

        assert!(matches!(second, HandleWebhookResult::Synced { .. }));
        assert!(!h.f.provider.was_called("cancel_subscription_now"));
    }

    // ════════════════════════════════════════════════════════════════════════════
    // customer.subscription.created
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn created_before_checkout_is_pending_then_linked() {
        let h = harness();
        let user = UserId::new();
        let snap = snapshot("sub_1", SubscriptionStatus::Trialing);
        h.f.provider.add_subscription(snap.clone());
        push(&h.f.provider, WebhookEventType::SubscriptionCreated, WebhookEventData::Subscription(snap));
        push(&h.f.provider, WebhookEventType::CheckoutSessionCompleted, checkout(Some(user), Some("sub_1")));

        let first = h.handler.handle(cmd()).await.unwrap();
        assert_eq!(first, HandleWebhookResult::Pending { subscription_id: "sub_1".into() });
        assert!(h.pending.is_unlinked("sub_1"));

        h.handler.handle(cmd()).await.unwrap();

        let row = h.f.repository.find_by_stripe_id("sub_1").await.unwrap().unwrap();
        assert_eq!(row.user_id, user);
        assert!(h.pending.is_empty());
    }

    #[tokio::test]
    async fn deleting_an_unlinked_subscription_drops_its_note() {
        let h = harness();
        let snap = snapshot("sub_1", SubscriptionStatus::Incomplete);
        push(&h.f.provider, WebhookEventType::SubscriptionCreated, WebhookEventData::Subscription(snap.clone()));
        h.handler.handle(cmd()).await.unwrap();
        assert!(h.pending.is_unlinked("sub_1"));

        let mut gone = snap;
        gone.status = SubscriptionStatus::Canceled;
        push(&h.f.provider, WebhookEventType::SubscriptionDeleted, WebhookEventData::Subscription(gone));
        let result = h.handler.handle(cmd()).await.unwrap();

        assert_eq!(result, HandleWebhookResult::Ignored);
        assert!(h.pending.is_empty());
    }

    #[tokio::test]
    async fn created_after_checkout_link_inserts_row() {
        let h = harness();
        let user = UserId::new();
        h.pending.remember_checkout(
            "sub_1",
            CheckoutLink { user_id: user, customer_id: "cus_test".into() },
        );
        push(
            &h.f.provider,
            WebhookEventType::SubscriptionCreated,
            WebhookEventData::Subscription(snapshot("sub_1", SubscriptionStatus::Active)),
        );

        h.handler.handle(cmd()).await.unwrap();

        assert!(h.f.repository.find_by_stripe_id("sub_1").await.unwrap().is_some());
        assert!(h.pending.is_empty());
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Lifecycle events
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn update_overwrites_status_and_cancel_flag() {
        let h = harness();
        h.f.reconciler
            .upsert(UserId::new(), &snapshot("sub_1", SubscriptionStatus::Active))
            .await
            .unwrap();
        let mut snap = snapshot("sub_1", SubscriptionStatus::PastDue);
        snap.cancel_at_period_end = true;
        push(&h.f.provider, WebhookEventType::SubscriptionUpdated, WebhookEventData::Subscription(snap));

        h.handler.handle(cmd()).await.unwrap();

        let row = h.f.repository.find_by_stripe_id("sub_1").await.unwrap().unwrap();
        assert_eq!(row.status, SubscriptionStatus::PastDue);
        assert!(row.cancel_at_period_end);
    }

    #[tokio::test]
    async fn deletion_clears_cancel_flag_and_ends_period() {
        let h = harness();
        let mut active = snapshot("sub_1", SubscriptionStatus::Active);
        active.cancel_at_period_end = true;
        h.f.reconciler.upsert(UserId::new(), &active).await.unwrap();

        let ended = Timestamp::now().minus_days(1);
        let mut snap = snapshot("sub_1", SubscriptionStatus::Canceled);
        snap.cancel_at_period_end = true;
        snap.ended_at = Some(ended);
        push(&h.f.provider, WebhookEventType::SubscriptionDeleted, WebhookEventData::Subscription(snap));

        h.handler.handle(cmd()).await.unwrap();

        let row = h.f.repository.find_by_stripe_id("sub_1").await.unwrap().unwrap();
        assert_eq!(row.status, SubscriptionStatus::Canceled);
        assert!(!row.cancel_at_period_end);
        assert_eq!(row.current_period_end, ended);
    }

    #[tokio::test]
    async fn update_for_unknown_row_is_ignored() {
        let h = harness();
        push(
            &h.f.provider,
            WebhookEventType::SubscriptionUpdated,
            WebhookEventData::Subscription(snapshot("sub_x", SubscriptionStatus::Active)),
        );

        assert_eq!(h.handler.handle(cmd()).await.unwrap(), HandleWebhookResult::Ignored);
    }

    #[tokio::test]
    async fn unknown_events_are_ignored() {
        let h = harness();
        push(
            &h.f.provider,
            WebhookEventType::Unknown("invoice.paid".into()),
            WebhookEventData::Raw { json: "{}".into() },
        );

        assert_eq!(h.handler.handle(cmd()).await.unwrap(), HandleWebhookResult::Ignored);
    }

    #[tokio::test]
    async fn repository_failure_fails_the_handler() {
        let h = harness();
        h.f.repository.fail_next_reads(1);
        push(
            &h.f.provider,
            WebhookEventType::SubscriptionUpdated,
            WebhookEventData::Subscription(snapshot("sub_1", SubscriptionStatus::Active)),
        );

        let err = h.handler.handle(cmd()).await.unwrap_err();

        assert!(matches!(err, WebhookError::HandlerFailed(BillingError::Infrastructure(_))));
    }
}
