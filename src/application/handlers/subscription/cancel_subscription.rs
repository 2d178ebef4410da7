//! CancelSubscriptionHandler - schedules cancellation at period end.

use crate::domain::foundation::UserId;
use crate::domain::subscription::{BillingError, Subscription, SubscriptionStatus};

use super::reconciler::{billing_error, SubscriptionReconciler};

#[derive(Debug, Clone)]
pub struct CancelSubscriptionCommand {
    pub user_id: UserId,
    pub subscription_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CancelSubscriptionResult {
    /// The processor had already canceled it; nothing changed.
    AlreadyCanceled,

    /// Cancellation is scheduled for the end of the paid period.
    Scheduled(Subscription),
}

/// Handler for cancelling subscriptions.
///
/// Users keep access until `current_period_end`; the processor ends the
/// subscription then and reports it through a `deleted` webhook.
pub struct CancelSubscriptionHandler {
    reconciler: SubscriptionReconciler,
}

impl CancelSubscriptionHandler {
    pub fn new(reconciler: SubscriptionReconciler) -> Self {
        Self { reconciler }
    }

    pub async fn handle(
        &self,
        cmd: CancelSubscriptionCommand,
    ) -> Result<CancelSubscriptionResult, BillingError> {
        let subscription_id = cmd.subscription_id.trim();
        if subscription_id.is_empty() {
            return Err(BillingError::MissingSubscriptionId);
        }

        let snapshot = self.reconciler.fetch(subscription_id).await?;
        let local = self.reconciler.authorize(&cmd.user_id, &snapshot).await?;

        if snapshot.status == SubscriptionStatus::Canceled {
            tracing::info!(subscription_id = %subscription_id, "Subscription already canceled");
            return Ok(CancelSubscriptionResult::AlreadyCanceled);
        }
        if !snapshot.status.is_cancelable() {
            return Err(BillingError::NotCancelable(snapshot.status));
        }

        let updated = self
            .reconciler
            .payment_provider()
            .set_cancel_at_period_end(subscription_id, true)
            .await
            .map_err(|e| billing_error(subscription_id, e))?;
        let row = self.reconciler.mirror(cmd.user_id, local, &updated).await?;

        tracing::info!(
            user_id = %cmd.user_id,
            subscription_id = %subscription_id,
            period_end = %row.current_period_end.as_datetime(),
            "Subscription scheduled for cancellation"
        );
        Ok(CancelSubscriptionResult::Scheduled(row))
    }
}
