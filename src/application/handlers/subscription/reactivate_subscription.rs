//! ReactivateSubscriptionHandler - undoes a scheduled cancellation.

use crate::domain::foundation::UserId;
use crate::domain::subscription::{BillingError, Subscription};

use super::reconciler::{billing_error, SubscriptionReconciler};

#[derive(Debug, Clone)]
pub struct ReactivateSubscriptionCommand {
    pub user_id: UserId,
    pub subscription_id: String,
}

pub struct ReactivateSubscriptionHandler {
    reconciler: SubscriptionReconciler,
}

impl ReactivateSubscriptionHandler {
    pub fn new(reconciler: SubscriptionReconciler) -> Self {
        Self { reconciler }
    }

    pub async fn handle(
        &self,
        cmd: ReactivateSubscriptionCommand,
    ) -> Result<Subscription, BillingError> {
        let subscription_id = cmd.subscription_id.trim();
        if subscription_id.is_empty() {
            return Err(BillingError::MissingSubscriptionId);
        }

        let snapshot = self.reconciler.fetch(subscription_id).await?;
        let local = self.reconciler.authorize(&cmd.user_id, &snapshot).await?;

        let updated = self
            .reconciler
            .payment_provider()
            .set_cancel_at_period_end(subscription_id, false)
            .await
            .map_err(|e| billing_error(subscription_id, e))?;
        let row = self.reconciler.mirror(cmd.user_id, local, &updated).await?;

        tracing::info!(user_id = %cmd.user_id, subscription_id = %subscription_id, "Subscription reactivated");
        Ok(row)
    }
}
