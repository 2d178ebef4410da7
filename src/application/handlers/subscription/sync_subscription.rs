//! SyncSubscriptionHandler - pulls a subscription from the processor.

use crate::domain::foundation::{Timestamp, UserId};
use crate::domain::subscription::{BillingError, Subscription, SubscriptionSnapshot};

use super::reconciler::{billing_error, SubscriptionReconciler};

#[derive(Debug, Clone)]
pub struct SyncSubscriptionCommand {
    pub user_id: UserId,
    pub subscription_id: String,
}

/// Handler for manual syncs, used when a webhook was missed.
///
/// Without a local row the owner comes from the processor customer's
/// `user_id` metadata, which checkout sets when it creates the customer.
pub struct SyncSubscriptionHandler {
    reconciler: SubscriptionReconciler,
}

impl SyncSubscriptionHandler {
    pub fn new(reconciler: SubscriptionReconciler) -> Self {
        Self { reconciler }
    }

    pub async fn handle(&self, cmd: SyncSubscriptionCommand) -> Result<Subscription, BillingError> {
        let subscription_id = cmd.subscription_id.trim();
        if subscription_id.is_empty() {
            return Err(BillingError::MissingSubscriptionId);
        }

        let snapshot = self.reconciler.fetch(subscription_id).await?;

        let row = match self.reconciler.find_local(subscription_id).await? {
            Some(mut row) => {
                if !row.belongs_to(&cmd.user_id) {
                    return Err(BillingError::Forbidden);
                }
                row.apply_snapshot(&snapshot, Timestamp::now());
                self.reconciler.repository().update(&row).await?;
                row
            }
            None => {
                let owner = self.owner_from_customer(&snapshot).await?;
                if owner != cmd.user_id {
                    return Err(BillingError::Forbidden);
                }
                self.reconciler.upsert(owner, &snapshot).await?
            }
        };

        tracing::info!(
            user_id = %cmd.user_id,
            subscription_id = %subscription_id,
            status = row.status.as_str(),
            "Subscription synced"
        );
        Ok(row)
    }

    async fn owner_from_customer(&self, snapshot: &SubscriptionSnapshot) -> Result<UserId, BillingError> {
        let customer = self
            .reconciler
            .payment_provider()
            .get_customer(&snapshot.customer_id)
            .await
            .map_err(|e| billing_error(&snapshot.id, e))?
            .filter(|c| !c.deleted)
            .ok_or(BillingError::InvalidCustomer)?;

        customer
            .user_id
            .as_deref()
            .and_then(|id| UserId::parse(id).ok())
            .ok_or(BillingError::MissingUserMetadata)
    }
}
