//! Shared steps for mirroring processor state into local rows.

use std::sync::Arc;

use crate::domain::foundation::{ErrorCode, Timestamp, UserId};
use crate::domain::subscription::{BillingError, Subscription, SubscriptionSnapshot};
use crate::ports::{PaymentError, PaymentErrorCode, PaymentProvider, SubscriptionRepository};

/// Maps a processor failure for `subscription_id` into a billing error.
pub(crate) fn billing_error(subscription_id: &str, err: PaymentError) -> BillingError {
    match err.code {
        PaymentErrorCode::NotFound => BillingError::NotFound(subscription_id.to_string()),
        _ => BillingError::payment_provider(err.message),
    }
}

/// Reads from the processor and writes the result to the local table.
#[derive(Clone)]
pub struct SubscriptionReconciler {
    repository: Arc<dyn SubscriptionRepository>,
    payment_provider: Arc<dyn PaymentProvider>,
}

impl SubscriptionReconciler {
    pub fn new(
        repository: Arc<dyn SubscriptionRepository>,
        payment_provider: Arc<dyn PaymentProvider>,
    ) -> Self {
        Self {
            repository,
            payment_provider,
        }
    }

    pub fn repository(&self) -> &Arc<dyn SubscriptionRepository> {
        &self.repository
    }

    pub fn payment_provider(&self) -> &Arc<dyn PaymentProvider> {
        &self.payment_provider
    }

    /// Retrieves the subscription from the processor. Absent is an error.
    pub async fn fetch(&self, subscription_id: &str) -> Result<SubscriptionSnapshot, BillingError> {
        self.payment_provider
            .get_subscription(subscription_id)
            .await
            .map_err(|e| billing_error(subscription_id, e))?
            .ok_or_else(|| BillingError::NotFound(subscription_id.to_string()))
    }

    pub async fn find_local(
        &self,
        subscription_id: &str,
    ) -> Result<Option<Subscription>, BillingError> {
        Ok(self.repository.find_by_stripe_id(subscription_id).await?)
    }

    /// Makes sure `caller` may act on the subscription.
    ///
    /// An existing row must belong to the caller. Without one, the
    /// processor customer's `user_id` metadata decides.
    pub async fn authorize(
        &self,
        caller: &UserId,
        snapshot: &SubscriptionSnapshot,
    ) -> Result<Option<Subscription>, BillingError> {
        if let Some(row) = self.find_local(&snapshot.id).await? {
            if !row.belongs_to(caller) {
                tracing::warn!(
                    user_id = %caller,
                    subscription_id = %snapshot.id,
                    "Billing action on another user's subscription"
                );
                return Err(BillingError::Forbidden);
            }
            return Ok(Some(row));
        }

        let customer = self
            .payment_provider
            .get_customer(&snapshot.customer_id)
            .await
            .map_err(|e| billing_error(&snapshot.id, e))?;
        let owner = customer.and_then(|c| c.user_id);
        if owner.as_deref() != Some(caller.to_string().as_str()) {
            return Err(BillingError::Forbidden);
        }
        Ok(None)
    }

    /// Updates the row for the snapshot, or inserts one owned by `user_id`.
    pub async fn upsert(
        &self,
        user_id: UserId,
        snapshot: &SubscriptionSnapshot,
    ) -> Result<Subscription, BillingError> {
        let now = Timestamp::now();

        if let Some(mut row) = self.find_local(&snapshot.id).await? {
            row.apply_snapshot(snapshot, now);
            self.repository.update(&row).await?;
            return Ok(row);
        }

        let row = Subscription::from_snapshot(user_id, snapshot, now);
        match self.repository.insert(&row).await {
            Ok(()) => {
                tracing::info!(
                    user_id = %user_id,
                    subscription_id = %snapshot.id,
                    status = snapshot.status.as_str(),
                    "Subscription recorded"
                );
                Ok(row)
            }
            // Lost a race with a concurrent webhook delivery.
            Err(e) if e.code == ErrorCode::ValidationFailed => {
                let mut existing = self
                    .find_local(&snapshot.id)
                    .await?
                    .ok_or_else(|| BillingError::infrastructure(e.message))?;
                existing.apply_snapshot(snapshot, now);
                self.repository.update(&existing).await?;
                Ok(existing)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Writes a snapshot the processor returned after a billing action.
    pub async fn mirror(
        &self,
        caller: UserId,
        local: Option<Subscription>,
        snapshot: &SubscriptionSnapshot,
    ) -> Result<Subscription, BillingError> {
        match local {
            Some(mut row) => {
                row.apply_snapshot(snapshot, Timestamp::now());
                self.repository.update(&row).await?;
                Ok(row)
            }
            None => self.upsert(caller, snapshot).await,
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::adapters::memory::InMemorySubscriptionRepository;
    use crate::adapters::stripe::MockPaymentProvider;
    use crate::ports::Customer;

    pub struct Fixture {
        pub repository: Arc<InMemorySubscriptionRepository>,
        pub provider: MockPaymentProvider,
        pub reconciler: SubscriptionReconciler,
    }

    pub fn fixture() -> Fixture {
        let repository = Arc::new(InMemorySubscriptionRepository::new());
        let provider = MockPaymentProvider::new();
        let reconciler = SubscriptionReconciler::new(repository.clone(), Arc::new(provider.clone()));
        Fixture {
            repository,
            provider,
            reconciler,
        }
    }

    pub fn customer(id: &str, user_id: Option<UserId>) -> Customer {
        Customer {
            id: id.to_string(),
            email: Some("ada@example.com".to_string()),
            deleted: false,
            user_id: user_id.map(|u| u.to_string()),
        }
    }
}
