//! In-memory SubscriptionRepository.

use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::foundation::{DomainError, ErrorCode, Timestamp, UserId};
use crate::domain::subscription::{Subscription, SubscriptionStatus};
use crate::ports::SubscriptionRepository;

#[derive(Debug, Clone, Default)]
pub struct InMemorySubscriptionRepository {
    rows: Arc<RwLock<Vec<Subscription>>>,
    reads: Arc<AtomicUsize>,
    failing_reads: Arc<AtomicU32>,
}

impl InMemorySubscriptionRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of read queries served so far, failed ones included.
    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    /// Makes the next `count` reads fail with a database error.
    pub fn fail_next_reads(&self, count: u32) {
        self.failing_reads.store(count, Ordering::SeqCst);
    }

    pub async fn all(&self) -> Vec<Subscription> {
        self.rows.read().await.clone()
    }

    fn begin_read(&self) -> Result<(), DomainError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        let failing = self
            .failing_reads
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        match failing {
            Ok(_) => Err(DomainError::database("connection reset by peer")),
            Err(_) => Ok(()),
        }
    }
}

#[async_trait]
impl SubscriptionRepository for InMemorySubscriptionRepository {
    async fn insert(&self, subscription: &Subscription) -> Result<(), DomainError> {
        let mut rows = self.rows.write().await;
        if rows
            .iter()
            .any(|s| s.stripe_subscription_id == subscription.stripe_subscription_id)
        {
            return Err(DomainError::new(
                ErrorCode::ValidationFailed,
                "Subscription already recorded",
            ));
        }
        rows.push(subscription.clone());
        Ok(())
    }

    async fn update(&self, subscription: &Subscription) -> Result<(), DomainError> {
        let mut rows = self.rows.write().await;
        let row = rows
            .iter_mut()
            .find(|s| s.stripe_subscription_id == subscription.stripe_subscription_id)
            .ok_or_else(|| {
                DomainError::new(ErrorCode::SubscriptionNotFound, "Subscription not found")
            })?;
        *row = subscription.clone();
        Ok(())
    }

    async fn find_by_stripe_id(
        &self,
        stripe_subscription_id: &str,
    ) -> Result<Option<Subscription>, DomainError> {
        self.begin_read()?;
        Ok(self
            .rows
            .read()
            .await
            .iter()
            .find(|s| s.stripe_subscription_id == stripe_subscription_id)
            .cloned())
    }

    async fn find_by_user(&self, user_id: &UserId) -> Result<Vec<Subscription>, DomainError> {
        self.begin_read()?;
        let mut found: Vec<Subscription> = self
            .rows
            .read()
            .await
            .iter()
            .filter(|s| s.belongs_to(user_id))
            .cloned()
            .collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(found)
    }

    async fn find_current_for_user(
        &self,
        user_id: &UserId,
    ) -> Result<Option<Subscription>, DomainError> {
        self.begin_read()?;
        Ok(self
            .rows
            .read()
            .await
            .iter()
            .filter(|s| {
                s.belongs_to(user_id)
                    && s.deleted_at.is_none()
                    && SubscriptionStatus::CURRENT_LOOKUP.contains(&s.status)
            })
            .max_by_key(|s| s.created_at)
            .cloned())
    }

    async fn find_access_granting_for_customer(
        &self,
        stripe_customer_id: &str,
    ) -> Result<Vec<Subscription>, DomainError> {
        self.begin_read()?;
        Ok(self
            .rows
            .read()
            .await
            .iter()
            .filter(|s| {
                s.stripe_customer_id == stripe_customer_id
                    && s.deleted_at.is_none()
                    && s.status.grants_access()
            })
            .cloned()
            .collect())
    }

    async fn mark_deleted_for_user(
        &self,
        user_id: &UserId,
        deleted_at: Timestamp,
    ) -> Result<u64, DomainError> {
        let mut rows = self.rows.write().await;
        let mut marked = 0;
        for row in rows
            .iter_mut()
            .filter(|s| s.belongs_to(user_id) && s.deleted_at.is_none())
        {
            row.mark_deleted(deleted_at);
            marked += 1;
        }
        Ok(marked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::subscription::test_support::snapshot;

    fn row(user_id: UserId, id: &str, status: SubscriptionStatus, created_at: Timestamp) -> Subscription {
        Subscription::from_snapshot(user_id, &snapshot(id, status), created_at)
    }

    #[tokio::test]
    async fn duplicate_stripe_id_is_rejected() {
        let repo = InMemorySubscriptionRepository::new();
        let user = UserId::new();
        let sub = row(user, "sub_1", SubscriptionStatus::Active, Timestamp::now());

        repo.insert(&sub).await.unwrap();
        let err = repo.insert(&sub).await.unwrap_err();

        assert_eq!(err.code, ErrorCode::ValidationFailed);
    }

    #[tokio::test]
    async fn current_lookup_prefers_newest_and_skips_past_due() {
        let repo = InMemorySubscriptionRepository::new();
        let user = UserId::new();
        let now = Timestamp::now();
        repo.insert(&row(user, "sub_old", SubscriptionStatus::Canceled, now.minus_days(30)))
            .await
            .unwrap();
        repo.insert(&row(user, "sub_new", SubscriptionStatus::Active, now.minus_days(1)))
            .await
            .unwrap();
        repo.insert(&row(user, "sub_due", SubscriptionStatus::PastDue, now))
            .await
            .unwrap();

        let current = repo.find_current_for_user(&user).await.unwrap().unwrap();

        assert_eq!(current.stripe_subscription_id, "sub_new");
    }

    #[tokio::test]
    async fn deleted_rows_are_not_current() {
        let repo = InMemorySubscriptionRepository::new();
        let user = UserId::new();
        repo.insert(&row(user, "sub_1", SubscriptionStatus::Active, Timestamp::now()))
            .await
            .unwrap();

        assert_eq!(repo.mark_deleted_for_user(&user, Timestamp::now()).await.unwrap(), 1);

        assert!(repo.find_current_for_user(&user).await.unwrap().is_none());
        assert_eq!(repo.mark_deleted_for_user(&user, Timestamp::now()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn injected_read_failures_run_out() {
        let repo = InMemorySubscriptionRepository::new();
        repo.fail_next_reads(1);

        assert!(repo.find_by_stripe_id("sub_1").await.is_err());
        assert!(repo.find_by_stripe_id("sub_1").await.is_ok());
        assert_eq!(repo.read_count(), 2);
    }
}
