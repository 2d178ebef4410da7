//! Caching decorators for the profile and subscription repositories.
//!
//! Reads of a user's current profile and subscription are served from a
//! [`TtlCache`] and go through the [`RetryPolicy`] on a miss. Writes go
//! straight to the wrapped repository and invalidate the owner's entry.

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::CacheConfig;
use crate::domain::foundation::{DomainError, Timestamp, UserId};
use crate::domain::profile::UserProfile;
use crate::domain::subscription::Subscription;
use crate::ports::{ProfileRepository, SubscriptionRepository};

use super::{RetryPolicy, TtlCache};

// ════════════════════════════════════════════════════════════════════════════════
// Subscriptions
// ════════════════════════════════════════════════════════════════════════════════

/// Subscription repository with a per-user cache of the current subscription.
pub struct CachingSubscriptionRepository {
    inner: Arc<dyn SubscriptionRepository>,
    current: TtlCache<UserId, Option<Subscription>>,
    retry: RetryPolicy,
}

impl CachingSubscriptionRepository {
    pub fn new(inner: Arc<dyn SubscriptionRepository>, config: &CacheConfig) -> Self {
        Self {
            inner,
            current: TtlCache::new(config.ttl()),
            retry: RetryPolicy::from_config(config),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub async fn invalidate(&self, user_id: &UserId) {
        self.current.invalidate(user_id).await;
    }
}

#[async_trait]
impl SubscriptionRepository for CachingSubscriptionRepository {
    async fn insert(&self, subscription: &Subscription) -> Result<(), DomainError> {
        self.inner.insert(subscription).await?;
        self.invalidate(&subscription.user_id).await;
        Ok(())
    }

    async fn update(&self, subscription: &Subscription) -> Result<(), DomainError> {
        self.inner.update(subscription).await?;
        self.invalidate(&subscription.user_id).await;
        Ok(())
    }

    async fn find_by_stripe_id(
        &self,
        stripe_subscription_id: &str,
    ) -> Result<Option<Subscription>, DomainError> {
        self.retry
            .run("find_by_stripe_id", || {
                self.inner.find_by_stripe_id(stripe_subscription_id)
            })
            .await
    }

    async fn find_by_user(&self, user_id: &UserId) -> Result<Vec<Subscription>, DomainError> {
        self.retry
            .run("find_by_user", || self.inner.find_by_user(user_id))
            .await
    }

    async fn find_current_for_user(
        &self,
        user_id: &UserId,
    ) -> Result<Option<Subscription>, DomainError> {
        if let Some(cached) = self.current.get(user_id).await {
            tracing::debug!(user_id = %user_id, "Subscription cache hit");
            return Ok(cached);
        }

        let current = self
            .retry
            .run("find_current_for_user", || {
                self.inner.find_current_for_user(user_id)
            })
            .await?;
        self.current.insert(*user_id, current.clone()).await;
        Ok(current)
    }

    async fn find_access_granting_for_customer(
        &self,
        stripe_customer_id: &str,
    ) -> Result<Vec<Subscription>, DomainError> {
        self.retry
            .run("find_access_granting_for_customer", || {
                self.inner
                    .find_access_granting_for_customer(stripe_customer_id)
            })
            .await
    }

    async fn mark_deleted_for_user(
        &self,
        user_id: &UserId,
        deleted_at: Timestamp,
    ) -> Result<u64, DomainError> {
        let marked = self.inner.mark_deleted_for_user(user_id, deleted_at).await?;
        self.invalidate(user_id).await;
        Ok(marked)
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Profiles
// ════════════════════════════════════════════════════════════════════════════════

/// Profile repository with a per-user profile cache.
pub struct CachingProfileRepository {
    inner: Arc<dyn ProfileRepository>,
    profiles: TtlCache<UserId, UserProfile>,
    retry: RetryPolicy,
}

impl CachingProfileRepository {
    pub fn new(inner: Arc<dyn ProfileRepository>, config: &CacheConfig) -> Self {
        Self {
            inner,
            profiles: TtlCache::new(config.ttl()),
            retry: RetryPolicy::from_config(config),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub async fn invalidate(&self, user_id: &UserId) {
        self.profiles.invalidate(user_id).await;
    }
}

#[async_trait]
impl ProfileRepository for CachingProfileRepository {
    /// Absent profiles are not cached; the caller creates one right away.
    async fn find_by_user(&self, user_id: &UserId) -> Result<Option<UserProfile>, DomainError> {
        if let Some(profile) = self.profiles.get(user_id).await {
            tracing::debug!(user_id = %user_id, "Profile cache hit");
            return Ok(Some(profile));
        }

        let found = self
            .retry
            .run("find_profile", || self.inner.find_by_user(user_id))
            .await?;
        if let Some(profile) = &found {
            self.profiles.insert(*user_id, profile.clone()).await;
        }
        Ok(found)
    }

    async fn insert(&self, profile: &UserProfile) -> Result<UserProfile, DomainError> {
        let stored = self.inner.insert(profile).await?;
        self.profiles.insert(stored.user_id, stored.clone()).await;
        Ok(stored)
    }

    async fn update(&self, profile: &UserProfile) -> Result<(), DomainError> {
        let result = self.inner.update(profile).await;
        self.invalidate(&profile.user_id).await;
        result
    }

    async fn backfill_missing(&self, batch_size: u32) -> Result<u64, DomainError> {
        self.inner.backfill_missing(batch_size).await
    }
}
