//! Subscription repository port - persistence of local subscription rows.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, Timestamp, UserId};
use crate::domain::subscription::Subscription;

/// Repository for the `subscriptions` table.
///
/// Rows are addressed by the processor's subscription id, which is unique.
#[async_trait]
pub trait SubscriptionRepository: Send + Sync {
    /// Inserts a new row.
    async fn insert(&self, subscription: &Subscription) -> Result<(), DomainError>;

    /// Overwrites an existing row, matched by processor subscription id.
    ///
    /// # Errors
    ///
    /// Returns `SubscriptionNotFound` if no row matches.
    async fn update(&self, subscription: &Subscription) -> Result<(), DomainError>;

    async fn find_by_stripe_id(
        &self,
        stripe_subscription_id: &str,
    ) -> Result<Option<Subscription>, DomainError>;

    /// All rows for a user, newest first, including soft-deleted ones.
    async fn find_by_user(&self, user_id: &UserId) -> Result<Vec<Subscription>, DomainError>;

    /// The newest non-deleted row whose status is active, trialing or
    /// canceled.
    async fn find_current_for_user(
        &self,
        user_id: &UserId,
    ) -> Result<Option<Subscription>, DomainError>;

    /// Non-deleted rows for a processor customer that currently grant access.
    async fn find_access_granting_for_customer(
        &self,
        stripe_customer_id: &str,
    ) -> Result<Vec<Subscription>, DomainError>;

    /// Soft-deletes every row of a user and marks them canceled.
    ///
    /// Returns the number of rows touched.
    async fn mark_deleted_for_user(
        &self,
        user_id: &UserId,
        deleted_at: Timestamp,
    ) -> Result<u64, DomainError>;
}
