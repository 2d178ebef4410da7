//! Local subscription rows and their reconciliation with processor data.
//!
//! The payment processor owns subscription state. A [`Subscription`] is the
//! local cache of it, refreshed from a [`SubscriptionSnapshot`] whenever a
//! webhook arrives or a user triggers a billing action.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{SubscriptionId, Timestamp, UserId};

use super::SubscriptionStatus;

/// The processor's view of a subscription at one point in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionSnapshot {
    /// Processor subscription id (`sub_...`).
    pub id: String,

    /// Processor customer id (`cus_...`).
    pub customer_id: String,

    pub status: SubscriptionStatus,

    /// Price of the first subscription item, when the processor sent items.
    pub price_id: Option<String>,

    pub current_period_end: Timestamp,

    pub cancel_at_period_end: bool,

    /// When the subscription ended, set once it is fully canceled.
    pub ended_at: Option<Timestamp>,
}

/// A local subscription row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    pub id: SubscriptionId,
    pub user_id: UserId,
    pub stripe_customer_id: String,
    pub stripe_subscription_id: String,
    pub status: SubscriptionStatus,
    pub price_id: Option<String>,
    pub cancel_at_period_end: bool,
    pub current_period_end: Timestamp,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub deleted_at: Option<Timestamp>,
}

impl Subscription {
    /// Creates a row for `user_id` from processor data.
    pub fn from_snapshot(user_id: UserId, snapshot: &SubscriptionSnapshot, now: Timestamp) -> Self {
        Self {
            id: SubscriptionId::new(),
            user_id,
            stripe_customer_id: snapshot.customer_id.clone(),
            stripe_subscription_id: snapshot.id.clone(),
            status: snapshot.status,
            price_id: snapshot.price_id.clone(),
            cancel_at_period_end: snapshot.cancel_at_period_end,
            current_period_end: snapshot.current_period_end,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    /// Overwrites processor-owned fields with the snapshot.
    ///
    /// The price is only replaced when the snapshot carries one; lifecycle
    /// events for some API versions omit subscription items.
    pub fn apply_snapshot(&mut self, snapshot: &SubscriptionSnapshot, now: Timestamp) {
        self.status = snapshot.status;
        self.cancel_at_period_end = snapshot.cancel_at_period_end;
        self.current_period_end = snapshot.current_period_end;
        if snapshot.price_id.is_some() {
            self.price_id = snapshot.price_id.clone();
        }
        self.updated_at = now;
    }

    /// Applies a processor deletion: the period ends when the subscription
    /// ended and nothing remains scheduled.
    pub fn apply_deletion(&mut self, snapshot: &SubscriptionSnapshot, now: Timestamp) {
        self.status = snapshot.status;
        self.cancel_at_period_end = false;
        self.current_period_end = snapshot.ended_at.unwrap_or(now);
        self.updated_at = now;
    }

    /// Soft-deletes the row as part of closing the owning account.
    pub fn mark_deleted(&mut self, now: Timestamp) {
        self.status = SubscriptionStatus::Canceled;
        self.deleted_at = Some(now);
        self.updated_at = now;
    }

    /// A subscription is valid while it grants access and its paid period
    /// has not run out.
    pub fn is_valid(&self, now: Timestamp) -> bool {
        self.deleted_at.is_none()
            && self.status.grants_access()
            && self.current_period_end.is_after(&now)
    }

    pub fn belongs_to(&self, user_id: &UserId) -> bool {
        &self.user_id == user_id
    }
}
