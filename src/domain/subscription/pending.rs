//! In-process bridge for out-of-order webhook delivery.
//!
//! The processor does not guarantee that `checkout.session.completed`
//! arrives before `customer.subscription.created`. Whichever event arrives
//! first leaves a note here so the second one can finish the link.
//!
//! Entries live for the lifetime of the process only. Multiple server
//! instances each keep their own registry.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use crate::domain::foundation::UserId;

/// How long a half-linked note is kept. The processor retries undelivered
/// events for days, but the two checkout events normally land seconds apart.
pub const PENDING_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// What a completed checkout tells us about a subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutLink {
    pub user_id: UserId,
    pub customer_id: String,
}

#[derive(Debug, Default)]
struct PendingState {
    /// Checkout sessions whose subscription row is not written yet.
    checkout_links: HashMap<String, (CheckoutLink, Instant)>,

    /// Ids of subscriptions seen before any checkout session named them.
    unlinked: HashMap<String, Instant>,
}

impl PendingState {
    fn prune(&mut self, now: Instant, ttl: Duration) {
        let fresh = |noted: &Instant| now.saturating_duration_since(*noted) < ttl;
        self.checkout_links.retain(|_, (_, noted)| fresh(noted));
        self.unlinked.retain(|_, noted| fresh(noted));
    }
}

/// Registry of half-linked subscriptions, keyed by processor subscription id.
///
/// Notes older than the TTL are dropped whenever a new one is recorded, so
/// events whose counterpart never arrives do not accumulate.
#[derive(Debug)]
pub struct PendingSubscriptions {
    state: Mutex<PendingState>,
    ttl: Duration,
}

impl Default for PendingSubscriptions {
    fn default() -> Self {
        Self::with_ttl(PENDING_TTL)
    }
}

impl PendingSubscriptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            state: Mutex::new(PendingState::default()),
            ttl,
        }
    }

    fn lock(&self) -> MutexGuard<'_, PendingState> {
        // A panic while holding the lock leaves plain maps behind; keep using them.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn remember_checkout(&self, subscription_id: &str, link: CheckoutLink) {
        let now = Instant::now();
        let mut state = self.lock();
        state.prune(now, self.ttl);
        state
            .checkout_links
            .insert(subscription_id.to_string(), (link, now));
    }

    pub fn checkout_link(&self, subscription_id: &str) -> Option<CheckoutLink> {
        let state = self.lock();
        state
            .checkout_links
            .get(subscription_id)
            .filter(|(_, noted)| noted.elapsed() < self.ttl)
            .map(|(link, _)| link.clone())
    }

    pub fn remember_unlinked(&self, subscription_id: &str) {
        let now = Instant::now();
        let mut state = self.lock();
        state.prune(now, self.ttl);
        state.unlinked.insert(subscription_id.to_string(), now);
    }

    pub fn is_unlinked(&self, subscription_id: &str) -> bool {
        self.lock()
            .unlinked
            .get(subscription_id)
            .is_some_and(|noted| noted.elapsed() < self.ttl)
    }

    /// Drops every note about the subscription once its row exists or the
    /// subscription is gone.
    pub fn forget(&self, subscription_id: &str) {
        let mut state = self.lock();
        state.checkout_links.remove(subscription_id);
        state.unlinked.remove(subscription_id);
    }

    pub fn len(&self) -> usize {
        let state = self.lock();
        state.checkout_links.len() + state.unlinked.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn link() -> CheckoutLink {
        CheckoutLink {
            user_id: UserId::new(),
            customer_id: "cus_1".to_string(),
        }
    }

    #[test]
    fn checkout_link_is_retrievable_until_forgotten() {
        let pending = PendingSubscriptions::new();
        let link = link();

        pending.remember_checkout("sub_1", link.clone());
        assert_eq!(pending.checkout_link("sub_1"), Some(link));

        pending.forget("sub_1");
        assert_eq!(pending.checkout_link("sub_1"), None);
        assert!(pending.is_empty());
    }

    #[test]
    fn unlinked_subscriptions_are_tracked_by_id() {
        let pending = PendingSubscriptions::new();

        pending.remember_unlinked("sub_2");

        assert!(pending.is_unlinked("sub_2"));
        assert!(!pending.is_unlinked("sub_3"));
        assert_eq!(pending.len(), 1);
    }

    #[test]
    fn forget_clears_both_maps() {
        let pending = PendingSubscriptions::new();
        pending.remember_checkout("sub_1", link());
        pending.remember_unlinked("sub_1");

        pending.forget("sub_1");

        assert!(pending.is_empty());
    }

    #[test]
    fn expired_notes_are_hidden_and_pruned_on_next_insert() {
        let pending = PendingSubscriptions::with_ttl(Duration::from_millis(20));
        pending.remember_unlinked("sub_old");
        pending.remember_checkout("sub_old_checkout", link());

        std::thread::sleep(Duration::from_millis(40));
        assert!(!pending.is_unlinked("sub_old"));
        assert_eq!(pending.checkout_link("sub_old_checkout"), None);
        assert_eq!(pending.len(), 2);

        pending.remember_unlinked("sub_new");

        assert_eq!(pending.len(), 1);
        assert!(pending.is_unlinked("sub_new"));
    }

    #[test]
    fn fresh_notes_survive_pruning() {
        let pending = PendingSubscriptions::new();
        pending.remember_checkout("sub_1", link());

        pending.remember_unlinked("sub_2");

        assert!(pending.checkout_link("sub_1").is_some());
        assert!(pending.is_unlinked("sub_2"));
        assert_eq!(pending.len(), 2);
    }
}
