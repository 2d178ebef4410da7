//! Subscription domain - processor-backed billing state.
//!
//! The payment processor is the source of truth for every subscription.
//! This module holds the local mirror of that state and the rules used to
//! keep it consistent:
//!
//! - [`SubscriptionStatus`] - processor lifecycle statuses
//! - [`Subscription`] - local row, refreshed from a [`SubscriptionSnapshot`]
//! - [`PendingSubscriptions`] - bridge for out-of-order webhook delivery
//! - [`BillingError`] - errors for billing actions and reconciliation

mod aggregate;
mod errors;
mod pending;
mod status;

pub use aggregate::{Subscription, SubscriptionSnapshot};
pub use errors::BillingError;
pub use pending::{CheckoutLink, PendingSubscriptions};
pub use status::SubscriptionStatus;

#[cfg(test)]
pub(crate) use aggregate::test_support;
