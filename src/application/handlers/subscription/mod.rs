//! Subscription handlers.
//!
//! ## Commands
//! - Processing processor webhooks
//! - Cancelling, reactivating and syncing a subscription
//!
//! ## Queries
//! - The caller's current subscription
//! - Processor connectivity

mod cancel_subscription;
mod get_current_subscription;
mod handle_webhook;
mod reactivate_subscription;
mod reconciler;
mod sync_subscription;
mod test_connection;

// Commands
pub use cancel_subscription::{
    CancelSubscriptionCommand, CancelSubscriptionHandler, CancelSubscriptionResult,
};
pub use handle_webhook::{
    HandleWebhookCommand, HandleWebhookHandler, HandleWebhookResult, WebhookError,
};
pub use reactivate_subscription::{ReactivateSubscriptionCommand, ReactivateSubscriptionHandler};
pub use reconciler::SubscriptionReconciler;
pub use sync_subscription::{SyncSubscriptionCommand, SyncSubscriptionHandler};

// Queries
pub use get_current_subscription::{
    CurrentSubscription, GetCurrentSubscriptionHandler, GetCurrentSubscriptionQuery,
};
pub use test_connection::{TestConnectionHandler, TestConnectionResult};
