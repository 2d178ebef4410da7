//! Application handlers.
//!
//! Command and query handlers that orchestrate domain operations.

pub mod subscription;
pub mod user;

pub use subscription::{
    CancelSubscriptionCommand, CancelSubscriptionHandler, CancelSubscriptionResult,
    CurrentSubscription, GetCurrentSubscriptionHandler, GetCurrentSubscriptionQuery,
    HandleWebhookCommand, HandleWebhookHandler, HandleWebhookResult,
    ReactivateSubscriptionCommand, ReactivateSubscriptionHandler, SubscriptionReconciler,
    SyncSubscriptionCommand, SyncSubscriptionHandler, TestConnectionHandler,
    TestConnectionResult, WebhookError,
};
pub use user::{
    BackfillProfilesHandler, DeleteAccountCommand, DeleteAccountHandler, DeleteAccountResult,
    ExportUserDataHandler, ExportUserDataQuery, GetProfileHandler, GetProfileQuery,
    UpdateProfileCommand, UpdateProfileHandler, BACKFILL_BATCH_SIZE,
};
