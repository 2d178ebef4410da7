//! Shared application state for the HTTP layer.

use std::sync::Arc;

use crate::adapters::http::middleware::AuthState;
use crate::application::handlers::{
    CancelSubscriptionHandler, DeleteAccountHandler, ExportUserDataHandler,
    GetCurrentSubscriptionHandler, GetProfileHandler, HandleWebhookHandler,
    ReactivateSubscriptionHandler, SubscriptionReconciler, SyncSubscriptionHandler,
    TestConnectionHandler, UpdateProfileHandler,
};
use crate::domain::subscription::PendingSubscriptions;
use crate::ports::{
    AuthProvider, PaymentProvider, ProfileRepository, SubscriptionRepository,
    UserAccountRepository,
};

/// Shared application state containing all dependencies.
///
/// This struct is cloned for each request and contains Arc-wrapped
/// dependencies. Handlers are built on demand from it.
#[derive(Clone)]
pub struct AppState {
    pub subscription_repository: Arc<dyn SubscriptionRepository>,
    pub profile_repository: Arc<dyn ProfileRepository>,
    pub account_repository: Arc<dyn UserAccountRepository>,
    pub payment_provider: Arc<dyn PaymentProvider>,
    pub auth_provider: Arc<dyn AuthProvider>,
    pub session_validator: AuthState,

    /// Bridges out-of-order webhook deliveries. One per process.
    pub pending_subscriptions: Arc<PendingSubscriptions>,

    /// Masked Stripe key shown by the connectivity check.
    pub stripe_key_prefix: String,

    /// Public origin of the web app, used for auth redirects.
    pub site_url: String,

    /// Adds `Secure` to session cookies.
    pub secure_cookies: bool,
}

impl AppState {
    fn reconciler(&self) -> SubscriptionReconciler {
        SubscriptionReconciler::new(
            self.subscription_repository.clone(),
            self.payment_provider.clone(),
        )
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Billing
    // ════════════════════════════════════════════════════════════════════════════

    pub fn webhook_handler(&self) -> HandleWebhookHandler {
        HandleWebhookHandler::new(self.reconciler(), self.pending_subscriptions.clone())
    }

    pub fn cancel_handler(&self) -> CancelSubscriptionHandler {
        CancelSubscriptionHandler::new(self.reconciler())
    }

    pub fn reactivate_handler(&self) -> ReactivateSubscriptionHandler {
        ReactivateSubscriptionHandler::new(self.reconciler())
    }

    pub fn sync_handler(&self) -> SyncSubscriptionHandler {
        SyncSubscriptionHandler::new(self.reconciler())
    }

    pub fn test_connection_handler(&self) -> TestConnectionHandler {
        TestConnectionHandler::new(self.payment_provider.clone(), self.stripe_key_prefix.clone())
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Users
    // ════════════════════════════════════════════════════════════════════════════

    pub fn get_profile_handler(&self) -> GetProfileHandler {
        GetProfileHandler::new(
            self.account_repository.clone(),
            self.profile_repository.clone(),
        )
    }

    pub fn update_profile_handler(&self) -> UpdateProfileHandler {
        UpdateProfileHandler::new(
            self.account_repository.clone(),
            self.profile_repository.clone(),
        )
    }

    pub fn current_subscription_handler(&self) -> GetCurrentSubscriptionHandler {
        GetCurrentSubscriptionHandler::new(self.subscription_repository.clone())
    }

    pub fn delete_account_handler(&self) -> DeleteAccountHandler {
        DeleteAccountHandler::new(
            self.account_repository.clone(),
            self.subscription_repository.clone(),
            self.payment_provider.clone(),
        )
    }

    pub fn export_handler(&self) -> ExportUserDataHandler {
        ExportUserDataHandler::new(
            self.account_repository.clone(),
            self.profile_repository.clone(),
            self.subscription_repository.clone(),
        )
    }

    /// Where the auth platform sends the browser after OAuth and email links.
    pub fn auth_callback_url(&self) -> String {
        format!("{}/auth/callback", self.site_url.trim_end_matches('/'))
    }
}
