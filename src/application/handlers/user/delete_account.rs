//! DeleteAccountHandler - closes a user's account.

use std::sync::Arc;

use futures::future::join_all;

use crate::domain::account::AccountError;
use crate::domain::foundation::{ErrorCode, Timestamp, UserId};
use crate::domain::subscription::Subscription;
use crate::ports::{PaymentProvider, SubscriptionRepository, UserAccountRepository};

#[derive(Debug, Clone)]
pub struct DeleteAccountCommand {
    /// The authenticated caller.
    pub caller: UserId,
    /// The `userId` the request names, unparsed.
    pub user_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteAccountResult {
    /// Subscriptions canceled at the processor.
    pub canceled: usize,
    /// Local subscription rows marked deleted.
    pub marked_deleted: u64,
}

/// Handler for account deletion.
///
/// Steps run in order and only the soft delete is fatal:
/// 1. Cancel access-granting subscriptions immediately at the processor
/// 2. Soft-delete the user row
/// 3. Mark the user's subscription rows canceled and deleted
pub struct DeleteAccountHandler {
    accounts: Arc<dyn UserAccountRepository>,
    subscriptions: Arc<dyn SubscriptionRepository>,
    payment_provider: Arc<dyn PaymentProvider>,
}

impl DeleteAccountHandler {
    pub fn new(
        accounts: Arc<dyn UserAccountRepository>,
        subscriptions: Arc<dyn SubscriptionRepository>,
        payment_provider: Arc<dyn PaymentProvider>,
    ) -> Self {
        Self {
            accounts,
            subscriptions,
            payment_provider,
        }
    }

    pub async fn handle(&self, cmd: DeleteAccountCommand) -> Result<DeleteAccountResult, AccountError> {
        let raw = cmd
            .user_id
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or(AccountError::MissingUserId)?;
        let user_id =
            UserId::parse(raw).map_err(|e| AccountError::InvalidUserId(e.to_string()))?;
        if user_id != cmd.caller {
            return Err(AccountError::Forbidden);
        }

        let canceled = self.cancel_active_subscriptions(&user_id).await;

        let now = Timestamp::now();
        match self.accounts.soft_delete(&user_id, now).await {
            Ok(()) => {}
            // Never mirrored locally, so there is no row to flag.
            Err(e) if e.code == ErrorCode::UserNotFound => {
                tracing::warn!(user_id = %user_id, "No local account row to soft-delete");
            }
            Err(e) => {
                tracing::error!(user_id = %user_id, error = %e, "Failed to soft-delete user");
                return Err(AccountError::SoftDeleteFailed(e.message));
            }
        }

        let marked_deleted = match self.subscriptions.mark_deleted_for_user(&user_id, now).await {
            Ok(count) => count,
            Err(e) => {
                tracing::error!(user_id = %user_id, error = %e, "Failed to mark subscriptions deleted");
                0
            }
        };

        tracing::info!(user_id = %user_id, canceled, marked_deleted, "Account deleted");
        Ok(DeleteAccountResult {
            canceled,
            marked_deleted,
        })
    }

    async fn cancel_active_subscriptions(&self, user_id: &UserId) -> usize {
        let subscriptions = match self.subscriptions.find_by_user(user_id).await {
            Ok(subscriptions) => subscriptions,
            Err(e) => {
                tracing::error!(user_id = %user_id, error = %e, "Failed to list subscriptions");
                return 0;
            }
        };

        let active: Vec<&Subscription> = subscriptions
            .iter()
            .filter(|s| s.deleted_at.is_none() && s.status.grants_access())
            .collect();

        let results = join_all(active.iter().map(|s| {
            self.payment_provider
                .cancel_subscription_now(&s.stripe_subscription_id)
        }))
        .await;

        let mut canceled = 0;
        for (subscription, result) in active.iter().zip(results) {
            match result {
                Ok(_) => canceled += 1,
                Err(e) => tracing::error!(
                    user_id = %user_id,
                    subscription_id = %subscription.stripe_subscription_id,
                    error = %e,
                    "Failed to cancel subscription"
                ),
            }
        }
        canceled
    }
}
