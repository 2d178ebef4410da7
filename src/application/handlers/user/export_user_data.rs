//! ExportUserDataHandler - everything stored about the caller.

use std::sync::Arc;

use crate::domain::account::{AccountError, UserDataExport};
use crate::domain::foundation::{Timestamp, UserId};
use crate::ports::{ProfileRepository, SubscriptionRepository, UserAccountRepository};

#[derive(Debug, Clone)]
pub struct ExportUserDataQuery {
    pub user_id: UserId,
}

pub struct ExportUserDataHandler {
    accounts: Arc<dyn UserAccountRepository>,
    profiles: Arc<dyn ProfileRepository>,
    subscriptions: Arc<dyn SubscriptionRepository>,
}

impl ExportUserDataHandler {
    pub fn new(
        accounts: Arc<dyn UserAccountRepository>,
        profiles: Arc<dyn ProfileRepository>,
        subscriptions: Arc<dyn SubscriptionRepository>,
    ) -> Self {
        Self {
            accounts,
            profiles,
            subscriptions,
        }
    }

    pub async fn handle(&self, query: ExportUserDataQuery) -> Result<UserDataExport, AccountError> {
        let failed = |e: crate::domain::foundation::DomainError| {
            tracing::error!(user_id = %query.user_id, error = %e, "User data export failed");
            AccountError::ExportFailed(e.message)
        };

        let (user, profile, subscriptions) = tokio::try_join!(
            self.accounts.find(&query.user_id),
            self.profiles.find_by_user(&query.user_id),
            self.subscriptions.find_by_user(&query.user_id),
        )
        .map_err(failed)?;

        Ok(UserDataExport {
            user,
            profile,
            subscriptions,
            exported_at: Timestamp::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::{
        InMemoryProfileRepository, InMemorySubscriptionRepository, InMemoryUserAccountRepository,
    };
    use crate::domain::foundation::AuthenticatedUser;
    use crate::domain::profile::UserProfile;

    #[tokio::test]
    async fn export_collects_all_user_data() {
        let accounts = Arc::new(InMemoryUserAccountRepository::new());
        let profiles = Arc::new(InMemoryProfileRepository::new());
        let subscriptions = Arc::new(InMemorySubscriptionRepository::new());
        let user = UserId::new();
        accounts
            .ensure(&AuthenticatedUser::new(user, "ada@example.com", None))
            .await
            .unwrap();
        profiles
            .insert(&UserProfile::new_for(user, None, Timestamp::now()))
            .await
            .unwrap();

        let export = ExportUserDataHandler::new(accounts, profiles, subscriptions)
            .handle(ExportUserDataQuery { user_id: user })
            .await
            .unwrap();

        assert_eq!(export.user.unwrap().email, "ada@example.com");
        assert!(export.profile.is_some());
        assert!(export.subscriptions.is_empty());
    }

    #[tokio::test]
    async fn read_failure_fails_export() {
        let subscriptions = Arc::new(InMemorySubscriptionRepository::new());
        subscriptions.fail_next_reads(1);

        let err = ExportUserDataHandler::new(
            Arc::new(InMemoryUserAccountRepository::new()),
            Arc::new(InMemoryProfileRepository::new()),
            subscriptions,
        )
        .handle(ExportUserDataQuery { user_id: UserId::new() })
        .await
        .unwrap_err();

        assert!(matches!(err, AccountError::ExportFailed(_)));
    }
}
