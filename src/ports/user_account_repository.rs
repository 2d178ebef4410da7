//! User account repository port.

use async_trait::async_trait;

use crate::domain::account::UserAccount;
use crate::domain::foundation::{AuthenticatedUser, DomainError, Timestamp, UserId};

/// Repository for the local `users` mirror.
#[async_trait]
pub trait UserAccountRepository: Send + Sync {
    /// Makes sure a row exists for the authenticated user, refreshing the
    /// email if it changed at the auth platform.
    async fn ensure(&self, user: &AuthenticatedUser) -> Result<UserAccount, DomainError>;

    async fn find(&self, user_id: &UserId) -> Result<Option<UserAccount>, DomainError>;

    /// Sets `is_deleted` and `deleted_at`.
    ///
    /// # Errors
    ///
    /// Returns `UserNotFound` if there is no row for the user.
    async fn soft_delete(&self, user_id: &UserId, deleted_at: Timestamp)
        -> Result<(), DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_account_repository_is_object_safe() {
        fn _accepts_dyn(_repo: &dyn UserAccountRepository) {}
    }
}
