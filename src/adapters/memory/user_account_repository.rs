//! In-memory UserAccountRepository.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::account::UserAccount;
use crate::domain::foundation::{AuthenticatedUser, DomainError, ErrorCode, Timestamp, UserId};
use crate::ports::UserAccountRepository;

#[derive(Debug, Clone, Default)]
pub struct InMemoryUserAccountRepository {
    users: Arc<RwLock<HashMap<UserId, UserAccount>>>,
    fail_writes: Arc<AtomicBool>,
}

impl InMemoryUserAccountRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent write fail with a database error.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub async fn add(&self, account: UserAccount) {
        self.users.write().await.insert(account.id, account);
    }

    /// Accounts that are not soft-deleted, oldest first.
    pub async fn active(&self) -> Vec<UserAccount> {
        let mut active: Vec<UserAccount> = self
            .users
            .read()
            .await
            .values()
            .filter(|u| !u.is_deleted)
            .cloned()
            .collect();
        active.sort_by_key(|u| u.created_at);
        active
    }

    fn check_writable(&self) -> Result<(), DomainError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(DomainError::database("database is read-only"));
        }
        Ok(())
    }
}

#[async_trait]
impl UserAccountRepository for InMemoryUserAccountRepository {
    async fn ensure(&self, user: &AuthenticatedUser) -> Result<UserAccount, DomainError> {
        self.check_writable()?;
        let mut users = self.users.write().await;
        let account = users
            .entry(user.id)
            .or_insert_with(|| UserAccount::new(user.id, user.email.clone(), Timestamp::now()));
        account.email = user.email.clone();
        Ok(account.clone())
    }

    async fn find(&self, user_id: &UserId) -> Result<Option<UserAccount>, DomainError> {
        Ok(self.users.read().await.get(user_id).cloned())
    }

    async fn soft_delete(&self, user_id: &UserId, deleted_at: Timestamp) -> Result<(), DomainError> {
        self.check_writable()?;
        self.users
            .write()
            .await
            .get_mut(user_id)
            .map(|account| account.soft_delete(deleted_at))
            .ok_or_else(|| DomainError::new(ErrorCode::UserNotFound, "User not found"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> AuthenticatedUser {
        AuthenticatedUser::new(UserId::new(), "ada@example.com", None)
    }

    #[tokio::test]
    async fn ensure_is_idempotent_and_refreshes_email() {
        let repo = InMemoryUserAccountRepository::new();
        let mut auth = user();
        let first = repo.ensure(&auth).await.unwrap();

        auth.email = "ada@new.example.com".into();
        let second = repo.ensure(&auth).await.unwrap();

        assert_eq!(first.created_at, second.created_at);
        assert_eq!(second.email, "ada@new.example.com");
    }

    #[tokio::test]
    async fn soft_delete_of_unknown_user_is_not_found() {
        let repo = InMemoryUserAccountRepository::new();
        let err = repo.soft_delete(&UserId::new(), Timestamp::now()).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::UserNotFound);
    }

    #[tokio::test]
    async fn soft_deleted_users_are_not_active() {
        let repo = InMemoryUserAccountRepository::new();
        let auth = user();
        repo.ensure(&auth).await.unwrap();

        repo.soft_delete(&auth.id, Timestamp::now()).await.unwrap();

        assert!(repo.active().await.is_empty());
        assert!(repo.find(&auth.id).await.unwrap().unwrap().is_deleted);
    }
}
