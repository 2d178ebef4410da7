//! In-memory ProfileRepository.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::foundation::{DomainError, ErrorCode, Timestamp, UserId};
use crate::domain::profile::UserProfile;
use crate::ports::ProfileRepository;

use super::InMemoryUserAccountRepository;

#[derive(Debug, Clone, Default)]
pub struct InMemoryProfileRepository {
    profiles: Arc<RwLock<HashMap<UserId, UserProfile>>>,
    /// Source of users for backfills. Without it, backfills find nothing.
    users: Option<InMemoryUserAccountRepository>,
    fail_writes: Arc<AtomicBool>,
}

impl InMemoryProfileRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_users(users: InMemoryUserAccountRepository) -> Self {
        Self {
            users: Some(users),
            ..Self::default()
        }
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub async fn count(&self) -> usize {
        self.profiles.read().await.len()
    }

    fn check_writable(&self) -> Result<(), DomainError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(DomainError::database("database is read-only"));
        }
        Ok(())
    }
}

#[async_trait]
impl ProfileRepository for InMemoryProfileRepository {
    async fn find_by_user(&self, user_id: &UserId) -> Result<Option<UserProfile>, DomainError> {
        Ok(self.profiles.read().await.get(user_id).cloned())
    }

    async fn insert(&self, profile: &UserProfile) -> Result<UserProfile, DomainError> {
        self.check_writable()?;
        Ok(self
            .profiles
            .write()
            .await
            .entry(profile.user_id)
            .or_insert_with(|| profile.clone())
            .clone())
    }

    async fn update(&self, profile: &UserProfile) -> Result<(), DomainError> {
        self.check_writable()?;
        let mut profiles = self.profiles.write().await;
        let stored = profiles
            .get_mut(&profile.user_id)
            .ok_or_else(|| DomainError::new(ErrorCode::ProfileNotFound, "Profile not found"))?;
        *stored = profile.clone();
        Ok(())
    }

    async fn backfill_missing(&self, batch_size: u32) -> Result<u64, DomainError> {
        self.check_writable()?;
        let Some(users) = &self.users else {
            return Ok(0);
        };

        let active = users.active().await;
        let mut profiles = self.profiles.write().await;
        let now = Timestamp::now();
        let mut created = 0;
        for user in active
            .iter()
            .filter(|u| !profiles.contains_key(&u.id))
            .take(batch_size as usize)
            .collect::<Vec<_>>()
        {
            profiles.insert(user.id, UserProfile::new_for(user.id, None, now));
            created += 1;
        }
        Ok(created)
    }
}
