//! Profile repository port.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, UserId};
use crate::domain::profile::UserProfile;

/// Repository for the `user_profiles` table. One row per user.
#[async_trait]
pub trait ProfileRepository: Send + Sync {
    async fn find_by_user(&self, user_id: &UserId) -> Result<Option<UserProfile>, DomainError>;

    /// Inserts a profile. If the user already has one (a concurrent first
    /// read won the race), the stored profile is returned instead.
    async fn insert(&self, profile: &UserProfile) -> Result<UserProfile, DomainError>;

    /// Overwrites the user's profile.
    ///
    /// # Errors
    ///
    /// Returns `ProfileNotFound` if the user has no profile.
    async fn update(&self, profile: &UserProfile) -> Result<(), DomainError>;

    /// Creates default profiles for up to `batch_size` users that have none.
    ///
    /// Returns how many profiles were created. Callers loop until zero.
    async fn backfill_missing(&self, batch_size: u32) -> Result<u64, DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profile_repository_is_object_safe() {
        fn _accepts_dyn(_repo: &dyn ProfileRepository) {}
    }
}
