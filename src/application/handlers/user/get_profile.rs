//! GetProfileHandler - returns the caller's profile, creating it on first use.

use std::sync::Arc;

use crate::domain::foundation::{AuthenticatedUser, Timestamp};
use crate::domain::profile::{ProfileError, UserProfile};
use crate::ports::{ProfileRepository, UserAccountRepository};

#[derive(Debug, Clone)]
pub struct GetProfileQuery {
    pub user: AuthenticatedUser,
}

pub struct GetProfileHandler {
    accounts: Arc<dyn UserAccountRepository>,
    profiles: Arc<dyn ProfileRepository>,
}

impl GetProfileHandler {
    pub fn new(
        accounts: Arc<dyn UserAccountRepository>,
        profiles: Arc<dyn ProfileRepository>,
    ) -> Self {
        Self { accounts, profiles }
    }

    pub async fn handle(&self, query: GetProfileQuery) -> Result<UserProfile, ProfileError> {
        load_or_create(self.accounts.as_ref(), self.profiles.as_ref(), &query.user).await
    }
}

/// Finds the user's profile, creating the account mirror and a default
/// profile when this is the first request for them.
pub(crate) async fn load_or_create(
    accounts: &dyn UserAccountRepository,
    profiles: &dyn ProfileRepository,
    user: &AuthenticatedUser,
) -> Result<UserProfile, ProfileError> {
    if let Some(profile) = profiles.find_by_user(&user.id).await.map_err(ProfileError::fetch)? {
        return Ok(profile);
    }

    accounts.ensure(user).await.map_err(ProfileError::create)?;

    let profile = UserProfile::new_for(user.id, user.display_name.clone(), Timestamp::now());
    let stored = profiles.insert(&profile).await.map_err(|e| {
        tracing::error!(user_id = %user.id, error = %e, "Failed to create profile");
        ProfileError::create(e)
    })?;

    tracing::info!(user_id = %user.id, "Profile created");
    Ok(stored)
}
