//! UpdateProfileHandler - partial profile updates.

use std::sync::Arc;

use crate::domain::foundation::{AuthenticatedUser, Timestamp};
use crate::domain::profile::{ProfileError, ProfileUpdate, UserProfile};
use crate::ports::{ProfileRepository, UserAccountRepository};

use super::get_profile::load_or_create;

#[derive(Debug, Clone)]
pub struct UpdateProfileCommand {
    pub user: AuthenticatedUser,
    pub update: ProfileUpdate,
}

impl UpdateProfileCommand {
    /// Builds a command from a request body.
    ///
    /// The body must be a JSON object of profile fields. Read-only row
    /// columns are ignored, so a fetched profile can be sent back as is. An
    /// empty object only bumps `updated_at`.
    pub fn from_json(user: AuthenticatedUser, body: serde_json::Value) -> Result<Self, ProfileError> {
        let serde_json::Value::Object(mut fields) = body else {
            return Err(ProfileError::InvalidUpdate("body must be a JSON object".into()));
        };
        for column in UserProfile::READ_ONLY_FIELDS {
            fields.remove(column);
        }
        let update: ProfileUpdate = serde_json::from_value(serde_json::Value::Object(fields))
            .map_err(|e| ProfileError::InvalidUpdate(e.to_string()))?;
        Ok(Self { user, update })
    }
}

pub struct UpdateProfileHandler {
    accounts: Arc<dyn UserAccountRepository>,
    profiles: Arc<dyn ProfileRepository>,
}

impl UpdateProfileHandler {
    pub fn new(
        accounts: Arc<dyn UserAccountRepository>,
        profiles: Arc<dyn ProfileRepository>,
    ) -> Self {
        Self { accounts, profiles }
    }

    pub async fn handle(&self, cmd: UpdateProfileCommand) -> Result<UserProfile, ProfileError> {
        let mut profile =
            load_or_create(self.accounts.as_ref(), self.profiles.as_ref(), &cmd.user).await?;

        profile.apply(cmd.update, Timestamp::now())?;

        self.profiles.update(&profile).await.map_err(|e| {
            tracing::error!(user_id = %cmd.user.id, error = %e, "Failed to update profile");
            ProfileError::update(e)
        })?;

        tracing::debug!(user_id = %cmd.user.id, "Profile updated");
        Ok(profile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::{InMemoryProfileRepository, InMemoryUserAccountRepository};
    use crate::domain::foundation::UserId;
    use crate::domain::profile::ThemePreference;
    use serde_json::json;

    fn user() -> AuthenticatedUser {
        AuthenticatedUser::new(UserId::new(), "ada@example.com", None)
    }

    fn handler(profiles: Arc<InMemoryProfileRepository>) -> UpdateProfileHandler {
        UpdateProfileHandler::new(Arc::new(InMemoryUserAccountRepository::new()), profiles)
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Body parsing
    // ════════════════════════════════════════════════════════════════════════════

    #[test]
    fn non_object_body_is_invalid() {
        let err = UpdateProfileCommand::from_json(user(), json!(["city"])).unwrap_err();
        assert_eq!(err.public_message(), "Invalid update data");
    }

    #[test]
    fn unknown_field_is_invalid() {
        assert!(UpdateProfileCommand::from_json(user(), json!({"nickname": "ada"})).is_err());
    }

    #[test]
    fn empty_object_is_an_empty_update() {
        let cmd = UpdateProfileCommand::from_json(user(), json!({})).unwrap();
        assert!(cmd.update.is_empty());
    }

    #[test]
    fn read_only_columns_are_ignored() {
        let cmd = UpdateProfileCommand::from_json(
            user(),
            json!({
                "id": "not-ours",
                "user_id": "not-ours",
                "first_name": "Ada",
                "created_at": "2024-01-01T00:00:00Z",
                "updated_at": "2024-01-01T00:00:00Z"
            }),
        )
        .unwrap();

        assert_eq!(cmd.update.first_name.as_deref(), Some("Ada"));
    }

    #[test]
    fn wrongly_typed_known_field_is_invalid() {
        assert!(UpdateProfileCommand::from_json(user(), json!({"first_name": 42})).is_err());
    }

    #[test]
    fn bad_theme_is_invalid() {
        assert!(UpdateProfileCommand::from_json(user(), json!({"theme_preference": "neon"})).is_err());
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Handler
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn applies_partial_update() {
        let profiles = Arc::new(InMemoryProfileRepository::new());
        let user = user();
        let cmd = UpdateProfileCommand::from_json(
            user.clone(),
            json!({"city": "Lisbon", "theme_preference": "dark"}),
        )
        .unwrap();

        let profile = handler(profiles.clone()).handle(cmd).await.unwrap();

        assert_eq!(profile.city.as_deref(), Some("Lisbon"));
        assert_eq!(profile.theme_preference, ThemePreference::Dark);
        assert_eq!(profile.language, "en");
        let stored = profiles.find_by_user(&user.id).await.unwrap().unwrap();
        assert_eq!(stored.city.as_deref(), Some("Lisbon"));
    }

    #[tokio::test]
    async fn overlong_field_is_invalid() {
        let cmd = UpdateProfileCommand::from_json(user(), json!({"bio": "x".repeat(5000)})).unwrap();

        let err = handler(Arc::new(InMemoryProfileRepository::new()))
            .handle(cmd)
            .await
            .unwrap_err();

        assert!(matches!(err, ProfileError::InvalidUpdate(_)));
    }

    #[tokio::test]
    async fn storage_failure_is_update_failure() {
        let profiles = Arc::new(InMemoryProfileRepository::new());
        let user = user();
        profiles
            .insert(&UserProfile::new_for(user.id, None, Timestamp::now()))
            .await
            .unwrap();
        profiles.fail_writes(true);
        let cmd = UpdateProfileCommand::from_json(user, json!({"city": "Lisbon"})).unwrap();

        let err = handler(profiles).handle(cmd).await.unwrap_err();

        assert_eq!(err.public_message(), "Failed to update profile");
    }
}
