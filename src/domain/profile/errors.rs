//! Profile error types.

use thiserror::Error;

use crate::domain::foundation::{DomainError, ErrorCode, ValidationError};

/// Errors from reading or changing a user profile.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProfileError {
    /// The update body was not a valid profile change.
    #[error("Invalid update data: {0}")]
    InvalidUpdate(String),

    #[error("Failed to fetch profile: {0}")]
    FetchFailed(String),

    #[error("Failed to create profile: {0}")]
    CreateFailed(String),

    #[error("Failed to update profile: {0}")]
    UpdateFailed(String),
}

impl ProfileError {
    pub fn code(&self) -> ErrorCode {
        match self {
            ProfileError::InvalidUpdate(_) => ErrorCode::ValidationFailed,
            ProfileError::FetchFailed(_)
            | ProfileError::CreateFailed(_)
            | ProfileError::UpdateFailed(_) => ErrorCode::DatabaseError,
        }
    }

    /// The message shown to clients. Internal causes stay in the logs.
    pub fn public_message(&self) -> &'static str {
        match self {
            ProfileError::InvalidUpdate(_) => "Invalid update data",
            ProfileError::FetchFailed(_) => "Failed to fetch profile",
            ProfileError::CreateFailed(_) => "Failed to create profile",
            ProfileError::UpdateFailed(_) => "Failed to update profile",
        }
    }

    pub fn fetch(err: DomainError) -> Self {
        ProfileError::FetchFailed(err.message)
    }

    pub fn create(err: DomainError) -> Self {
        ProfileError::CreateFailed(err.message)
    }

    pub fn update(err: DomainError) -> Self {
        ProfileError::UpdateFailed(err.message)
    }
}

impl From<ValidationError> for ProfileError {
    fn from(err: ValidationError) -> Self {
        ProfileError::InvalidUpdate(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_messages_hide_causes() {
        let err = ProfileError::fetch(DomainError::database("relation does not exist"));
        assert_eq!(err.public_message(), "Failed to fetch profile");
        assert!(err.to_string().contains("relation does not exist"));
    }

    #[test]
    fn validation_errors_become_invalid_update() {
        let err: ProfileError = ValidationError::empty_field("language").into();
        assert_eq!(err.code(), ErrorCode::ValidationFailed);
        assert_eq!(err.public_message(), "Invalid update data");
    }
}
