//! Account domain - the local mirror of an auth user.
//!
//! Accounts are never removed. Closing one soft-deletes it: the row stays
//! with `is_deleted` set so billing history remains auditable.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::foundation::{ErrorCode, Timestamp, UserId};
use crate::domain::profile::UserProfile;
use crate::domain::subscription::Subscription;

/// A user account row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserAccount {
    pub id: UserId,
    pub email: String,
    pub created_at: Timestamp,
    pub is_deleted: bool,
    pub deleted_at: Option<Timestamp>,
}

impl UserAccount {
    pub fn new(id: UserId, email: impl Into<String>, now: Timestamp) -> Self {
        Self {
            id,
            email: email.into(),
            created_at: now,
            is_deleted: false,
            deleted_at: None,
        }
    }

    pub fn soft_delete(&mut self, now: Timestamp) {
        self.is_deleted = true;
        self.deleted_at = Some(now);
    }
}

/// Everything stored about a user, as handed out by a data export.
#[derive(Debug, Clone, Serialize)]
pub struct UserDataExport {
    pub user: Option<UserAccount>,
    pub profile: Option<UserProfile>,
    pub subscriptions: Vec<Subscription>,
    #[serde(rename = "exportedAt")]
    pub exported_at: Timestamp,
}

/// Errors from account-level operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccountError {
    #[error("User ID is required")]
    MissingUserId,

    #[error("Invalid user ID: {0}")]
    InvalidUserId(String),

    /// Callers may only act on their own account.
    #[error("Cannot act on another user's account")]
    Forbidden,

    #[error("Failed to update profile: {0}")]
    SoftDeleteFailed(String),

    #[error("Failed to export user data: {0}")]
    ExportFailed(String),
}

impl AccountError {
    pub fn code(&self) -> ErrorCode {
        match self {
            AccountError::MissingUserId | AccountError::InvalidUserId(_) => {
                ErrorCode::ValidationFailed
            }
            AccountError::Forbidden => ErrorCode::Forbidden,
            AccountError::SoftDeleteFailed(_) | AccountError::ExportFailed(_) => {
                ErrorCode::DatabaseError
            }
        }
    }

    /// The message shown to clients.
    pub fn public_message(&self) -> String {
        match self {
            AccountError::SoftDeleteFailed(_) => "Failed to update profile".to_string(),
            AccountError::ExportFailed(_) => "Failed to export user data".to_string(),
            other => other.to_string(),
        }
    }
}
