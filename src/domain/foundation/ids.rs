//! Strongly-typed identifier value objects.
//!
//! All identifiers are UUIDs. User ids come from the auth platform (`sub`
//! claim), the others are generated locally when rows are created.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::ValidationError;

macro_rules! uuid_identifier {
    ($(#[$meta:meta])* $name:ident, $field:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Creates a new random identifier.
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Wraps an existing UUID.
            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Parses an identifier, reporting the offending field on failure.
            pub fn parse(value: &str) -> Result<Self, ValidationError> {
                let trimmed = value.trim();
                if trimmed.is_empty() {
                    return Err(ValidationError::empty_field($field));
                }
                Uuid::parse_str(trimmed)
                    .map(Self)
                    .map_err(|e| ValidationError::invalid_format($field, e.to_string()))
            }

            /// Returns the inner UUID.
            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = ValidationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::parse(s)
            }
        }
    };
}

uuid_identifier!(
    /// Identifier of an auth platform user.
    UserId,
    "user_id"
);

uuid_identifier!(
    /// Identifier of a local subscription row.
    SubscriptionId,
    "subscription_id"
);

uuid_identifier!(
    /// Identifier of a user profile row.
    ProfileId,
    "profile_id"
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_id_parses_uuid_string() {
        let raw = "6f1c2a5e-0d6b-4c59-9a0e-2f8b1f3f9a11";
        let id = UserId::parse(raw).unwrap();
        assert_eq!(id.to_string(), raw);
    }

    #[test]
    fn user_id_rejects_empty_string() {
        match UserId::parse("   ") {
            Err(ValidationError::EmptyField { field }) => assert_eq!(field, "user_id"),
            other => panic!("Expected EmptyField error, got {:?}", other),
        }
    }

    #[test]
    fn subscription_id_rejects_garbage() {
        match "not-a-uuid".parse::<SubscriptionId>() {
            Err(ValidationError::InvalidFormat { field, .. }) => {
                assert_eq!(field, "subscription_id")
            }
            other => panic!("Expected InvalidFormat error, got {:?}", other),
        }
    }

    #[test]
    fn new_ids_are_unique() {
        assert_ne!(ProfileId::new(), ProfileId::new());
    }

    #[test]
    fn ids_serialize_transparently() {
        let id = UserId::new();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", id));
    }
}
