//! User profile aggregate and partial updates.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{ProfileId, Timestamp, UserId, ValidationError};

use super::{NotificationPreferences, ThemePreference};

pub const DEFAULT_LANGUAGE: &str = "en";
pub const DEFAULT_CURRENCY: &str = "USD";
pub const DEFAULT_TIMEZONE: &str = "America/New_York";

const MAX_SHORT_FIELD: usize = 100;
const MAX_BIO: usize = 1000;
const MAX_URL: usize = 2048;

/// Profile and settings of one auth user. Exactly one per user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: ProfileId,
    pub user_id: UserId,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub display_name: Option<String>,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
    pub phone_number: Option<String>,
    pub country: Option<String>,
    pub city: Option<String>,
    pub postal_code: Option<String>,
    pub language: String,
    pub currency: String,
    pub timezone: String,
    pub theme_preference: ThemePreference,
    pub notification_preferences: NotificationPreferences,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl UserProfile {
    /// Row columns a client may send back but never changes.
    pub const READ_ONLY_FIELDS: [&'static str; 4] = ["id", "user_id", "created_at", "updated_at"];

    /// A fresh profile with default preferences. The display name is seeded
    /// from the auth platform when known.
    pub fn new_for(user_id: UserId, display_name: Option<String>, now: Timestamp) -> Self {
        Self {
            id: ProfileId::new(),
            user_id,
            first_name: None,
            last_name: None,
            display_name,
            bio: None,
            avatar_url: None,
            phone_number: None,
            country: None,
            city: None,
            postal_code: None,
            language: DEFAULT_LANGUAGE.to_string(),
            currency: DEFAULT_CURRENCY.to_string(),
            timezone: DEFAULT_TIMEZONE.to_string(),
            theme_preference: ThemePreference::default(),
            notification_preferences: NotificationPreferences::default(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Applies a validated partial update and bumps `updated_at`.
    pub fn apply(&mut self, update: ProfileUpdate, now: Timestamp) -> Result<(), ValidationError> {
        update.validate()?;

        merge_optional(&mut self.first_name, update.first_name);
        merge_optional(&mut self.last_name, update.last_name);
        merge_optional(&mut self.display_name, update.display_name);
        merge_optional(&mut self.bio, update.bio);
        merge_optional(&mut self.avatar_url, update.avatar_url);
        merge_optional(&mut self.phone_number, update.phone_number);
        merge_optional(&mut self.country, update.country);
        merge_optional(&mut self.city, update.city);
        merge_optional(&mut self.postal_code, update.postal_code);

        if let Some(language) = update.language {
            self.language = language;
        }
        if let Some(currency) = update.currency {
            self.currency = currency.to_uppercase();
        }
        if let Some(timezone) = update.timezone {
            self.timezone = timezone;
        }
        if let Some(theme) = update.theme_preference {
            self.theme_preference = theme;
        }
        if let Some(prefs) = update.notification_preferences {
            self.notification_preferences = prefs;
        }

        self.updated_at = now;
        Ok(())
    }
}

/// Present fields overwrite; an empty string clears an optional field.
fn merge_optional(target: &mut Option<String>, value: Option<String>) {
    if let Some(value) = value {
        let trimmed = value.trim();
        *target = if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        };
    }
}

/// Partial profile update. Absent fields are left untouched.
///
/// Unknown fields are rejected so a typo never silently drops data. The
/// read-only row columns are stripped before parsing, see
/// [`UserProfile::READ_ONLY_FIELDS`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProfileUpdate {
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub postal_code: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub timezone: Option<String>,
    #[serde(default)]
    pub theme_preference: Option<ThemePreference>,
    #[serde(default)]
    pub notification_preferences: Option<NotificationPreferences>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self == &ProfileUpdate::default()
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        let short_fields = [
            ("first_name", &self.first_name),
            ("last_name", &self.last_name),
            ("display_name", &self.display_name),
            ("phone_number", &self.phone_number),
            ("country", &self.country),
            ("city", &self.city),
            ("postal_code", &self.postal_code),
            ("timezone", &self.timezone),
        ];
        for (field, value) in short_fields {
            check_length(field, value.as_deref(), MAX_SHORT_FIELD)?;
        }
        check_length("bio", self.bio.as_deref(), MAX_BIO)?;
        check_length("avatar_url", self.avatar_url.as_deref(), MAX_URL)?;

        if let Some(url) = self.avatar_url.as_deref().map(str::trim) {
            if !url.is_empty() && !(url.starts_with("https://") || url.starts_with("http://")) {
                return Err(ValidationError::invalid_format(
                    "avatar_url",
                    "must be an http(s) URL",
                ));
            }
        }

        for (field, value) in [("language", &self.language), ("timezone", &self.timezone)] {
            if matches!(value.as_deref().map(str::trim), Some("")) {
                return Err(ValidationError::empty_field(field));
            }
        }
        check_length("language", self.language.as_deref(), 16)?;

        if let Some(currency) = &self.currency {
            if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_alphabetic()) {
                return Err(ValidationError::invalid_format(
                    "currency",
                    "expected a three-letter ISO 4217 code",
                ));
            }
        }

        Ok(())
    }
}

fn check_length(field: &str, value: Option<&str>, max: usize) -> Result<(), ValidationError> {
    match value {
        Some(v) if v.chars().count() > max => {
            Err(ValidationError::too_long(field, max, v.chars().count()))
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile() -> UserProfile {
        UserProfile::new_for(UserId::new(), None, Timestamp::now().minus_days(1))
    }

    // ══════════════════════════════════════════════════════════════
    // Creation
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn new_profile_uses_default_preferences() {
        let p = UserProfile::new_for(UserId::new(), Some("Ada".into()), Timestamp::now());

        assert_eq!(p.display_name.as_deref(), Some("Ada"));
        assert_eq!(p.language, "en");
        assert_eq!(p.currency, "USD");
        assert_eq!(p.timezone, "America/New_York");
        assert_eq!(p.theme_preference, ThemePreference::System);
        assert_eq!(p.created_at, p.updated_at);
    }

    // ══════════════════════════════════════════════════════════════
    // Partial updates
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn apply_only_touches_present_fields() {
        let mut p = profile();
        p.city = Some("Lisbon".into());
        let now = Timestamp::now();

        p.apply(
            ProfileUpdate {
                first_name: Some("  Grace ".into()),
                theme_preference: Some(ThemePreference::Dark),
                ..Default::default()
            },
            now,
        )
        .unwrap();

        assert_eq!(p.first_name.as_deref(), Some("Grace"));
        assert_eq!(p.city.as_deref(), Some("Lisbon"));
        assert_eq!(p.theme_preference, ThemePreference::Dark);
        assert_eq!(p.updated_at, now);
    }

    #[test]
    fn empty_string_clears_optional_field() {
        let mut p = profile();
        p.bio = Some("hello".into());

        p.apply(
            ProfileUpdate {
                bio: Some(String::new()),
                ..Default::default()
            },
            Timestamp::now(),
        )
        .unwrap();

        assert!(p.bio.is_none());
    }

    #[test]
    fn currency_is_normalized_to_uppercase() {
        let mut p = profile();
        p.apply(
            ProfileUpdate {
                currency: Some("eur".into()),
                ..Default::default()
            },
            Timestamp::now(),
        )
        .unwrap();
        assert_eq!(p.currency, "EUR");
    }

    #[test]
    fn notification_preferences_are_replaced_whole() {
        let mut p = profile();
        let prefs = NotificationPreferences {
            email_notifications: false,
            marketing_emails: true,
            in_app_notifications: false,
        };
        p.apply(
            ProfileUpdate {
                notification_preferences: Some(prefs),
                ..Default::default()
            },
            Timestamp::now(),
        )
        .unwrap();
        assert_eq!(p.notification_preferences, prefs);
    }

    #[test]
    fn rejected_update_leaves_profile_untouched() {
        let mut p = profile();
        let before = p.clone();

        let result = p.apply(
            ProfileUpdate {
                first_name: Some("Ok".into()),
                bio: Some("x".repeat(MAX_BIO + 1)),
                ..Default::default()
            },
            Timestamp::now(),
        );

        assert!(matches!(result, Err(ValidationError::TooLong { .. })));
        assert_eq!(p, before);
    }

    // ══════════════════════════════════════════════════════════════
    // Validation
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn avatar_must_be_http_url() {
        let update = ProfileUpdate {
            avatar_url: Some("javascript:alert(1)".into()),
            ..Default::default()
        };
        assert!(matches!(
            update.validate(),
            Err(ValidationError::InvalidFormat { .. })
        ));
    }

    #[test]
    fn blank_language_is_rejected() {
        let update = ProfileUpdate {
            language: Some("  ".into()),
            ..Default::default()
        };
        assert!(matches!(
            update.validate(),
            Err(ValidationError::EmptyField { .. })
        ));
    }

    #[test]
    fn currency_must_be_three_letters() {
        let update = ProfileUpdate {
            currency: Some("US".into()),
            ..Default::default()
        };
        assert!(update.validate().is_err());
    }

    #[test]
    fn unknown_fields_fail_to_deserialize() {
        let result: Result<ProfileUpdate, _> =
            serde_json::from_str(r#"{"first_name":"A","is_admin":true}"#);
        assert!(result.is_err());
    }

    #[test]
    fn empty_update_is_detected() {
        let update: ProfileUpdate = serde_json::from_str("{}").unwrap();
        assert!(update.is_empty());
    }
}
