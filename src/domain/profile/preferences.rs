//! Display and notification preferences stored on a profile.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::ValidationError;

/// UI theme the user picked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemePreference {
    Light,
    Dark,
    #[default]
    System,
}

impl ThemePreference {
    pub fn as_str(&self) -> &'static str {
        match self {
            ThemePreference::Light => "light",
            ThemePreference::Dark => "dark",
            ThemePreference::System => "system",
        }
    }
}

impl fmt::Display for ThemePreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ThemePreference {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "light" => Ok(ThemePreference::Light),
            "dark" => Ok(ThemePreference::Dark),
            "system" => Ok(ThemePreference::System),
            other => Err(ValidationError::invalid_format(
                "theme_preference",
                format!("expected light, dark or system, got '{}'", other),
            )),
        }
    }
}

/// Which notification channels the user accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationPreferences {
    pub email_notifications: bool,
    pub marketing_emails: bool,
    pub in_app_notifications: bool,
}

impl Default for NotificationPreferences {
    /// Service notifications on, marketing off.
    fn default() -> Self {
        Self {
            email_notifications: true,
            marketing_emails: false,
            in_app_notifications: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn theme_defaults_to_system() {
        assert_eq!(ThemePreference::default(), ThemePreference::System);
    }

    #[test]
    fn theme_parses_lowercase_names() {
        assert_eq!("dark".parse::<ThemePreference>().unwrap(), ThemePreference::Dark);
        assert!("Dark".parse::<ThemePreference>().is_err());
    }

    #[test]
    fn theme_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&ThemePreference::Light).unwrap(),
            "\"light\""
        );
    }

    #[test]
    fn marketing_is_opt_in() {
        let prefs = NotificationPreferences::default();
        assert!(prefs.email_notifications);
        assert!(prefs.in_app_notifications);
        assert!(!prefs.marketing_emails);
    }
}
