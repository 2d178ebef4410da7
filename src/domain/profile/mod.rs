//! Profile domain - per-user personal data and settings.
//!
//! A profile is created lazily the first time it is read and then changed
//! through partial [`ProfileUpdate`]s.

mod aggregate;
mod errors;
mod preferences;

pub use aggregate::{
    ProfileUpdate, UserProfile, DEFAULT_CURRENCY, DEFAULT_LANGUAGE, DEFAULT_TIMEZONE,
};
pub use errors::ProfileError;
pub use preferences::{NotificationPreferences, ThemePreference};
