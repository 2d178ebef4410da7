//! User handlers.
//!
//! ## Commands
//! - Updating the caller's profile
//! - Deleting the caller's account
//! - Backfilling missing profiles at startup
//!
//! ## Queries
//! - The caller's profile (created on first read)
//! - Data export

mod backfill_profiles;
mod delete_account;
mod export_user_data;
mod get_profile;
mod update_profile;

// Commands
pub use backfill_profiles::{BackfillProfilesHandler, BACKFILL_BATCH_SIZE};
pub use delete_account::{DeleteAccountCommand, DeleteAccountHandler, DeleteAccountResult};
pub use update_profile::{UpdateProfileCommand, UpdateProfileHandler};

// Queries
pub use export_user_data::{ExportUserDataHandler, ExportUserDataQuery};
pub use get_profile::{GetProfileHandler, GetProfileQuery};
