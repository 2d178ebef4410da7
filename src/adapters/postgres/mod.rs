//! PostgreSQL adapters - Database implementations for repository ports.
//!
//! - `PostgresSubscriptionRepository` - local mirror of processor subscriptions
//! - `PostgresProfileRepository` - user profiles and settings
//! - `PostgresUserAccountRepository` - local users table with soft deletes

mod profile_repository;
mod subscription_repository;
mod user_account_repository;

pub use profile_repository::PostgresProfileRepository;
pub use subscription_repository::PostgresSubscriptionRepository;
pub use user_account_repository::PostgresUserAccountRepository;
