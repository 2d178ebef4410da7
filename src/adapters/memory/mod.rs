//! In-memory repositories.
//!
//! Used by tests and by local runs without a database. They follow the
//! same lookup rules as the PostgreSQL adapters, and expose a few hooks
//! (read counters, injected failures) for asserting on caching and retry.

mod profile_repository;
mod subscription_repository;
mod user_account_repository;

pub use profile_repository::InMemoryProfileRepository;
pub use subscription_repository::InMemorySubscriptionRepository;
pub use user_account_repository::InMemoryUserAccountRepository;
