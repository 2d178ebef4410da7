//! Read caching and retry.
//!
//! - [`TtlCache`] - per-process map with a fixed time-to-live
//! - [`RetryPolicy`] - exponential backoff for transient read failures
//! - Caching decorators that put both in front of the repositories

mod cached_repositories;
mod retry;
mod ttl_cache;

pub use cached_repositories::{CachingProfileRepository, CachingSubscriptionRepository};
pub use retry::RetryPolicy;
pub use ttl_cache::TtlCache;
