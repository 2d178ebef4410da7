//! Domain layer - pure business types and rules.
//!
//! Nothing in here performs I/O. Adapters reach the domain only through
//! the traits in [`crate::ports`].

pub mod account;
pub mod foundation;
pub mod profile;
pub mod subscription;
