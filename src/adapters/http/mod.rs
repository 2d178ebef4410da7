//! HTTP adapters - REST API implementations.
//!
//! Each area has its own module with DTOs, handlers and routes:
//! - `billing` - Stripe webhook and subscription actions (`/api/stripe`)
//! - `account` - profile, subscription, export and deletion (`/api/user`)
//! - `session` - sign-in, sessions and OAuth (`/api/auth`, `/auth/callback`)

pub mod account;
pub mod billing;
pub mod cookies;
pub mod error;
pub mod middleware;
pub mod router;
pub mod session;
pub mod state;

pub use error::{ApiError, ErrorResponse};
pub use router::api_router;
pub use state::AppState;
