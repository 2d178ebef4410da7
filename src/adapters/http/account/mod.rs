//! HTTP adapter for user account endpoints.
//!
//! - `GET /api/user/profile` - The caller's profile
//! - `PUT /api/user/profile` - Partial profile update
//! - `GET /api/user/subscription` - The caller's latest subscription
//! - `GET /api/user/export` - Data export
//! - `DELETE /api/user/delete?userId=` - Close the account

pub mod dto;
pub mod handlers;
pub mod routes;

pub use routes::account_routes;
