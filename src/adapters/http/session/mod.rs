//! HTTP adapter for auth endpoints.
//!
//! - `POST /api/auth/signup|login|refresh|recover|logout`
//! - `PUT /api/auth/user`
//! - `GET /api/auth/oauth/:provider`
//! - `GET /auth/callback`

pub mod dto;
pub mod handlers;
pub mod routes;

pub use routes::{callback_routes, session_routes};
