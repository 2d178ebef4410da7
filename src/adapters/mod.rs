//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the domain to external systems:
//! - `auth` - Hosted auth platform (session validation, session issuance)
//! - `cache` - TTL read caches with retry in front of the repositories
//! - `http` - axum REST API
//! - `memory` - In-memory repositories for tests and local runs
//! - `postgres` - PostgreSQL repositories
//! - `stripe` - Stripe payment provider

pub mod auth;
pub mod cache;
pub mod http;
pub mod memory;
pub mod postgres;
pub mod stripe;
