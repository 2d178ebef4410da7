//! HTTP adapter for billing endpoints.
//!
//! Exposes Stripe-backed subscription management:
//! - `POST /api/stripe/webhook` - Handle Stripe webhooks
//! - `POST /api/stripe/cancel` - Cancel at period end
//! - `POST /api/stripe/reactivate` - Undo a scheduled cancellation
//! - `POST /api/stripe/sync` - Pull a subscription from Stripe
//! - `GET /api/stripe/test` - Check Stripe connectivity

pub mod dto;
pub mod handlers;
pub mod routes;

pub use routes::billing_routes;
