//! saas-account - accounts, profiles and Stripe subscriptions for a SaaS app.
//!
//! Users sign in through a hosted auth platform, keep a profile, and pay
//! through Stripe. The local database mirrors the processor's subscription
//! state, kept current by webhooks and explicit sync calls.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
