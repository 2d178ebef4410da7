//! Application layer - Commands, Queries, and Handlers.
//!
//! This layer orchestrates domain operations and coordinates between ports.
//! Command handlers change state at the processor or in the database; query
//! handlers only read.

pub mod handlers;
