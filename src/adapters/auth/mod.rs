//! Authentication adapters.
//!
//! Implementations of the `SessionValidator` and `AuthProvider` ports:
//!
//! - `supabase` - Hosted GoTrue platform (HS256 tokens, REST session API)
//! - `mock` - Test implementations that don't require external services

mod mock;
mod supabase;

pub use mock::{MockAuthProvider, MockSessionValidator};
pub use supabase::{SupabaseAuthProvider, SupabaseSessionValidator};
