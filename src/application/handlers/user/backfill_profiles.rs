//! BackfillProfilesHandler - creates profiles for users that have none.

use std::sync::Arc;

use crate::domain::foundation::DomainError;
use crate::ports::ProfileRepository;

/// Users handled per round trip.
pub const BACKFILL_BATCH_SIZE: u32 = 20;

/// Runs profile backfill batches until a batch comes back short.
///
/// Safe to run repeatedly: each batch only picks users without a profile.
pub struct BackfillProfilesHandler {
    profiles: Arc<dyn ProfileRepository>,
    batch_size: u32,
}

impl BackfillProfilesHandler {
    pub fn new(profiles: Arc<dyn ProfileRepository>) -> Self {
        Self {
            profiles,
            batch_size: BACKFILL_BATCH_SIZE,
        }
    }

    pub fn with_batch_size(mut self, batch_size: u32) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Returns the number of profiles created.
    pub async fn handle(&self) -> Result<u64, DomainError> {
        let mut total = 0;
        loop {
            let created = self.profiles.backfill_missing(self.batch_size).await?;
            total += created;
            tracing::debug!(created, total, "Profile backfill batch done");
            if created < u64::from(self.batch_size) {
                break;
            }
        }

        if total > 0 {
            tracing::info!(created = total, "Backfilled missing profiles");
        }
        Ok(total)
    }
}
