//! GetCurrentSubscriptionHandler - the caller's latest subscription.

use std::sync::Arc;

use serde::Serialize;

use crate::domain::foundation::{Timestamp, UserId};
use crate::domain::subscription::{BillingError, Subscription};
use crate::ports::SubscriptionRepository;

#[derive(Debug, Clone)]
pub struct GetCurrentSubscriptionQuery {
    pub user_id: UserId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CurrentSubscription {
    pub subscription: Option<Subscription>,
    #[serde(rename = "isSubscriber")]
    pub is_subscriber: bool,
}

pub struct GetCurrentSubscriptionHandler {
    repository: Arc<dyn SubscriptionRepository>,
}

impl GetCurrentSubscriptionHandler {
    pub fn new(repository: Arc<dyn SubscriptionRepository>) -> Self {
        Self { repository }
    }

    pub async fn handle(
        &self,
        query: GetCurrentSubscriptionQuery,
    ) -> Result<CurrentSubscription, BillingError> {
        let subscription = self.repository.find_current_for_user(&query.user_id).await?;
        let is_subscriber = subscription
            .as_ref()
            .is_some_and(|s| s.is_valid(Timestamp::now()));

        Ok(CurrentSubscription {
            subscription,
            is_subscriber,
        })
    }
}
