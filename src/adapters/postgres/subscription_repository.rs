//! PostgreSQL implementation of SubscriptionRepository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::foundation::{DomainError, ErrorCode, SubscriptionId, Timestamp, UserId};
use crate::domain::subscription::{Subscription, SubscriptionStatus};
use crate::ports::SubscriptionRepository;

const COLUMNS: &str = "id, user_id, stripe_customer_id, stripe_subscription_id, status, \
     price_id, cancel_at_period_end, current_period_end, created_at, updated_at, deleted_at";

/// PostgreSQL implementation of the SubscriptionRepository port.
pub struct PostgresSubscriptionRepository {
    pool: PgPool,
}

impl PostgresSubscriptionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Database row representation of a subscription.
#[derive(Debug, sqlx::FromRow)]
struct SubscriptionRow {
    id: Uuid,
    user_id: Uuid,
    stripe_customer_id: String,
    stripe_subscription_id: String,
    status: String,
    price_id: Option<String>,
    cancel_at_period_end: bool,
    current_period_end: DateTime<Utc>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,
}

impl TryFrom<SubscriptionRow> for Subscription {
    type Error = DomainError;

    fn try_from(row: SubscriptionRow) -> Result<Self, Self::Error> {
        Ok(Subscription {
            id: SubscriptionId::from_uuid(row.id),
            user_id: UserId::from_uuid(row.user_id),
            stripe_customer_id: row.stripe_customer_id,
            stripe_subscription_id: row.stripe_subscription_id,
            status: parse_status(&row.status)?,
            price_id: row.price_id,
            cancel_at_period_end: row.cancel_at_period_end,
            current_period_end: Timestamp::from_datetime(row.current_period_end),
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
            deleted_at: row.deleted_at.map(Timestamp::from_datetime),
        })
    }
}

fn parse_status(s: &str) -> Result<SubscriptionStatus, DomainError> {
    s.parse().map_err(|_| {
        DomainError::database(format!("Invalid subscription status value: {}", s))
    })
}

fn db_error(action: &str, e: sqlx::Error) -> DomainError {
    DomainError::database(format!("Failed to {}: {}", action, e))
}

#[async_trait]
impl SubscriptionRepository for PostgresSubscriptionRepository {
    async fn insert(&self, subscription: &Subscription) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO subscriptions (
                id, user_id, stripe_customer_id, stripe_subscription_id, status, price_id,
                cancel_at_period_end, current_period_end, created_at, updated_at, deleted_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(subscription.id.as_uuid())
        .bind(subscription.user_id.as_uuid())
        .bind(&subscription.stripe_customer_id)
        .bind(&subscription.stripe_subscription_id)
        .bind(subscription.status.as_str())
        .bind(&subscription.price_id)
        .bind(subscription.cancel_at_period_end)
        .bind(subscription.current_period_end.as_datetime())
        .bind(subscription.created_at.as_datetime())
        .bind(subscription.updated_at.as_datetime())
        .bind(subscription.deleted_at.map(|t| *t.as_datetime()))
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.constraint() == Some("subscriptions_stripe_subscription_id_key") {
                    return DomainError::new(
                        ErrorCode::ValidationFailed,
                        "Subscription already recorded",
                    )
                    .with_detail("stripe_subscription_id", &subscription.stripe_subscription_id);
                }
            }
            db_error("insert subscription", e)
        })?;

        Ok(())
    }

    async fn update(&self, subscription: &Subscription) -> Result<(), DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE subscriptions SET
                user_id = $2,
                stripe_customer_id = $3,
                status = $4,
                price_id = $5,
                cancel_at_period_end = $6,
                current_period_end = $7,
                updated_at = $8,
                deleted_at = $9
            WHERE stripe_subscription_id = $1
            "#,
        )
        .bind(&subscription.stripe_subscription_id)
        .bind(subscription.user_id.as_uuid())
        .bind(&subscription.stripe_customer_id)
        .bind(subscription.status.as_str())
        .bind(&subscription.price_id)
        .bind(subscription.cancel_at_period_end)
        .bind(subscription.current_period_end.as_datetime())
        .bind(subscription.updated_at.as_datetime())
        .bind(subscription.deleted_at.map(|t| *t.as_datetime()))
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("update subscription", e))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::new(
                ErrorCode::SubscriptionNotFound,
                "Subscription not found",
            ));
        }

        Ok(())
    }

    async fn find_by_stripe_id(
        &self,
        stripe_subscription_id: &str,
    ) -> Result<Option<Subscription>, DomainError> {
        let row: Option<SubscriptionRow> = sqlx::query_as(&format!(
            "SELECT {} FROM subscriptions WHERE stripe_subscription_id = $1",
            COLUMNS
        ))
        .bind(stripe_subscription_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("find subscription", e))?;

        row.map(Subscription::try_from).transpose()
    }

    async fn find_by_user(&self, user_id: &UserId) -> Result<Vec<Subscription>, DomainError> {
        let rows: Vec<SubscriptionRow> = sqlx::query_as(&format!(
            "SELECT {} FROM subscriptions WHERE user_id = $1 ORDER BY created_at DESC",
            COLUMNS
        ))
        .bind(user_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("list subscriptions", e))?;

        rows.into_iter().map(Subscription::try_from).collect()
    }

    async fn find_current_for_user(
        &self,
        user_id: &UserId,
    ) -> Result<Option<Subscription>, DomainError> {
        let statuses: Vec<String> = SubscriptionStatus::CURRENT_LOOKUP
            .iter()
            .map(|s| s.as_str().to_string())
            .collect();

        let row: Option<SubscriptionRow> = sqlx::query_as(&format!(
            r#"
            SELECT {} FROM subscriptions
            WHERE user_id = $1
              AND deleted_at IS NULL
              AND status = ANY($2)
            ORDER BY created_at DESC
            LIMIT 1
            "#,
            COLUMNS
        ))
        .bind(user_id.as_uuid())
        .bind(statuses)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("find current subscription", e))?;

        row.map(Subscription::try_from).transpose()
    }

    async fn find_access_granting_for_customer(
        &self,
        stripe_customer_id: &str,
    ) -> Result<Vec<Subscription>, DomainError> {
        let rows: Vec<SubscriptionRow> = sqlx::query_as(&format!(
            r#"
            SELECT {} FROM subscriptions
            WHERE stripe_customer_id = $1
              AND deleted_at IS NULL
              AND status IN ('active', 'trialing')
            ORDER BY created_at DESC
            "#,
            COLUMNS
        ))
        .bind(stripe_customer_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("find customer subscriptions", e))?;

        rows.into_iter().map(Subscription::try_from).collect()
    }

    async fn mark_deleted_for_user(
        &self,
        user_id: &UserId,
        deleted_at: Timestamp,
    ) -> Result<u64, DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE subscriptions SET
                status = 'canceled',
                deleted_at = $2,
                updated_at = $2
            WHERE user_id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(deleted_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("mark subscriptions deleted", e))?;

        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(status: &str) -> SubscriptionRow {
        let now = Utc::now();
        SubscriptionRow {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            stripe_customer_id: "cus_1".into(),
            stripe_subscription_id: "sub_1".into(),
            status: status.into(),
            price_id: None,
            cancel_at_period_end: true,
            current_period_end: now,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    #[test]
    fn row_converts_to_subscription() {
        let r = row("past_due");
        let user = r.user_id;

        let sub = Subscription::try_from(r).unwrap();

        assert_eq!(sub.status, SubscriptionStatus::PastDue);
        assert_eq!(*sub.user_id.as_uuid(), user);
        assert!(sub.cancel_at_period_end);
        assert!(sub.deleted_at.is_none());
    }

    #[test]
    fn unknown_status_in_row_is_a_database_error() {
        let err = Subscription::try_from(row("cancelled")).unwrap_err();
        assert_eq!(err.code, ErrorCode::DatabaseError);
    }

    #[test]
    fn status_literals_match_wire_strings() {
        // The access-granting query hardcodes these literals.
        assert_eq!(SubscriptionStatus::Active.as_str(), "active");
        assert_eq!(SubscriptionStatus::Trialing.as_str(), "trialing");
        assert_eq!(SubscriptionStatus::Canceled.as_str(), "canceled");
    }
}
