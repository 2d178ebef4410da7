//! PostgreSQL implementation of UserAccountRepository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::account::UserAccount;
use crate::domain::foundation::{AuthenticatedUser, DomainError, ErrorCode, Timestamp, UserId};
use crate::ports::UserAccountRepository;

pub struct PostgresUserAccountRepository {
    pool: PgPool,
}

impl PostgresUserAccountRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    email: String,
    created_at: DateTime<Utc>,
    is_deleted: bool,
    deleted_at: Option<DateTime<Utc>>,
}

impl From<UserRow> for UserAccount {
    fn from(row: UserRow) -> Self {
        UserAccount {
            id: UserId::from_uuid(row.id),
            email: row.email,
            created_at: Timestamp::from_datetime(row.created_at),
            is_deleted: row.is_deleted,
            deleted_at: row.deleted_at.map(Timestamp::from_datetime),
        }
    }
}

#[async_trait]
impl UserAccountRepository for PostgresUserAccountRepository {
    async fn ensure(&self, user: &AuthenticatedUser) -> Result<UserAccount, DomainError> {
        let row: UserRow = sqlx::query_as(
            r#"
            INSERT INTO users (id, email, created_at)
            VALUES ($1, $2, NOW())
            ON CONFLICT (id) DO UPDATE SET email = EXCLUDED.email
            RETURNING id, email, created_at, is_deleted, deleted_at
            "#,
        )
        .bind(user.id.as_uuid())
        .bind(&user.email)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to ensure user: {}", e)))?;

        Ok(row.into())
    }

    async fn find(&self, user_id: &UserId) -> Result<Option<UserAccount>, DomainError> {
        let row: Option<UserRow> = sqlx::query_as(
            r#"
            SELECT id, email, created_at, is_deleted, deleted_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(user_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to find user: {}", e)))?;

        Ok(row.map(UserAccount::from))
    }

    async fn soft_delete(
        &self,
        user_id: &UserId,
        deleted_at: Timestamp,
    ) -> Result<(), DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE users SET is_deleted = TRUE, deleted_at = $2
            WHERE id = $1
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(deleted_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to soft-delete user: {}", e)))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::new(ErrorCode::UserNotFound, "User not found"));
        }

        Ok(())
    }
}
