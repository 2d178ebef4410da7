//! PostgreSQL implementation of ProfileRepository.
//!
//! Notification preferences are stored as a JSONB document so new channels
//! can be added without a migration.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::foundation::{DomainError, ErrorCode, ProfileId, Timestamp, UserId};
use crate::domain::profile::{NotificationPreferences, ThemePreference, UserProfile};
use crate::ports::ProfileRepository;

const COLUMNS: &str = "id, user_id, first_name, last_name, display_name, bio, avatar_url, \
     phone_number, country, city, postal_code, language, currency, timezone, \
     theme_preference, notification_preferences, created_at, updated_at";

/// PostgreSQL implementation of the ProfileRepository port.
pub struct PostgresProfileRepository {
    pool: PgPool,
}

impl PostgresProfileRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch(&self, user_id: &UserId) -> Result<Option<UserProfile>, DomainError> {
        let row: Option<ProfileRow> = sqlx::query_as(&format!(
            "SELECT {} FROM user_profiles WHERE user_id = $1",
            COLUMNS
        ))
        .bind(user_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to find profile: {}", e)))?;

        row.map(UserProfile::try_from).transpose()
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ProfileRow {
    id: Uuid,
    user_id: Uuid,
    first_name: Option<String>,
    last_name: Option<String>,
    display_name: Option<String>,
    bio: Option<String>,
    avatar_url: Option<String>,
    phone_number: Option<String>,
    country: Option<String>,
    city: Option<String>,
    postal_code: Option<String>,
    language: String,
    currency: String,
    timezone: String,
    theme_preference: String,
    notification_preferences: Json<NotificationPreferences>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ProfileRow> for UserProfile {
    type Error = DomainError;

    fn try_from(row: ProfileRow) -> Result<Self, Self::Error> {
        let theme: ThemePreference = row.theme_preference.parse().map_err(|_| {
            DomainError::database(format!(
                "Invalid theme_preference value: {}",
                row.theme_preference
            ))
        })?;

        Ok(UserProfile {
            id: ProfileId::from_uuid(row.id),
            user_id: UserId::from_uuid(row.user_id),
            first_name: row.first_name,
            last_name: row.last_name,
            display_name: row.display_name,
            bio: row.bio,
            avatar_url: row.avatar_url,
            phone_number: row.phone_number,
            country: row.country,
            city: row.city,
            postal_code: row.postal_code,
            language: row.language,
            currency: row.currency,
            timezone: row.timezone,
            theme_preference: theme,
            notification_preferences: row.notification_preferences.0,
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
        })
    }
}

#[async_trait]
impl ProfileRepository for PostgresProfileRepository {
    async fn find_by_user(&self, user_id: &UserId) -> Result<Option<UserProfile>, DomainError> {
        self.fetch(user_id).await
    }

    async fn insert(&self, profile: &UserProfile) -> Result<UserProfile, DomainError> {
        let result = sqlx::query(
            r#"
            INSERT INTO user_profiles (
                id, user_id, first_name, last_name, display_name, bio, avatar_url,
                phone_number, country, city, postal_code, language, currency, timezone,
                theme_preference, notification_preferences, created_at, updated_at
            ) VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18
            )
            ON CONFLICT (user_id) DO NOTHING
            "#,
        )
        .bind(profile.id.as_uuid())
        .bind(profile.user_id.as_uuid())
        .bind(&profile.first_name)
        .bind(&profile.last_name)
        .bind(&profile.display_name)
        .bind(&profile.bio)
        .bind(&profile.avatar_url)
        .bind(&profile.phone_number)
        .bind(&profile.country)
        .bind(&profile.city)
        .bind(&profile.postal_code)
        .bind(&profile.language)
        .bind(&profile.currency)
        .bind(&profile.timezone)
        .bind(profile.theme_preference.as_str())
        .bind(Json(profile.notification_preferences))
        .bind(profile.created_at.as_datetime())
        .bind(profile.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to create profile: {}", e)))?;

        if result.rows_affected() == 1 {
            return Ok(profile.clone());
        }

        // Lost a race with a concurrent first read; hand back the winner.
        self.fetch(&profile.user_id).await?.ok_or_else(|| {
            DomainError::database("Profile insert conflicted but no profile exists")
        })
    }

    async fn update(&self, profile: &UserProfile) -> Result<(), DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE user_profiles SET
                first_name = $2,
                last_name = $3,
                display_name = $4,
                bio = $5,
                avatar_url = $6,
                phone_number = $7,
                country = $8,
                city = $9,
                postal_code = $10,
                language = $11,
                currency = $12,
                timezone = $13,
                theme_preference = $14,
                notification_preferences = $15,
                updated_at = $16
            WHERE user_id = $1
            "#,
        )
        .bind(profile.user_id.as_uuid())
        .bind(&profile.first_name)
        .bind(&profile.last_name)
        .bind(&profile.display_name)
        .bind(&profile.bio)
        .bind(&profile.avatar_url)
        .bind(&profile.phone_number)
        .bind(&profile.country)
        .bind(&profile.city)
        .bind(&profile.postal_code)
        .bind(&profile.language)
        .bind(&profile.currency)
        .bind(&profile.timezone)
        .bind(profile.theme_preference.as_str())
        .bind(Json(profile.notification_preferences))
        .bind(profile.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to update profile: {}", e)))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::new(
                ErrorCode::ProfileNotFound,
                "Profile not found",
            ));
        }

        Ok(())
    }

    async fn backfill_missing(&self, batch_size: u32) -> Result<u64, DomainError> {
        let result = sqlx::query(
            r#"
            WITH missing AS (
                SELECT u.id
                FROM users u
                LEFT JOIN user_profiles p ON p.user_id = u.id
                WHERE p.id IS NULL AND NOT u.is_deleted
                ORDER BY u.created_at
                LIMIT $1
            )
            INSERT INTO user_profiles (id, user_id, created_at, updated_at)
            SELECT gen_random_uuid(), id, NOW(), NOW() FROM missing
            ON CONFLICT (user_id) DO NOTHING
            "#,
        )
        .bind(i64::from(batch_size))
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to backfill profiles: {}", e)))?;

        Ok(result.rows_affected())
    }
}
