/// Server-side sessions
///
/// # Schema
///
/// ```sql
/// CREATE TABLE sessions (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     session_token TEXT NOT NULL UNIQUE,
///     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     expires TIMESTAMPTZ NOT NULL
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgExecutor;
use uuid::Uuid;

/// Session row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Session {
    pub id: Uuid,
    #[serde(skip_serializing)]
    pub session_token: String,
    pub user_id: Uuid,
    pub expires: DateTime<Utc>,
}

impl Session {
    /// True once `expires` has passed
    pub fn is_expired(&self) -> bool {
        self.expires <= Utc::now()
    }

    /// Inserts a session
    pub async fn create<'e>(
        executor: impl PgExecutor<'e>,
        session_token: &str,
        user_id: Uuid,
        expires: DateTime<Utc>,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Session>(
            "INSERT INTO sessions (session_token, user_id, expires)
             VALUES ($1, $2, $3)
             RETURNING id, session_token, user_id, expires",
        )
        .bind(session_token)
        .bind(user_id)
        .bind(expires)
        .fetch_one(executor)
        .await
    }

    /// Looks a session up by its token
    pub async fn find_by_token<'e>(
        executor: impl PgExecutor<'e>,
        session_token: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Session>(
            "SELECT id, session_token, user_id, expires FROM sessions WHERE session_token = $1",
        )
        .bind(session_token)
        .fetch_optional(executor)
        .await
    }

    /// Moves a session's expiry; `None` when the token is unknown
    pub async fn update_expiry<'e>(
        executor: impl PgExecutor<'e>,
        session_token: &str,
        expires: DateTime<Utc>,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Session>(
            "UPDATE sessions SET expires = $2
             WHERE session_token = $1
             RETURNING id, session_token, user_id, expires",
        )
        .bind(session_token)
        .bind(expires)
        .fetch_optional(executor)
        .await
    }

    /// Deletes a session; returns true if a row was removed
    pub async fn delete_by_token<'e>(executor: impl PgExecutor<'e>, session_token: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM sessions WHERE session_token = $1")
            .bind(session_token)
            .execute(executor)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
