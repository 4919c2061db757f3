/// Single-use verification tokens
///
/// A token is consumed by deleting it; the delete returns the row, so a token
/// can only ever be used once.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgExecutor;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct VerificationToken {
    pub identifier: String,
    pub token: String,
    pub expires: DateTime<Utc>,
}

impl VerificationToken {
    pub fn is_expired(&self) -> bool {
        self.expires <= Utc::now()
    }

    pub async fn create<'e>(executor: impl PgExecutor<'e>, token: &VerificationToken) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO verification_tokens (identifier, token, expires) VALUES ($1, $2, $3)",
        )
        .bind(&token.identifier)
        .bind(&token.token)
        .bind(token.expires)
        .execute(executor)
        .await?;

        Ok(())
    }

    /// Deletes and returns the token, if it exists
    pub async fn consume<'e>(
        executor: impl PgExecutor<'e>,
        identifier: &str,
        token: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, VerificationToken>(
            "DELETE FROM verification_tokens
             WHERE identifier = $1 AND token = $2
             RETURNING identifier, token, expires",
        )
        .bind(identifier)
        .bind(token)
        .fetch_optional(executor)
        .await
    }
}
