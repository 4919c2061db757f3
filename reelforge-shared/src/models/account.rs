/// Provider account links
///
/// An account ties a user to an authentication provider. Credentials accounts
/// (`provider = "credentials"`) store the Argon2id password hash in `password`;
/// the hash is never serialized.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE accounts (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     type TEXT NOT NULL,
///     provider TEXT NOT NULL,
///     provider_account_id TEXT NOT NULL,
///     access_token TEXT, refresh_token TEXT, id_token TEXT,
///     expires_at BIGINT, token_type TEXT, scope TEXT, session_state TEXT,
///     password TEXT,
///     UNIQUE (provider, provider_account_id)
/// );
/// ```

use serde::{Deserialize, Serialize};
use sqlx::PgExecutor;
use uuid::Uuid;

/// Provider id used for email + password accounts
pub const CREDENTIALS_PROVIDER: &str = "credentials";

const ACCOUNT_COLUMNS: &str = "id, user_id, type, provider, provider_account_id, access_token, \
     refresh_token, id_token, expires_at, token_type, scope, session_state, password";

/// Linked provider account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Account {
    pub id: Uuid,
    pub user_id: Uuid,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub account_type: String,
    pub provider: String,
    pub provider_account_id: String,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub id_token: Option<String>,
    pub expires_at: Option<i64>,
    pub token_type: Option<String>,
    pub scope: Option<String>,
    pub session_state: Option<String>,
    #[serde(skip_serializing)]
    pub password: Option<String>,
}

/// Input for linking an account
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewAccount {
    pub user_id: Uuid,
    pub account_type: String,
    pub provider: String,
    pub provider_account_id: String,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub id_token: Option<String>,
    pub expires_at: Option<i64>,
    pub token_type: Option<String>,
    pub scope: Option<String>,
    pub session_state: Option<String>,
    pub password: Option<String>,
}

impl NewAccount {
    /// Credentials account for `user_id` holding `password_hash`
    pub fn credentials(user_id: Uuid, password_hash: String) -> Self {
        Self {
            user_id,
            account_type: CREDENTIALS_PROVIDER.to_string(),
            provider: CREDENTIALS_PROVIDER.to_string(),
            provider_account_id: user_id.to_string(),
            password: Some(password_hash),
            ..Default::default()
        }
    }

    /// Materializes the account with a fresh id (for non-SQL stores)
    pub fn into_account(self, id: Uuid) -> Account {
        Account {
            id,
            user_id: self.user_id,
            account_type: self.account_type,
            provider: self.provider,
            provider_account_id: self.provider_account_id,
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            id_token: self.id_token,
            expires_at: self.expires_at,
            token_type: self.token_type,
            scope: self.scope,
            session_state: self.session_state,
            password: self.password,
        }
    }
}

impl Account {
    /// Inserts an account link
    pub async fn create<'e>(executor: impl PgExecutor<'e>, data: NewAccount) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Account>(&format!(
            "INSERT INTO accounts (user_id, type, provider, provider_account_id, access_token,
                                   refresh_token, id_token, expires_at, token_type, scope,
                                   session_state, password)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
             RETURNING {ACCOUNT_COLUMNS}"
        ))
        .bind(data.user_id)
        .bind(data.account_type)
        .bind(data.provider)
        .bind(data.provider_account_id)
        .bind(data.access_token)
        .bind(data.refresh_token)
        .bind(data.id_token)
        .bind(data.expires_at)
        .bind(data.token_type)
        .bind(data.scope)
        .bind(data.session_state)
        .bind(data.password)
        .fetch_one(executor)
        .await
    }

    /// All accounts linked to a user
    pub async fn list_by_user<'e>(executor: impl PgExecutor<'e>, user_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Account>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE user_id = $1"
        ))
        .bind(user_id)
        .fetch_all(executor)
        .await
    }

    /// Removes a provider link; returns true if a row was removed
    pub async fn delete_by_provider<'e>(
        executor: impl PgExecutor<'e>,
        provider: &str,
        provider_account_id: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "DELETE FROM accounts WHERE provider = $1 AND provider_account_id = $2",
        )
        .bind(provider)
        .bind(provider_account_id)
        .execute(executor)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
