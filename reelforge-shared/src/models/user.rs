/// User model and database operations
///
/// # Schema
///
/// ```sql
/// CREATE TABLE users (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     name TEXT,
///     email TEXT NOT NULL UNIQUE,
///     email_verified TIMESTAMPTZ,
///     image TEXT,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// Deleting a user cascades to its accounts, sessions, videos, and contacts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgExecutor, Postgres, QueryBuilder};
use uuid::Uuid;

use super::account::Account;

const USER_COLUMNS: &str = "id, name, email, email_verified, image, created_at";

/// Identity record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    /// Unique user ID
    pub id: Uuid,

    /// Display name
    pub name: Option<String>,

    /// Email address (stored normalized: trimmed, lowercase)
    pub email: String,

    /// When the email address was verified, if ever
    pub email_verified: Option<DateTime<Utc>>,

    /// Avatar URL
    pub image: Option<String>,

    /// When the user was created
    pub created_at: DateTime<Utc>,
}

/// User together with its linked provider accounts
#[derive(Debug, Clone, PartialEq)]
pub struct UserWithAccounts {
    pub user: User,
    pub accounts: Vec<Account>,
}

impl UserWithAccounts {
    /// First account linked through `provider`
    pub fn account_for(&self, provider: &str) -> Option<&Account> {
        self.accounts.iter().find(|a| a.provider == provider)
    }
}

/// Input for creating a user
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewUser {
    pub name: Option<String>,
    pub email: String,
    pub email_verified: Option<DateTime<Utc>>,
    pub image: Option<String>,
}

/// Partial user update
///
/// `None` leaves a column untouched; `Some(None)` clears a nullable column.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateUser {
    pub name: Option<Option<String>>,
    pub email: Option<String>,
    pub email_verified: Option<Option<DateTime<Utc>>>,
    pub image: Option<Option<String>>,
}

impl UpdateUser {
    /// True when no column would change
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.email.is_none()
            && self.email_verified.is_none()
            && self.image.is_none()
    }

    /// Applies the update to an in-memory user
    pub fn apply_to(&self, user: &mut User) {
        if let Some(name) = &self.name {
            user.name = name.clone();
        }
        if let Some(email) = &self.email {
            user.email = email.clone();
        }
        if let Some(verified) = self.email_verified {
            user.email_verified = verified;
        }
        if let Some(image) = &self.image {
            user.image = image.clone();
        }
    }
}

/// Normalizes an email address for storage and lookup
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

impl User {
    /// Inserts a new user
    ///
    /// # Errors
    ///
    /// Fails on a duplicate email (unique constraint) or connection errors.
    pub async fn create<'e>(executor: impl PgExecutor<'e>, data: NewUser) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (name, email, email_verified, image)
             VALUES ($1, $2, $3, $4)
             RETURNING {USER_COLUMNS}"
        ))
        .bind(data.name)
        .bind(normalize_email(&data.email))
        .bind(data.email_verified)
        .bind(data.image)
        .fetch_one(executor)
        .await
    }

    /// Finds a user by ID
    pub async fn find_by_id<'e>(executor: impl PgExecutor<'e>, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// Finds a user by (normalized) email
    pub async fn find_by_email<'e>(
        executor: impl PgExecutor<'e>,
        email: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1"))
            .bind(normalize_email(email))
            .fetch_optional(executor)
            .await
    }

    /// Finds the user linked to a provider account
    pub async fn find_by_account<'e>(
        executor: impl PgExecutor<'e>,
        provider: &str,
        provider_account_id: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            "SELECT u.id, u.name, u.email, u.email_verified, u.image, u.created_at
             FROM users u
             JOIN accounts a ON u.id = a.user_id
             WHERE a.provider = $1 AND a.provider_account_id = $2",
        )
        .bind(provider)
        .bind(provider_account_id)
        .fetch_optional(executor)
        .await
    }

    /// Updates only the columns present in `data`
    ///
    /// Returns `None` when the user doesn't exist. An empty update is a plain read.
    pub async fn update<'e>(
        executor: impl PgExecutor<'e>,
        id: Uuid,
        data: UpdateUser,
    ) -> Result<Option<Self>, sqlx::Error> {
        if data.is_empty() {
            return Self::find_by_id(executor, id).await;
        }

        let mut query: QueryBuilder<Postgres> = QueryBuilder::new("UPDATE users SET ");
        let mut assignments = query.separated(", ");

        if let Some(name) = data.name {
            assignments.push("name = ").push_bind_unseparated(name);
        }
        if let Some(email) = data.email {
            assignments.push("email = ").push_bind_unseparated(normalize_email(&email));
        }
        if let Some(verified) = data.email_verified {
            assignments.push("email_verified = ").push_bind_unseparated(verified);
        }
        if let Some(image) = data.image {
            assignments.push("image = ").push_bind_unseparated(image);
        }

        query.push(" WHERE id = ").push_bind(id);
        query.push(format!(" RETURNING {USER_COLUMNS}"));

        query.build_query_as::<User>().fetch_optional(executor).await
    }

    /// Deletes a user; sessions and accounts go with it via `ON DELETE CASCADE`
    ///
    /// Returns true if a row was removed.
    pub async fn delete<'e>(executor: impl PgExecutor<'e>, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user() -> User {
        User {
            id: Uuid::new_v4(),
            name: Some("Ada".to_string()),
            email: "ada@example.com".to_string(),
            email_verified: None,
            image: Some("https://example.com/ada.png".to_string()),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  Ada@Example.COM "), "ada@example.com");
    }

    #[test]
    fn test_update_user_default_is_empty() {
        assert!(UpdateUser::default().is_empty());
    }

    #[test]
    fn test_apply_update_leaves_absent_fields() {
        let mut user = sample_user();
        let original = user.clone();

        UpdateUser {
            name: Some(Some("Ada L.".to_string())),
            image: Some(None),
            ..Default::default()
        }
        .apply_to(&mut user);

        assert_eq!(user.name.as_deref(), Some("Ada L."));
        assert_eq!(user.image, None);
        assert_eq!(user.email, original.email);
        assert_eq!(user.email_verified, original.email_verified);
    }
}
