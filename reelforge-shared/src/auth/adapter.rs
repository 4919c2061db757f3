/// Authentication storage adapter
///
/// [`AuthAdapter`] is the fixed set of storage capabilities the auth service
/// needs: users, provider accounts, sessions, and verification tokens. The
/// service only ever talks to `Arc<dyn AuthAdapter>`, so the Postgres adapter
/// and the in-memory adapter are interchangeable.
///
/// Each [`PgAuthAdapter`] operation is one parameterized statement (two for
/// `get_user_by_email`, which also loads the linked accounts). Nothing is
/// cached or batched.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::db::Database;
use crate::models::account::{Account, NewAccount};
use crate::models::session::Session;
use crate::models::user::{NewUser, UpdateUser, User, UserWithAccounts};
use crate::models::verification_token::VerificationToken;

/// Postgres `unique_violation`
const UNIQUE_VIOLATION: &str = "23505";

/// Error type for adapter operations
#[derive(Debug, thiserror::Error)]
pub enum AuthAdapterError {
    /// A unique constraint rejected the write (duplicate email, account link, token)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// A referenced row doesn't exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Storage failure
    #[error("Database error: {0}")]
    Database(sqlx::Error),
}

impl From<sqlx::Error> for AuthAdapterError {
    fn from(err: sqlx::Error) -> Self {
        let is_unique_violation = err
            .as_database_error()
            .and_then(|db_err| db_err.code())
            .is_some_and(|code| code == UNIQUE_VIOLATION);

        if is_unique_violation {
            AuthAdapterError::Conflict(err.to_string())
        } else {
            AuthAdapterError::Database(err)
        }
    }
}

pub type AdapterResult<T> = Result<T, AuthAdapterError>;

/// Storage operations required by the auth service
#[async_trait]
pub trait AuthAdapter: Send + Sync {
    /// Inserts a user; duplicate email → [`AuthAdapterError::Conflict`]
    async fn create_user(&self, user: NewUser) -> AdapterResult<User>;

    async fn get_user(&self, id: Uuid) -> AdapterResult<Option<User>>;

    /// Looks a user up by email, along with every linked account
    async fn get_user_by_email(&self, email: &str) -> AdapterResult<Option<UserWithAccounts>>;

    async fn get_user_by_account(
        &self,
        provider: &str,
        provider_account_id: &str,
    ) -> AdapterResult<Option<User>>;

    /// Merges the present fields into the stored user; `None` if the user is gone
    async fn update_user(&self, id: Uuid, changes: UpdateUser) -> AdapterResult<Option<User>>;

    /// Removes a user together with its sessions and accounts
    async fn delete_user(&self, id: Uuid) -> AdapterResult<bool>;

    async fn link_account(&self, account: NewAccount) -> AdapterResult<Account>;

    async fn unlink_account(&self, provider: &str, provider_account_id: &str) -> AdapterResult<bool>;

    async fn create_session(
        &self,
        session_token: &str,
        user_id: Uuid,
        expires: DateTime<Utc>,
    ) -> AdapterResult<Session>;

    /// Session plus its user; `None` when either side is missing
    async fn get_session_and_user(&self, session_token: &str) -> AdapterResult<Option<(Session, User)>>;

    async fn update_session(
        &self,
        session_token: &str,
        expires: DateTime<Utc>,
    ) -> AdapterResult<Option<Session>>;

    async fn delete_session(&self, session_token: &str) -> AdapterResult<bool>;

    async fn create_verification_token(
        &self,
        token: VerificationToken,
    ) -> AdapterResult<VerificationToken>;

    /// Consumes a token: a second call with the same pair returns `None`
    async fn use_verification_token(
        &self,
        identifier: &str,
        token: &str,
    ) -> AdapterResult<Option<VerificationToken>>;

    /// Creates a user and its credentials account
    ///
    /// The default runs the two writes back to back, so a failure between
    /// them leaves a user without credentials. Adapters that can do better
    /// should override it.
    async fn create_user_with_credentials(
        &self,
        user: NewUser,
        password_hash: String,
    ) -> AdapterResult<User> {
        let user = self.create_user(user).await?;
        self.link_account(NewAccount::credentials(user.id, password_hash))
            .await?;
        Ok(user)
    }
}

/// Postgres-backed adapter
#[derive(Debug, Clone)]
pub struct PgAuthAdapter {
    db: Database,
}

impl PgAuthAdapter {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[derive(sqlx::FromRow)]
struct SessionUserRow {
    session_id: Uuid,
    session_token: String,
    expires: DateTime<Utc>,
    user_id: Uuid,
    name: Option<String>,
    email: String,
    email_verified: Option<DateTime<Utc>>,
    image: Option<String>,
    created_at: DateTime<Utc>,
}

impl SessionUserRow {
    fn split(self) -> (Session, User) {
        let session = Session {
            id: self.session_id,
            session_token: self.session_token,
            user_id: self.user_id,
            expires: self.expires,
        };
        let user = User {
            id: self.user_id,
            name: self.name,
            email: self.email,
            email_verified: self.email_verified,
            image: self.image,
            created_at: self.created_at,
        };
        (session, user)
    }
}

#[async_trait]
impl AuthAdapter for PgAuthAdapter {
    async fn create_user(&self, user: NewUser) -> AdapterResult<User> {
        Ok(User::create(self.db.pool(), user).await?)
    }

    async fn get_user(&self, id: Uuid) -> AdapterResult<Option<User>> {
        Ok(User::find_by_id(self.db.pool(), id).await?)
    }

    async fn get_user_by_email(&self, email: &str) -> AdapterResult<Option<UserWithAccounts>> {
        let Some(user) = User::find_by_email(self.db.pool(), email).await? else {
            return Ok(None);
        };

        let accounts = Account::list_by_user(self.db.pool(), user.id).await?;
        Ok(Some(UserWithAccounts { user, accounts }))
    }

    async fn get_user_by_account(
        &self,
        provider: &str,
        provider_account_id: &str,
    ) -> AdapterResult<Option<User>> {
        Ok(User::find_by_account(self.db.pool(), provider, provider_account_id).await?)
    }

    async fn update_user(&self, id: Uuid, changes: UpdateUser) -> AdapterResult<Option<User>> {
        Ok(User::update(self.db.pool(), id, changes).await?)
    }

    async fn delete_user(&self, id: Uuid) -> AdapterResult<bool> {
        Ok(User::delete(self.db.pool(), id).await?)
    }

    async fn link_account(&self, account: NewAccount) -> AdapterResult<Account> {
        Ok(Account::create(self.db.pool(), account).await?)
    }

    async fn unlink_account(&self, provider: &str, provider_account_id: &str) -> AdapterResult<bool> {
        Ok(Account::delete_by_provider(self.db.pool(), provider, provider_account_id).await?)
    }

    async fn create_session(
        &self,
        session_token: &str,
        user_id: Uuid,
        expires: DateTime<Utc>,
    ) -> AdapterResult<Session> {
        Ok(Session::create(self.db.pool(), session_token, user_id, expires).await?)
    }

    async fn get_session_and_user(&self, session_token: &str) -> AdapterResult<Option<(Session, User)>> {
        let row = sqlx::query_as::<_, SessionUserRow>(
            "SELECT s.id AS session_id, s.session_token, s.expires,
                    u.id AS user_id, u.name, u.email, u.email_verified, u.image, u.created_at
             FROM sessions s
             JOIN users u ON u.id = s.user_id
             WHERE s.session_token = $1",
        )
        .bind(session_token)
        .fetch_optional(self.db.pool())
        .await?;

        Ok(row.map(SessionUserRow::split))
    }

    async fn update_session(
        &self,
        session_token: &str,
        expires: DateTime<Utc>,
    ) -> AdapterResult<Option<Session>> {
        Ok(Session::update_expiry(self.db.pool(), session_token, expires).await?)
    }

    async fn delete_session(&self, session_token: &str) -> AdapterResult<bool> {
        Ok(Session::delete_by_token(self.db.pool(), session_token).await?)
    }

    async fn create_verification_token(
        &self,
        token: VerificationToken,
    ) -> AdapterResult<VerificationToken> {
        VerificationToken::create(self.db.pool(), &token).await?;
        Ok(token)
    }

    async fn use_verification_token(
        &self,
        identifier: &str,
        token: &str,
    ) -> AdapterResult<Option<VerificationToken>> {
        Ok(VerificationToken::consume(self.db.pool(), identifier, token).await?)
    }

    /// Both writes share one transaction; a failed account insert rolls the user back
    async fn create_user_with_credentials(
        &self,
        user: NewUser,
        password_hash: String,
    ) -> AdapterResult<User> {
        let mut tx = self.db.begin().await?;

        let user = User::create(&mut *tx, user).await?;
        Account::create(&mut *tx, NewAccount::credentials(user.id, password_hash)).await?;

        tx.commit().await?;
        Ok(user)
    }
}
