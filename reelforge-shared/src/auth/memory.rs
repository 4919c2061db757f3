/// In-process auth adapter
///
/// Keeps every table in a single `RwLock`-guarded store. Used by the router
/// tests and for running the API locally without credentials storage; it
/// enforces the same uniqueness and cascade rules as the SQL schema.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::adapter::{AdapterResult, AuthAdapter, AuthAdapterError};
use crate::models::account::{Account, NewAccount};
use crate::models::session::Session;
use crate::models::user::{normalize_email, NewUser, UpdateUser, User, UserWithAccounts};
use crate::models::verification_token::VerificationToken;

#[derive(Debug, Default)]
struct Store {
    users: HashMap<Uuid, User>,
    accounts: Vec<Account>,
    sessions: HashMap<String, Session>,
    verification_tokens: Vec<VerificationToken>,
}

impl Store {
    fn email_taken(&self, email: &str, except: Option<Uuid>) -> bool {
        self.users
            .values()
            .any(|u| u.email == email && Some(u.id) != except)
    }
}

#[derive(Debug, Default)]
pub struct MemoryAdapter {
    store: RwLock<Store>,
}

impl MemoryAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live sessions, for assertions
    pub async fn session_count(&self) -> usize {
        self.store.read().await.sessions.len()
    }
}

#[async_trait]
impl AuthAdapter for MemoryAdapter {
    async fn create_user(&self, user: NewUser) -> AdapterResult<User> {
        let mut store = self.store.write().await;
        let email = normalize_email(&user.email);

        if store.email_taken(&email, None) {
            return Err(AuthAdapterError::Conflict(format!("email {} already exists", email)));
        }

        let user = User {
            id: Uuid::new_v4(),
            name: user.name,
            email,
            email_verified: user.email_verified,
            image: user.image,
            created_at: Utc::now(),
        };
        store.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn get_user(&self, id: Uuid) -> AdapterResult<Option<User>> {
        Ok(self.store.read().await.users.get(&id).cloned())
    }

    async fn get_user_by_email(&self, email: &str) -> AdapterResult<Option<UserWithAccounts>> {
        let store = self.store.read().await;
        let email = normalize_email(email);

        let Some(user) = store.users.values().find(|u| u.email == email).cloned() else {
            return Ok(None);
        };

        let accounts = store
            .accounts
            .iter()
            .filter(|a| a.user_id == user.id)
            .cloned()
            .collect();

        Ok(Some(UserWithAccounts { user, accounts }))
    }

    async fn get_user_by_account(
        &self,
        provider: &str,
        provider_account_id: &str,
    ) -> AdapterResult<Option<User>> {
        let store = self.store.read().await;

        Ok(store
            .accounts
            .iter()
            .find(|a| a.provider == provider && a.provider_account_id == provider_account_id)
            .and_then(|a| store.users.get(&a.user_id))
            .cloned())
    }

    async fn update_user(&self, id: Uuid, changes: UpdateUser) -> AdapterResult<Option<User>> {
        let mut store = self.store.write().await;

        let changes = UpdateUser {
            email: changes.email.as_deref().map(normalize_email),
            ..changes
        };
        if let Some(email) = &changes.email {
            if store.email_taken(email, Some(id)) {
                return Err(AuthAdapterError::Conflict(format!("email {} already exists", email)));
            }
        }

        Ok(store.users.get_mut(&id).map(|user| {
            changes.apply_to(user);
            user.clone()
        }))
    }

    async fn delete_user(&self, id: Uuid) -> AdapterResult<bool> {
        let mut store = self.store.write().await;

        let removed = store.users.remove(&id).is_some();
        store.accounts.retain(|a| a.user_id != id);
        store.sessions.retain(|_, s| s.user_id != id);

        Ok(removed)
    }

    async fn link_account(&self, account: NewAccount) -> AdapterResult<Account> {
        let mut store = self.store.write().await;

        if !store.users.contains_key(&account.user_id) {
            return Err(AuthAdapterError::NotFound(format!("user {}", account.user_id)));
        }
        let duplicate = store.accounts.iter().any(|a| {
            a.provider == account.provider && a.provider_account_id == account.provider_account_id
        });
        if duplicate {
            return Err(AuthAdapterError::Conflict(format!(
                "account {}/{} already linked",
                account.provider, account.provider_account_id
            )));
        }

        let account = account.into_account(Uuid::new_v4());
        store.accounts.push(account.clone());
        Ok(account)
    }

    async fn unlink_account(&self, provider: &str, provider_account_id: &str) -> AdapterResult<bool> {
        let mut store = self.store.write().await;
        let before = store.accounts.len();

        store
            .accounts
            .retain(|a| !(a.provider == provider && a.provider_account_id == provider_account_id));

        Ok(store.accounts.len() < before)
    }

    async fn create_session(
        &self,
        session_token: &str,
        user_id: Uuid,
        expires: DateTime<Utc>,
    ) -> AdapterResult<Session> {
        let mut store = self.store.write().await;

        if !store.users.contains_key(&user_id) {
            return Err(AuthAdapterError::NotFound(format!("user {}", user_id)));
        }
        if store.sessions.contains_key(session_token) {
            return Err(AuthAdapterError::Conflict("session token already exists".to_string()));
        }

        let session = Session {
            id: Uuid::new_v4(),
            session_token: session_token.to_string(),
            user_id,
            expires,
        };
        store.sessions.insert(session_token.to_string(), session.clone());
        Ok(session)
    }

    async fn get_session_and_user(&self, session_token: &str) -> AdapterResult<Option<(Session, User)>> {
        let store = self.store.read().await;

        Ok(store.sessions.get(session_token).and_then(|session| {
            store
                .users
                .get(&session.user_id)
                .map(|user| (session.clone(), user.clone()))
        }))
    }

    async fn update_session(
        &self,
        session_token: &str,
        expires: DateTime<Utc>,
    ) -> AdapterResult<Option<Session>> {
        let mut store = self.store.write().await;

        Ok(store.sessions.get_mut(session_token).map(|session| {
            session.expires = expires;
            session.clone()
        }))
    }

    async fn delete_session(&self, session_token: &str) -> AdapterResult<bool> {
        Ok(self.store.write().await.sessions.remove(session_token).is_some())
    }

    async fn create_verification_token(
        &self,
        token: VerificationToken,
    ) -> AdapterResult<VerificationToken> {
        let mut store = self.store.write().await;

        let duplicate = store
            .verification_tokens
            .iter()
            .any(|t| t.identifier == token.identifier && t.token == token.token);
        if duplicate {
            return Err(AuthAdapterError::Conflict("verification token already exists".to_string()));
        }

        store.verification_tokens.push(token.clone());
        Ok(token)
    }

    async fn use_verification_token(
        &self,
        identifier: &str,
        token: &str,
    ) -> AdapterResult<Option<VerificationToken>> {
        let mut store = self.store.write().await;

        let position = store
            .verification_tokens
            .iter()
            .position(|t| t.identifier == identifier && t.token == token);

        Ok(position.map(|i| store.verification_tokens.swap_remove(i)))
    }

    /// Both writes happen under one write lock, so no reader sees a half-created user
    async fn create_user_with_credentials(
        &self,
        user: NewUser,
        password_hash: String,
    ) -> AdapterResult<User> {
        let mut store = self.store.write().await;
        let email = normalize_email(&user.email);

        if store.email_taken(&email, None) {
            return Err(AuthAdapterError::Conflict(format!("email {} already exists", email)));
        }

        let user = User {
            id: Uuid::new_v4(),
            name: user.name,
            email,
            email_verified: user.email_verified,
            image: user.image,
            created_at: Utc::now(),
        };
        let account = NewAccount::credentials(user.id, password_hash).into_account(Uuid::new_v4());

        store.users.insert(user.id, user.clone());
        store.accounts.push(account);
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn new_user(email: &str) -> NewUser {
        NewUser {
            email: email.to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_create_user_rejects_duplicate_email() {
        let adapter = MemoryAdapter::new();

        adapter.create_user(new_user("ada@example.com")).await.unwrap();
        let err = adapter.create_user(new_user(" ADA@example.com")).await.unwrap_err();

        assert!(matches!(err, AuthAdapterError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_get_user_by_email_includes_accounts() {
        let adapter = MemoryAdapter::new();
        let user = adapter
            .create_user_with_credentials(new_user("ada@example.com"), "hash".to_string())
            .await
            .unwrap();

        let found = adapter.get_user_by_email("Ada@Example.com").await.unwrap().unwrap();

        assert_eq!(found.user.id, user.id);
        assert_eq!(found.accounts.len(), 1);
        assert_eq!(
            found.account_for("credentials").and_then(|a| a.password.as_deref()),
            Some("hash")
        );

        let by_account = adapter
            .get_user_by_account("credentials", &user.id.to_string())
            .await
            .unwrap();
        assert_eq!(by_account.map(|u| u.id), Some(user.id));
    }

    #[tokio::test]
    async fn test_delete_user_cascades() {
        let adapter = MemoryAdapter::new();
        let user = adapter
            .create_user_with_credentials(new_user("ada@example.com"), "hash".to_string())
            .await
            .unwrap();
        adapter
            .create_session("tok", user.id, Utc::now() + Duration::days(1))
            .await
            .unwrap();

        assert!(adapter.delete_user(user.id).await.unwrap());
        assert_eq!(adapter.session_count().await, 0);
        assert!(adapter.get_session_and_user("tok").await.unwrap().is_none());
        assert!(adapter
            .get_user_by_account("credentials", &user.id.to_string())
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_verification_token_single_use() {
        let adapter = MemoryAdapter::new();
        adapter
            .create_verification_token(VerificationToken {
                identifier: "ada@example.com".to_string(),
                token: "t1".to_string(),
                expires: Utc::now() + Duration::hours(1),
            })
            .await
            .unwrap();

        assert!(adapter.use_verification_token("ada@example.com", "t1").await.unwrap().is_some());
        assert!(adapter.use_verification_token("ada@example.com", "t1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_session_and_unknown_token() {
        let adapter = MemoryAdapter::new();
        let user = adapter.create_user(new_user("ada@example.com")).await.unwrap();
        adapter.create_session("tok", user.id, Utc::now()).await.unwrap();

        let later = Utc::now() + Duration::days(30);
        let updated = adapter.update_session("tok", later).await.unwrap().unwrap();
        assert_eq!(updated.expires, later);

        assert!(adapter.update_session("missing", later).await.unwrap().is_none());
        assert!(!adapter.delete_session("missing").await.unwrap());
    }

    #[tokio::test]
    async fn test_link_and_unlink_account() {
        let adapter = MemoryAdapter::new();
        let user = adapter.create_user(new_user("ada@example.com")).await.unwrap();

        let link = NewAccount {
            user_id: user.id,
            account_type: "oauth".to_string(),
            provider: "github".to_string(),
            provider_account_id: "42".to_string(),
            ..Default::default()
        };
        adapter.link_account(link.clone()).await.unwrap();
        assert!(matches!(
            adapter.link_account(link).await,
            Err(AuthAdapterError::Conflict(_))
        ));

        assert!(adapter.unlink_account("github", "42").await.unwrap());
        assert!(!adapter.unlink_account("github", "42").await.unwrap());
    }
}
