/// Credentials authentication service
///
/// Wraps an [`AuthAdapter`] with the sign-in, sign-up, session, and email
/// verification flows. Sign-in and sign-up answer with `Option<User>` only:
/// callers can't tell *why* credentials were rejected, so neither can clients.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use super::adapter::{AdapterResult, AuthAdapter, AuthAdapterError};
use super::password::{hash_password, verify_dummy, verify_password};
use super::token::{generate_session_token, generate_verification_token};
use crate::models::account::CREDENTIALS_PROVIDER;
use crate::models::session::Session;
use crate::models::user::{NewUser, UpdateUser, User};
use crate::models::verification_token::VerificationToken;

/// How long a verification token stays usable
pub const VERIFICATION_TOKEN_TTL_HOURS: i64 = 24;

/// Session lifetime policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSettings {
    /// Lifetime of a new (or freshly extended) session
    pub max_age: Duration,

    /// Minimum time between expiry extensions
    pub update_age: Duration,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            max_age: Duration::days(30),
            update_age: Duration::days(1),
        }
    }
}

/// Sign-up form
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignUp {
    pub email: String,
    pub password: String,
    pub name: Option<String>,
    pub image: Option<String>,
}

/// A live session and the user it belongs to
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveSession {
    pub session: Session,
    pub user: User,
    /// The expiry moved during this lookup
    pub extended: bool,
}

#[derive(Clone)]
pub struct AuthService {
    adapter: Arc<dyn AuthAdapter>,
    settings: SessionSettings,
}

impl std::fmt::Debug for AuthService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthService")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

/// Display name derived from an email's local part
fn default_name(email: &str) -> String {
    email.split('@').next().unwrap_or(email).to_string()
}

impl AuthService {
    pub fn new(adapter: Arc<dyn AuthAdapter>, settings: SessionSettings) -> Self {
        Self { adapter, settings }
    }

    pub fn adapter(&self) -> &Arc<dyn AuthAdapter> {
        &self.adapter
    }

    pub fn settings(&self) -> SessionSettings {
        self.settings
    }

    /// Checks email + password against the stored credentials account
    ///
    /// Unknown email, missing credentials account, wrong password, unreadable
    /// hash, and storage failure all come back as `None`.
    pub async fn sign_in(&self, email: &str, password: &str) -> Option<User> {
        if email.trim().is_empty() || password.is_empty() {
            return None;
        }

        let found = match self.adapter.get_user_by_email(email).await {
            Ok(found) => found,
            Err(e) => {
                tracing::error!(error = %e, "Sign-in lookup failed");
                return None;
            }
        };

        let Some(found) = found else {
            verify_dummy(password);
            return None;
        };

        let Some(hash) = found
            .account_for(CREDENTIALS_PROVIDER)
            .and_then(|account| account.password.as_deref())
        else {
            verify_dummy(password);
            return None;
        };

        match verify_password(password, hash) {
            Ok(true) => Some(found.user),
            Ok(false) => None,
            Err(e) => {
                tracing::warn!(user_id = %found.user.id, error = %e, "Stored password hash is unusable");
                None
            }
        }
    }

    /// Registers a credentials user
    ///
    /// `None` when email or password is missing, the email is taken, or the
    /// write fails. Nothing is stored in those cases.
    pub async fn sign_up(&self, form: SignUp) -> Option<User> {
        let email = form.email.trim();
        if email.is_empty() || form.password.is_empty() {
            return None;
        }

        match self.adapter.get_user_by_email(email).await {
            Ok(Some(_)) => return None,
            Ok(None) => {}
            Err(e) => {
                tracing::error!(error = %e, "Sign-up lookup failed");
                return None;
            }
        }

        let password_hash = match hash_password(&form.password) {
            Ok(hash) => hash,
            Err(e) => {
                tracing::error!(error = %e, "Password hashing failed");
                return None;
            }
        };

        let new_user = NewUser {
            name: form.name.filter(|n| !n.trim().is_empty()).or_else(|| Some(default_name(email))),
            email: email.to_string(),
            email_verified: None,
            image: form.image,
        };

        match self.adapter.create_user_with_credentials(new_user, password_hash).await {
            Ok(user) => {
                tracing::info!(user_id = %user.id, "User signed up");
                Some(user)
            }
            Err(AuthAdapterError::Conflict(_)) => None,
            Err(e) => {
                tracing::error!(error = %e, "Sign-up failed");
                None
            }
        }
    }

    /// Opens a session for `user_id`
    pub async fn start_session(&self, user_id: Uuid) -> AdapterResult<Session> {
        let token = generate_session_token();
        let expires = Utc::now() + self.settings.max_age;

        self.adapter.create_session(&token, user_id, expires).await
    }

    /// Resolves a session token to its live session
    ///
    /// Expired sessions are deleted and yield `None`. A session last extended
    /// more than `update_age` ago gets a fresh `max_age`.
    pub async fn resolve_session(&self, token: &str) -> AdapterResult<Option<ActiveSession>> {
        let Some((session, user)) = self.adapter.get_session_and_user(token).await? else {
            return Ok(None);
        };

        let now = Utc::now();
        if session.expires <= now {
            self.adapter.delete_session(token).await?;
            return Ok(None);
        }

        if !self.needs_extension(session.expires, now) {
            return Ok(Some(ActiveSession {
                session,
                user,
                extended: false,
            }));
        }

        let active = match self.adapter.update_session(token, now + self.settings.max_age).await? {
            Some(session) => ActiveSession {
                session,
                user,
                extended: true,
            },
            None => ActiveSession {
                session,
                user,
                extended: false,
            },
        };
        Ok(Some(active))
    }

    fn needs_extension(&self, expires: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        let last_extended = expires - self.settings.max_age;
        now - last_extended >= self.settings.update_age
    }

    /// Ends a session; true if it existed
    pub async fn end_session(&self, token: &str) -> AdapterResult<bool> {
        self.adapter.delete_session(token).await
    }

    /// Issues a verification token for `identifier` (an email address)
    pub async fn issue_verification_token(&self, identifier: &str) -> AdapterResult<VerificationToken> {
        let token = VerificationToken {
            identifier: identifier.to_string(),
            token: generate_verification_token(),
            expires: Utc::now() + Duration::hours(VERIFICATION_TOKEN_TTL_HOURS),
        };

        self.adapter.create_verification_token(token).await
    }

    /// Consumes a verification token and marks the email verified
    ///
    /// `None` when the token is unknown, already used, expired, or its
    /// identifier no longer matches a user.
    pub async fn verify_email(&self, identifier: &str, token: &str) -> AdapterResult<Option<User>> {
        let Some(consumed) = self.adapter.use_verification_token(identifier, token).await? else {
            return Ok(None);
        };
        if consumed.is_expired() {
            return Ok(None);
        }

        let Some(found) = self.adapter.get_user_by_email(&consumed.identifier).await? else {
            return Ok(None);
        };

        self.adapter
            .update_user(
                found.user.id,
                UpdateUser {
                    email_verified: Some(Some(Utc::now())),
                    ..Default::default()
                },
            )
            .await
    }

    pub async fn update_profile(&self, user_id: Uuid, changes: UpdateUser) -> AdapterResult<Option<User>> {
        self.adapter.update_user(user_id, changes).await
    }

    /// Deletes the user with its sessions and accounts
    pub async fn delete_account(&self, user_id: Uuid) -> AdapterResult<bool> {
        self.adapter.delete_user(user_id).await
    }
}
