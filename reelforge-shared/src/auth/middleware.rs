/// Request authentication for Axum
///
/// The API's auth-context middleware reads the session credential from the
/// request, resolves it through [`AuthService`], and stores an
/// [`AuthContext`] in the request extensions. Anonymous requests get an empty
/// context rather than a rejection; handlers that need a user take the
/// [`AuthUser`] extractor, which answers 401 when nobody is signed in.
///
/// # Credentials
///
/// The signed session value (see [`super::token`]) is read from the
/// `reelforge.session-token` cookie, or from `Authorization: Bearer <value>`.
///
/// # Example
///
/// ```no_run
/// use reelforge_shared::auth::middleware::AuthUser;
///
/// async fn handler(AuthUser(user): AuthUser) -> String {
///     format!("Hello, {}!", user.email)
/// }
/// ```

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use uuid::Uuid;

use super::service::{ActiveSession, AuthService};
use super::token::verify_signed_token;
use crate::models::user::User;

/// Name of the session cookie
pub const SESSION_COOKIE_NAME: &str = "reelforge.session-token";

/// Who is making the request
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuthContext {
    pub session: Option<ActiveSession>,
}

impl AuthContext {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn authenticated(session: ActiveSession) -> Self {
        Self {
            session: Some(session),
        }
    }

    pub fn user(&self) -> Option<&User> {
        self.session.as_ref().map(|s| &s.user)
    }

    pub fn user_id(&self) -> Option<Uuid> {
        self.user().map(|u| u.id)
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.is_some()
    }
}

/// Error type for request authentication
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// No signed-in user
    Unauthorized,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        match self {
            AuthError::Unauthorized => {
                (StatusCode::UNAUTHORIZED, Json(json!({ "error": "Unauthorized" }))).into_response()
            }
        }
    }
}

/// Extractor for the signed-in user
#[derive(Debug, Clone, PartialEq)]
pub struct AuthUser(pub User);

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthContext>()
            .and_then(|ctx| ctx.user().cloned())
            .map(AuthUser)
            .ok_or(AuthError::Unauthorized)
    }
}

/// Finds a cookie value in the `Cookie` headers
pub fn cookie_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value)
}

/// Extracts the session token from cookie or bearer header, checking its signature
///
/// The cookie wins when both are present. A bad signature yields `None`.
pub fn session_token_from_headers(headers: &HeaderMap, secret: &str) -> Option<String> {
    let signed = cookie_value(headers, SESSION_COOKIE_NAME).or_else(|| {
        headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
    })?;

    match verify_signed_token(signed, secret) {
        Ok(token) => Some(token),
        Err(e) => {
            tracing::debug!(error = %e, "Ignoring session credential");
            None
        }
    }
}

/// Resolves the request's credential into an [`AuthContext`]
///
/// Storage failures degrade to an anonymous context; they are logged, never
/// surfaced.
pub async fn resolve_auth_context(auth: &AuthService, headers: &HeaderMap, secret: &str) -> AuthContext {
    let Some(token) = session_token_from_headers(headers, secret) else {
        return AuthContext::anonymous();
    };

    match auth.resolve_session(&token).await {
        Ok(Some(session)) => AuthContext::authenticated(session),
        Ok(None) => AuthContext::anonymous(),
        Err(e) => {
            tracing::error!(error = %e, "Session lookup failed");
            AuthContext::anonymous()
        }
    }
}

/// `Set-Cookie` value carrying a signed session
pub fn session_cookie(signed_value: &str, max_age_secs: i64, secure: bool) -> String {
    let mut cookie = format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        SESSION_COOKIE_NAME, signed_value, max_age_secs
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// `Set-Cookie` value that removes the session cookie
pub fn clear_session_cookie(secure: bool) -> String {
    session_cookie("", 0, secure)
}
