/// Credentials authentication endpoints
///
/// - `POST /api/auth/signup` - Create an account and sign in
/// - `POST /api/auth/signin` - Sign in with email + password
/// - `POST /api/auth/signout` - End the current session
/// - `GET /api/auth/session` - Current session, or `null`
/// - `POST /api/auth/verify-email/request` - Issue an email verification token
/// - `POST /api/auth/verify-email` - Consume a verification token
///
/// Sign-in failures all produce the same 401 body, whatever the cause.

use axum::{
    extract::State,
    http::{header, HeaderMap},
    response::IntoResponse,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use reelforge_shared::{
    auth::{
        middleware::{clear_session_cookie, session_token_from_headers, AuthContext, AuthUser},
        service::SignUp,
    },
    models::user::User,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use validator::Validate;

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::ValidatedJson,
    middleware::request_id::RequestContext,
};

/// Body of every failed sign-in
pub const INVALID_CREDENTIALS: &str = "Invalid email or password";

/// Body of every failed sign-up
pub const SIGN_UP_FAILED: &str = "Unable to create account with these credentials";

/// Sign-up request
#[derive(Debug, Deserialize, Validate)]
pub struct SignUpRequest {
    #[serde(default)]
    pub email: String,

    #[serde(default)]
    pub password: String,

    /// Defaults to the email's local part
    pub name: Option<String>,

    pub image: Option<String>,
}

/// Sign-in request
///
/// Fields default to empty so that a missing field fails the same way as a
/// wrong password.
#[derive(Debug, Deserialize, Validate)]
pub struct SignInRequest {
    #[serde(default)]
    pub email: String,

    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct VerifyEmailRequest {
    /// Email address the token was issued for
    #[serde(default)]
    #[validate(length(min = 1, message = "identifier is required"))]
    pub identifier: String,

    #[serde(default)]
    #[validate(length(min = 1, message = "token is required"))]
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub user: User,
}

#[derive(Debug, Serialize)]
pub struct SessionInfo {
    pub user: User,
    pub expires: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub session: Option<SessionInfo>,
}

/// Opens a session and answers `{user}` with the session cookie set
async fn signed_in(state: &AppState, user: User) -> ApiResult<impl IntoResponse> {
    let session = state.auth.start_session(user.id).await?;
    let cookie = state.session_cookie(&session.session_token)?;

    Ok(([(header::SET_COOKIE, cookie)], Json(UserResponse { user })))
}

/// Register with email + password
///
/// # Errors
///
/// - `400 Bad Request`: Missing field, email already registered, or storage failure
pub async fn sign_up(
    State(state): State<AppState>,
    ctx: RequestContext,
    ValidatedJson(req): ValidatedJson<SignUpRequest>,
) -> ApiResult<impl IntoResponse> {
    let form = SignUp {
        email: req.email,
        password: req.password,
        name: req.name,
        image: req.image,
    };

    let Some(user) = state.auth.sign_up(form).await else {
        tracing::info!(request_id = %ctx.request_id, "Sign-up rejected");
        return Err(ApiError::BadRequest(SIGN_UP_FAILED.to_string()));
    };

    tracing::info!(request_id = %ctx.request_id, user_id = %user.id, "Account created");
    signed_in(&state, user).await
}

/// Sign in with email + password
///
/// # Errors
///
/// - `401 Unauthorized`: `{"error": "Invalid email or password"}` for any failure
pub async fn sign_in(
    State(state): State<AppState>,
    ctx: RequestContext,
    ValidatedJson(req): ValidatedJson<SignInRequest>,
) -> ApiResult<impl IntoResponse> {
    let Some(user) = state.auth.sign_in(&req.email, &req.password).await else {
        tracing::info!(request_id = %ctx.request_id, "Sign-in rejected");
        return Err(ApiError::Unauthorized(INVALID_CREDENTIALS.to_string()));
    };

    tracing::info!(request_id = %ctx.request_id, user_id = %user.id, "Signed in");
    signed_in(&state, user).await
}

/// End the current session (if any) and clear the cookie
pub async fn sign_out(
    State(state): State<AppState>,
    ctx: RequestContext,
    headers: HeaderMap,
) -> ApiResult<impl IntoResponse> {
    if let Some(token) = session_token_from_headers(&headers, &state.config.auth.secret) {
        state.auth.end_session(&token).await.map_err(|e| {
            tracing::error!(request_id = %ctx.request_id, error = %e, "Failed to end session");
            ApiError::InternalError("Failed to sign out".to_string())
        })?;
    }

    Ok((
        [(header::SET_COOKIE, clear_session_cookie(state.secure_cookies()))],
        Json(json!({ "success": true })),
    ))
}

/// Current session
pub async fn session(Extension(auth): Extension<AuthContext>) -> Json<SessionResponse> {
    let session = auth.session.map(|active| SessionInfo {
        user: active.user,
        expires: active.session.expires,
    });

    Json(SessionResponse { session })
}

/// Issue a verification token for the signed-in user's email
///
/// Delivery is left to an outside mailer; the token is only logged at debug level.
pub async fn request_email_verification(
    State(state): State<AppState>,
    ctx: RequestContext,
    AuthUser(user): AuthUser,
) -> ApiResult<Json<serde_json::Value>> {
    let token = state.auth.issue_verification_token(&user.email).await.map_err(|e| {
        tracing::error!(request_id = %ctx.request_id, error = %e, "Failed to issue verification token");
        ApiError::InternalError("Failed to issue verification token".to_string())
    })?;

    tracing::info!(request_id = %ctx.request_id, user_id = %user.id, expires = %token.expires, "Verification token issued");
    // No mailer yet; trace level stays out of the default filter
    tracing::trace!(request_id = %ctx.request_id, token = %token.token, "Verification token value");

    Ok(Json(json!({ "success": true, "expires": token.expires })))
}

/// Consume a verification token
///
/// # Errors
///
/// - `400 Bad Request`: Missing fields, or the token is unknown, used, or expired
pub async fn verify_email(
    State(state): State<AppState>,
    ctx: RequestContext,
    ValidatedJson(req): ValidatedJson<VerifyEmailRequest>,
) -> ApiResult<Json<UserResponse>> {
    let verified = state
        .auth
        .verify_email(&req.identifier, &req.token)
        .await
        .map_err(|e| {
            tracing::error!(request_id = %ctx.request_id, error = %e, "Email verification failed");
            ApiError::InternalError("Failed to verify email".to_string())
        })?;

    match verified {
        Some(user) => Ok(Json(UserResponse { user })),
        None => Err(ApiError::BadRequest("Invalid or expired verification token".to_string())),
    }
}
