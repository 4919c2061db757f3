/// API route handlers
///
/// - `health`: Health check endpoint
/// - `auth`: Credentials sign-up/sign-in, sessions, email verification
/// - `account`: Profile update and account deletion
/// - `api`: Resource route modules, registered through the route registry
/// - `proxy`: Integrations reverse proxy

pub mod account;
pub mod api;
pub mod auth;
pub mod health;
pub mod proxy;

use crate::{error::ApiError, middleware::request_id::RequestContext};

/// Logs a storage failure against the request and hides it behind `message`
pub(crate) fn db_error(ctx: &RequestContext, message: &str, err: impl std::fmt::Display) -> ApiError {
    tracing::error!(request_id = %ctx.request_id, error = %err, "{}", message);
    ApiError::InternalError(message.to_string())
}
