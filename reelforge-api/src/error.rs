/// Error handling for the API server
///
/// Handlers return `ApiResult<T>`; every error renders as the JSON envelope
///
/// ```json
/// { "error": "message", "details": [ { "field": "title", "message": "..." } ] }
/// ```
///
/// where `details` only appears for validation failures. Internal errors
/// carry a generic, client-safe message; the underlying cause is logged where
/// it happens, never sent.
///
/// # Example
///
/// ```
/// use reelforge_api::error::{ApiError, ApiResult};
/// use axum::Json;
/// use serde_json::{json, Value};
///
/// async fn handler(found: bool) -> ApiResult<Json<Value>> {
///     if !found {
///         return Err(ApiError::NotFound("Contact not found".to_string()));
///     }
///     Ok(Json(json!({ "success": true })))
/// }
/// ```

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use reelforge_shared::auth::{adapter::AuthAdapterError, middleware::AuthError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// API result type alias
pub type ApiResult<T> = Result<T, ApiError>;

/// Body of 401 responses for protected resources
pub const UNAUTHORIZED_MESSAGE: &str = "Unauthorized";

/// Body of 413 responses
pub const BODY_LIMIT_MESSAGE: &str = "Body size limit exceeded";

/// Unified API error type
#[derive(Debug)]
pub enum ApiError {
    /// Bad request (400)
    BadRequest(String),

    /// Missing or invalid fields (400)
    ValidationError(Vec<ValidationErrorDetail>),

    /// Unauthorized (401)
    Unauthorized(String),

    /// Not found (404)
    NotFound(String),

    /// Request body over the configured cap (413)
    PayloadTooLarge,

    /// Internal server error (500); the message is what the client sees
    InternalError(String),

    /// Upstream failure while proxying (502)
    BadGateway(String),
}

/// Validation error detail
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationErrorDetail {
    /// Field that failed validation
    pub field: String,

    /// Error message
    pub message: String,

    /// The field was absent rather than present but unacceptable
    #[serde(skip)]
    pub missing: bool,
}

/// Error response format
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Human-readable error message
    pub error: String,

    /// Per-field validation failures
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<ValidationErrorDetail>>,
}

impl ApiError {
    pub fn unauthorized() -> Self {
        ApiError::Unauthorized(UNAUTHORIZED_MESSAGE.to_string())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) | ApiError::ValidationError(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::BadGateway(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

/// Validator code for present-but-empty values; every other rule guards a required field
pub const BLANK_FIELD_CODE: &str = "blank";

/// Summary line for a set of field failures
///
/// `Missing required fields: title, prompt` when every failure is an absent
/// field, `Invalid fields: name` otherwise.
fn validation_summary(errors: &[ValidationErrorDetail]) -> String {
    let mut fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
    fields.sort_unstable();
    fields.dedup();

    if errors.iter().all(|e| e.missing) {
        format!("Missing required fields: {}", fields.join(", "))
    } else {
        format!("Invalid fields: {}", fields.join(", "))
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            ApiError::ValidationError(errors) => {
                write!(f, "Validation failed: {} errors", errors.len())
            }
            ApiError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            ApiError::NotFound(msg) => write!(f, "Not found: {}", msg),
            ApiError::PayloadTooLarge => write!(f, "{}", BODY_LIMIT_MESSAGE),
            ApiError::InternalError(msg) => write!(f, "Internal error: {}", msg),
            ApiError::BadGateway(msg) => write!(f, "Bad gateway: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        let (message, details) = match self {
            ApiError::ValidationError(errors) => (validation_summary(&errors), Some(errors)),
            ApiError::PayloadTooLarge => (BODY_LIMIT_MESSAGE.to_string(), None),
            ApiError::BadRequest(msg)
            | ApiError::Unauthorized(msg)
            | ApiError::NotFound(msg)
            | ApiError::InternalError(msg)
            | ApiError::BadGateway(msg) => (msg, None),
        };

        let body = Json(ErrorResponse {
            error: message,
            details,
        });

        (status, body).into_response()
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(err: validator::ValidationErrors) -> Self {
        let errors: Vec<ValidationErrorDetail> = err
            .field_errors()
            .iter()
            .flat_map(|(field, errors)| {
                errors.iter().map(move |error| ValidationErrorDetail {
                    field: field.to_string(),
                    message: error
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("{} is required", field)),
                    missing: error.code != BLANK_FIELD_CODE,
                })
            })
            .collect();

        ApiError::ValidationError(errors)
    }
}

/// Malformed or oversized JSON bodies
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            return ApiError::PayloadTooLarge;
        }
        ApiError::BadRequest(rejection.body_text())
    }
}

/// Fallback for database errors that weren't given a handler-specific message
impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        tracing::error!(error = %err, "Database error");
        ApiError::InternalError("Internal server error".to_string())
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Unauthorized => ApiError::unauthorized(),
        }
    }
}

impl From<AuthAdapterError> for ApiError {
    fn from(err: AuthAdapterError) -> Self {
        tracing::error!(error = %err, "Auth storage error");
        ApiError::InternalError("Internal server error".to_string())
    }
}
