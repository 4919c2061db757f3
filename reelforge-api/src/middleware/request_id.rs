/// Request correlation ids
///
/// Every request gets an id: the caller's `x-request-id` when it looks sane
/// (1-255 chars of `[A-Za-z0-9_-]`), otherwise a fresh UUID v4. The id is
/// stored as a [`RequestContext`] extension for handlers and echoed on the
/// response. Everything logged while the request runs is inside a `request`
/// span carrying the id.

use std::convert::Infallible;

use axum::{
    async_trait,
    extract::{FromRequestParts, Request},
    http::{request::Parts, HeaderValue},
    middleware::Next,
    response::Response,
};
use tracing::Instrument;
use uuid::Uuid;

/// Correlation header
pub const REQUEST_ID_HEADER: &str = "x-request-id";

const MAX_REQUEST_ID_LEN: usize = 255;

/// Per-request data handed to handlers explicitly
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    pub request_id: String,
}

impl RequestContext {
    pub fn generate() -> Self {
        Self {
            request_id: Uuid::new_v4().to_string(),
        }
    }
}

fn is_valid_request_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= MAX_REQUEST_ID_LEN
        && id.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

/// Falls back to a fresh id when the middleware isn't installed
#[async_trait]
impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts
            .extensions
            .get::<RequestContext>()
            .cloned()
            .unwrap_or_else(RequestContext::generate))
    }
}

/// Assigns the request id and echoes it on the response
pub async fn request_id_layer(mut req: Request, next: Next) -> Response {
    let ctx = req
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|id| is_valid_request_id(id))
        .map(|id| RequestContext {
            request_id: id.to_string(),
        })
        .unwrap_or_else(RequestContext::generate);

    let header_value = HeaderValue::from_str(&ctx.request_id).ok();
    let span = tracing::info_span!("request", request_id = %ctx.request_id);
    req.extensions_mut().insert(ctx);

    let mut response = next.run(req).instrument(span).await;
    if let Some(value) = header_value {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}
