/// Request body cap for POST, PUT, and PATCH
///
/// A declared `Content-Length` over the cap is rejected without reading the
/// body. Otherwise the body is buffered up to the cap; running past it is
/// rejected the same way. Other methods pass through untouched.

use axum::{
    body::{to_bytes, Body},
    extract::{Request, State},
    http::{header, Method},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::error::ApiError;

fn is_limited(method: &Method) -> bool {
    matches!(*method, Method::POST | Method::PUT | Method::PATCH)
}

fn declared_length(req: &Request) -> Option<u64> {
    req.headers()
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
}

pub async fn body_limit_layer(State(limit): State<usize>, req: Request, next: Next) -> Response {
    if !is_limited(req.method()) {
        return next.run(req).await;
    }

    if declared_length(&req).is_some_and(|len| len > limit as u64) {
        return ApiError::PayloadTooLarge.into_response();
    }

    let (parts, body) = req.into_parts();
    let bytes = match to_bytes(body, limit).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::debug!(error = %e, limit, "Rejecting request body");
            return ApiError::PayloadTooLarge.into_response();
        }
    };

    next.run(Request::from_parts(parts, Body::from(bytes))).await
}
