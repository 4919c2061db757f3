/// Top-level panic boundary
///
/// A panic anywhere below this layer becomes a response instead of a dropped
/// connection. Browser navigations (GET) get a minimal HTML page with status
/// 200; everything else gets a 500 JSON error.

use std::any::Any;
use std::panic::AssertUnwindSafe;

use axum::{
    extract::Request,
    http::{Method, StatusCode},
    middleware::Next,
    response::{Html, IntoResponse, Response},
    Json,
};
use futures::FutureExt;
use serde_json::json;

use super::request_id::RequestContext;

/// Message in the JSON body of non-GET failures
pub const APP_ERROR_MESSAGE: &str = "An error occurred in your app";

const ERROR_PAGE: &str = "<!DOCTYPE html>\n\
<html lang=\"en\">\n\
<head><meta charset=\"utf-8\"><title>Something went wrong</title></head>\n\
<body>\n\
<h1>Something went wrong</h1>\n\
<p>An error occurred in your app. Please try again.</p>\n\
</body>\n\
</html>\n";

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        msg
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.as_str()
    } else {
        "unknown panic"
    }
}

pub async fn error_boundary_layer(req: Request, next: Next) -> Response {
    let is_get = req.method() == Method::GET;
    let request_id = req
        .extensions()
        .get::<RequestContext>()
        .map(|ctx| ctx.request_id.clone())
        .unwrap_or_default();

    match AssertUnwindSafe(next.run(req)).catch_unwind().await {
        Ok(response) => response,
        Err(payload) => {
            tracing::error!(
                request_id = %request_id,
                panic = panic_message(payload.as_ref()),
                "Request handler panicked"
            );

            if is_get {
                (StatusCode::OK, Html(ERROR_PAGE)).into_response()
            } else {
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": APP_ERROR_MESSAGE })),
                )
                    .into_response()
            }
        }
    }
}
