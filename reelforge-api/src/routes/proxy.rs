/// Integrations reverse proxy
///
/// ```text
/// ANY /integrations/*path  ->  {INTEGRATIONS_UPSTREAM_URL}/integrations/*path
/// ```
///
/// Method, query string, headers, and body are forwarded. Hop-by-hop headers
/// are dropped in both directions; when `INTEGRATIONS_HOST` is set it replaces
/// `Host`, `X-Forwarded-Host`, and `X-Forwarded-For`. Redirects are passed
/// back to the caller rather than followed. Bodies are streamed both ways.

use axum::{
    body::{Body, Bytes, HttpBody},
    extract::{Request, State},
    http::{HeaderMap, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use futures::{channel::mpsc, SinkExt, StreamExt};

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    middleware::request_id::RequestContext,
};

/// Headers that describe a single connection and must not be forwarded
const HOP_BY_HOP: [&str; 9] = [
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "proxy-connection",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

const UPSTREAM_UNAVAILABLE: &str = "Integration service unavailable";

/// Chunks buffered between the incoming body and the upstream request
const BODY_CHANNEL_CAPACITY: usize = 8;

fn is_hop_by_hop(name: &str) -> bool {
    HOP_BY_HOP.contains(&name)
}

/// Builds a client that leaves redirects to the caller
pub fn http_client() -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
}

/// Headers sent upstream
///
/// `content-length` is recomputed from the buffered body and `host` comes
/// from the target URL unless overridden.
fn upstream_headers(incoming: &HeaderMap, host_override: Option<&str>) -> reqwest::header::HeaderMap {
    let mut headers = reqwest::header::HeaderMap::with_capacity(incoming.len());

    for (name, value) in incoming {
        let name = name.as_str();
        if is_hop_by_hop(name) || name == "host" || name == "content-length" {
            continue;
        }
        if let (Ok(name), Ok(value)) = (
            reqwest::header::HeaderName::from_bytes(name.as_bytes()),
            reqwest::header::HeaderValue::from_bytes(value.as_bytes()),
        ) {
            headers.append(name, value);
        }
    }

    if let Some(host) = host_override {
        if let Ok(value) = reqwest::header::HeaderValue::from_str(host) {
            for name in ["host", "x-forwarded-host", "x-forwarded-for"] {
                headers.insert(reqwest::header::HeaderName::from_static(name), value.clone());
            }
        }
    }

    headers
}

/// Headers returned to the caller
fn downstream_headers(upstream: &reqwest::header::HeaderMap) -> HeaderMap {
    let mut headers = HeaderMap::with_capacity(upstream.len());

    for (name, value) in upstream {
        if is_hop_by_hop(name.as_str()) {
            continue;
        }
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_str().as_bytes()),
            HeaderValue::from_bytes(value.as_bytes()),
        ) {
            headers.append(name, value);
        }
    }

    headers
}

pub async fn forward(State(state): State<AppState>, ctx: RequestContext, req: Request) -> ApiResult<Response> {
    let Some(integrations) = state.config.integrations.as_ref() else {
        return Err(ApiError::NotFound("Not found".to_string()));
    };

    let path_and_query = req
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or_else(|| req.uri().path());
    let url = format!("{}{}", integrations.upstream_url, path_and_query);

    let method = reqwest::Method::from_bytes(req.method().as_str().as_bytes())
        .map_err(|_| ApiError::BadRequest("Unsupported method".to_string()))?;
    let headers = upstream_headers(req.headers(), integrations.host.as_deref());

    let body = upstream_body(req.into_body(), state.config.api.body_limit);

    tracing::debug!(request_id = %ctx.request_id, method = %method, url = %url, "Forwarding to integrations upstream");

    let upstream = state
        .http
        .request(method, &url)
        .headers(headers)
        .body(body)
        .send()
        .await
        .map_err(|e| {
            tracing::error!(request_id = %ctx.request_id, error = %e, url = %url, "Integrations upstream request failed");
            ApiError::BadGateway(UPSTREAM_UNAVAILABLE.to_string())
        })?;

    let status = StatusCode::from_u16(upstream.status().as_u16()).unwrap_or(StatusCode::BAD_GATEWAY);
    let headers = downstream_headers(upstream.headers());
    let body = Body::from_stream(upstream.bytes_stream());

    let mut response = (status, body).into_response();
    response.headers_mut().extend(headers);
    Ok(response)
}

/// Streams `body` to the upstream request, cutting it off past `limit` bytes
///
/// reqwest wants a `Sync` stream, which the incoming body isn't, so a task
/// pumps it through a channel.
fn upstream_body(body: Body, limit: usize) -> reqwest::Body {
    if body.size_hint().exact() == Some(0) {
        return reqwest::Body::from(Bytes::new());
    }

    let (mut tx, rx) = mpsc::channel::<Result<Bytes, axum::Error>>(BODY_CHANNEL_CAPACITY);
    let mut chunks = body.into_data_stream();

    tokio::spawn(async move {
        let mut sent = 0usize;
        while let Some(chunk) = chunks.next().await {
            let chunk = chunk.and_then(|bytes| {
                sent += bytes.len();
                if sent > limit {
                    Err(axum::Error::new(ApiError::PayloadTooLarge))
                } else {
                    Ok(bytes)
                }
            });

            let failed = chunk.is_err();
            if tx.send(chunk).await.is_err() || failed {
                break;
            }
        }
    });

    reqwest::Body::wrap_stream(rx)
}
