/// Session resolution
///
/// Attaches an `AuthContext` to every request. Missing, forged, or expired
/// credentials leave the request anonymous; it's up to each handler whether
/// that means 401.
///
/// When the lookup slid a cookie session's expiry forward, the cookie is
/// re-issued so the browser keeps it as long as the server does. Responses
/// that already set the cookie (sign-in, sign-out) are left alone.

use axum::{
    extract::{Request, State},
    http::{header, HeaderValue},
    middleware::Next,
    response::Response,
};
use reelforge_shared::auth::middleware::{cookie_value, resolve_auth_context, SESSION_COOKIE_NAME};

use crate::app::AppState;

pub async fn auth_context_layer(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    let ctx = resolve_auth_context(&state.auth, req.headers(), &state.config.auth.secret).await;

    let refreshed_token = ctx
        .session
        .as_ref()
        .filter(|active| active.extended)
        .filter(|_| cookie_value(req.headers(), SESSION_COOKIE_NAME).is_some())
        .map(|active| active.session.session_token.clone());

    req.extensions_mut().insert(ctx);
    let mut response = next.run(req).await;

    if let Some(token) = refreshed_token {
        if !response.headers().contains_key(header::SET_COOKIE) {
            if let Some(value) = state
                .session_cookie(&token)
                .ok()
                .and_then(|cookie| HeaderValue::from_str(&cookie).ok())
            {
                response.headers_mut().insert(header::SET_COOKIE, value);
            }
        }
    }

    response
}
