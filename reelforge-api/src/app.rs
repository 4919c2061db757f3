/// Application state and router builder
///
/// This module defines the shared application state and assembles the Axum
/// router: static auth routes, registry-driven resource routes, the
/// integrations proxy, and the middleware stack around all of them.
///
/// # Example
///
/// ```no_run
/// use reelforge_api::{app::{build_router, AppState}, config::Config, registry::RouteRegistry, routes};
/// use reelforge_shared::db::{Database, DatabaseConfig};
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let db = Database::connect(DatabaseConfig {
///     url: config.database.url.clone(),
///     ..Default::default()
/// })
/// .await?;
///
/// let state = AppState::with_postgres_auth(db, config)?;
/// let registry = RouteRegistry::from_manifest(routes::api::catalog());
/// let app = build_router(state, &registry);
///
/// let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
/// axum::serve(listener, app).await?;
/// # Ok(())
/// # }
/// ```

use std::sync::Arc;
use std::time::Duration as StdDuration;

use axum::{
    extract::{DefaultBodyLimit, Request},
    http::{header, HeaderName, HeaderValue, Method},
    middleware::{from_fn, from_fn_with_state},
    routing::{any, get, patch, post},
    Router,
};
use chrono::Duration;
use reelforge_shared::{
    auth::{
        adapter::PgAuthAdapter,
        middleware::session_cookie,
        service::{AuthService, SessionSettings},
        token::sign_token,
    },
    db::Database,
};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::{
    config::{AuthConfig, Config},
    error::{ApiError, ApiResult},
    middleware::{
        auth_context::auth_context_layer,
        body_limit::body_limit_layer,
        error_boundary::error_boundary_layer,
        request_id::{request_id_layer, REQUEST_ID_HEADER},
        security::SecurityHeadersLayer,
    },
    registry::RouteRegistry,
    routes,
};

/// Shared application state
///
/// Cloned for each request handler via Axum's `State` extractor; every
/// field is a cheap handle.
#[derive(Clone)]
pub struct AppState {
    /// Database handle
    pub db: Database,

    /// Sign-in, sessions, and account lifecycle
    pub auth: AuthService,

    /// Application configuration
    pub config: Arc<Config>,

    /// Client for the integrations proxy
    pub http: reqwest::Client,
}

/// Session lifetimes from configuration
pub fn session_settings(auth: &AuthConfig) -> SessionSettings {
    SessionSettings {
        max_age: Duration::seconds(auth.session_max_age_secs),
        update_age: Duration::seconds(auth.session_update_age_secs),
    }
}

impl AppState {
    pub fn new(db: Database, auth: AuthService, config: Config) -> Result<Self, reqwest::Error> {
        Ok(Self {
            db,
            auth,
            config: Arc::new(config),
            http: routes::proxy::http_client()?,
        })
    }

    /// State whose auth service stores users and sessions in `db`
    pub fn with_postgres_auth(db: Database, config: Config) -> Result<Self, reqwest::Error> {
        let adapter = Arc::new(PgAuthAdapter::new(db.clone()));
        let auth = AuthService::new(adapter, session_settings(&config.auth));
        Self::new(db, auth, config)
    }

    /// Session cookies carry `Secure` in production
    pub fn secure_cookies(&self) -> bool {
        self.config.api.production
    }

    /// `Set-Cookie` value for a freshly opened session
    pub fn session_cookie(&self, session_token: &str) -> ApiResult<String> {
        let signed = sign_token(session_token, &self.config.auth.secret).map_err(|e| {
            tracing::error!(error = %e, "Failed to sign session token");
            ApiError::InternalError("Internal server error".to_string())
        })?;

        Ok(session_cookie(
            &signed,
            self.config.auth.session_max_age_secs,
            self.secure_cookies(),
        ))
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// ```text
/// /
/// ├── /health                        # Health check (public)
/// ├── /api/
/// │   ├── /auth/                     # Static auth endpoints
/// │   │   ├── POST /signup
/// │   │   ├── POST /signin
/// │   │   ├── POST /signout
/// │   │   ├── GET  /session
/// │   │   ├── POST /verify-email/request
/// │   │   └── POST /verify-email
/// │   ├── PATCH|DELETE /account
/// │   └── ...                        # Route registry (videos, crm, contact)
/// └── /integrations/*path            # Reverse proxy (when configured)
/// ```
pub fn build_router(state: AppState, registry: &RouteRegistry<AppState>) -> Router {
    let auth_routes = Router::new()
        .route("/signup", post(routes::auth::sign_up))
        .route("/signin", post(routes::auth::sign_in))
        .route("/signout", post(routes::auth::sign_out))
        .route("/session", get(routes::auth::session))
        .route("/verify-email/request", post(routes::auth::request_email_verification))
        .route("/verify-email", post(routes::auth::verify_email));

    let api_routes = registry
        .router()
        .nest("/auth", auth_routes)
        .route(
            "/account",
            patch(routes::account::update_profile).delete(routes::account::delete_account),
        );

    let mut router = Router::new()
        .route("/health", get(routes::health::health_check))
        .nest("/api", api_routes);

    if state.config.integrations.is_some() {
        router = router.route("/integrations/*path", any(routes::proxy::forward));
    }

    apply_middleware(router, state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|origin| origin == "*") {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = origins.iter().filter_map(|origin| origin.parse().ok()).collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            HeaderName::from_static(REQUEST_ID_HEADER),
        ])
        .expose_headers([HeaderName::from_static(REQUEST_ID_HEADER)])
        .allow_credentials(true)
        .max_age(StdDuration::from_secs(3600))
}

/// Wraps `router` in the middleware stack and binds the state
///
/// Outermost first: request id (and its log span), security headers, panic
/// boundary, request logging (outside production), CORS (when configured), body limit, auth
/// context.
pub fn apply_middleware(router: Router<AppState>, state: AppState) -> Router {
    let config = state.config.clone();

    let mut router = router
        .layer(from_fn_with_state(state.clone(), auth_context_layer))
        .layer(from_fn_with_state(config.api.body_limit, body_limit_layer))
        .layer(DefaultBodyLimit::max(config.api.body_limit));

    if !config.api.cors_origins.is_empty() {
        router = router.layer(cors_layer(&config.api.cors_origins));
    }

    if !config.api.production {
        router = router.layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &Request| {
                    tracing::info_span!("http", method = %req.method(), uri = %req.uri())
                })
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        );
    }

    router
        .layer(from_fn(error_boundary_layer))
        .layer(SecurityHeadersLayer::new(config.api.production))
        .layer(from_fn(request_id_layer))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_settings_from_config() {
        let config = Config::for_testing("test-secret-key-at-least-32-bytes-long");
        let settings = session_settings(&config.auth);

        assert_eq!(settings.max_age, Duration::days(30));
        assert_eq!(settings.update_age, Duration::days(1));
    }

    #[test]
    fn test_cors_layer_accepts_wildcard_and_lists() {
        let _ = cors_layer(&["*".to_string()]);
        let _ = cors_layer(&["https://app.example.com".to_string(), "not a header\n".to_string()]);
    }
}
