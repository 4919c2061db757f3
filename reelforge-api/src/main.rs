//! # Reelforge API Server
//!
//! Serves the Reelforge HTTP API: credentials auth, videos, CRM contacts,
//! the contact form, and the integrations proxy.
//!
//! ## Usage
//!
//! ```bash
//! cargo run -p reelforge-api
//! ```
//!
//! Set `LOG_FORMAT=json` for JSON log lines; `RUST_LOG` overrides the filter.

use anyhow::Context;
use reelforge_api::{
    app::{build_router, AppState},
    config::Config,
    registry::RouteRegistry,
    routes,
};
use reelforge_shared::db::{migrations::run_migrations, Database, DatabaseConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "reelforge_api=debug,reelforge_shared=debug,tower_http=debug".into());

    let json = std::env::var("LOG_FORMAT").map(|v| v == "json").unwrap_or(false);
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    tracing::info!("Reelforge API Server v{} starting...", env!("CARGO_PKG_VERSION"));

    let config = Config::from_env()?;

    let db = Database::connect(DatabaseConfig {
        url: config.database.url.clone(),
        max_connections: config.database.max_connections,
        ..Default::default()
    })
    .await
    .context("Failed to connect to database")?;

    if config.run_migrations {
        run_migrations(&db).await.context("Failed to run migrations")?;
    }

    let registry = match &config.routes_dir {
        Some(dir) => RouteRegistry::discover(dir.clone(), routes::api::catalog())
            .with_context(|| format!("Failed to load routes from {}", dir.display()))?,
        None => RouteRegistry::from_manifest(routes::api::catalog()),
    };
    tracing::info!(routes = registry.descriptors().len(), "Route table ready");

    let bind_address = config.bind_address();
    let state = AppState::with_postgres_auth(db.clone(), config).context("Failed to build HTTP client")?;
    let app = build_router(state, &registry);

    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("Failed to bind {}", bind_address))?;
    tracing::info!("Server listening on http://{}", bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    db.close().await;
    tracing::info!("Server stopped");

    Ok(())
}
