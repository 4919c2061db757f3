/// Configuration for the API server
///
/// Read once from the environment at start-up (a `.env` file is loaded first
/// when present).
///
/// # Environment Variables
///
/// - `DATABASE_URL`: PostgreSQL connection string (required)
/// - `DATABASE_MAX_CONNECTIONS`: Pool size (default: 10)
/// - `AUTH_SECRET`: Session cookie signing key, at least 32 chars (required)
/// - `SESSION_MAX_AGE_SECS`: Session lifetime (default: 30 days)
/// - `SESSION_UPDATE_AGE_SECS`: Minimum time between session extensions (default: 1 day)
/// - `API_HOST` / `API_PORT`: Bind address (default: 0.0.0.0:8080)
/// - `APP_ENV`: `production` disables request logging and enables secure cookies and HSTS
/// - `CORS_ORIGINS`: Comma-separated allowed origins, `*` for any (CORS off when unset)
/// - `BODY_LIMIT_BYTES`: Request body cap for POST/PUT/PATCH (default: 4718592)
/// - `INTEGRATIONS_UPSTREAM_URL`: Target of `/integrations/*` (proxy off when unset)
/// - `INTEGRATIONS_HOST`: Host presented to the integrations upstream
/// - `ROUTES_DIR`: Scan this directory for route modules instead of using the built-in manifest
/// - `RUN_MIGRATIONS`: Apply pending migrations on start (default: true)
///
/// # Example
///
/// ```no_run
/// use reelforge_api::config::Config;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// println!("Server will listen on {}", config.bind_address());
/// # Ok(())
/// # }
/// ```

use std::env;
use std::path::PathBuf;

/// Default request body cap: 4.5 MiB
pub const DEFAULT_BODY_LIMIT: usize = 4_718_592;

const THIRTY_DAYS_SECS: i64 = 30 * 24 * 60 * 60;
const ONE_DAY_SECS: i64 = 24 * 60 * 60;

/// Complete application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub api: ApiConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub integrations: Option<IntegrationsConfig>,

    /// Directory to scan for route modules
    pub routes_dir: Option<PathBuf>,

    /// Apply migrations at start-up
    pub run_migrations: bool,
}

/// API server configuration
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,

    /// Production mode
    pub production: bool,

    /// Allowed CORS origins; empty disables CORS handling
    pub cors_origins: Vec<String>,

    /// Body cap for POST/PUT/PATCH, in bytes
    pub body_limit: usize,
}

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

/// Session and cookie configuration
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// HMAC key for session cookies
    ///
    /// Must be at least 32 characters. Generate with: `openssl rand -hex 32`
    pub secret: String,

    pub session_max_age_secs: i64,
    pub session_update_age_secs: i64,
}

/// Integrations reverse proxy configuration
#[derive(Debug, Clone)]
pub struct IntegrationsConfig {
    /// Base URL requests are forwarded to
    pub upstream_url: String,

    /// Overrides `Host`, `X-Forwarded-Host`, and `X-Forwarded-For` when set
    pub host: Option<String>,
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Splits a comma-separated origin list
pub fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(str::to_string)
        .collect()
}

impl Config {
    /// Loads configuration from environment variables
    ///
    /// # Errors
    ///
    /// Fails when a required variable is missing, `AUTH_SECRET` is shorter
    /// than 32 characters, or a numeric variable doesn't parse.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let api_host = env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let api_port = env::var("API_PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse::<u16>()?;

        let production = env::var("APP_ENV").map(|v| v == "production").unwrap_or(false);

        let cors_origins = non_empty_var("CORS_ORIGINS")
            .map(|raw| parse_origins(&raw))
            .unwrap_or_default();

        let body_limit = env::var("BODY_LIMIT_BYTES")
            .unwrap_or_else(|_| DEFAULT_BODY_LIMIT.to_string())
            .parse::<usize>()?;

        let database_url = env::var("DATABASE_URL")
            .map_err(|_| anyhow::anyhow!("DATABASE_URL environment variable is required"))?;

        let max_connections = env::var("DATABASE_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "10".to_string())
            .parse::<u32>()?;

        let secret = env::var("AUTH_SECRET")
            .map_err(|_| anyhow::anyhow!("AUTH_SECRET environment variable is required"))?;

        if secret.len() < 32 {
            anyhow::bail!("AUTH_SECRET must be at least 32 characters long");
        }

        let session_max_age_secs = env::var("SESSION_MAX_AGE_SECS")
            .unwrap_or_else(|_| THIRTY_DAYS_SECS.to_string())
            .parse::<i64>()?;
        let session_update_age_secs = env::var("SESSION_UPDATE_AGE_SECS")
            .unwrap_or_else(|_| ONE_DAY_SECS.to_string())
            .parse::<i64>()?;

        let integrations = non_empty_var("INTEGRATIONS_UPSTREAM_URL").map(|upstream_url| IntegrationsConfig {
            upstream_url: upstream_url.trim_end_matches('/').to_string(),
            host: non_empty_var("INTEGRATIONS_HOST"),
        });

        let run_migrations = env::var("RUN_MIGRATIONS")
            .map(|v| v != "false" && v != "0")
            .unwrap_or(true);

        Ok(Self {
            api: ApiConfig {
                host: api_host,
                port: api_port,
                production,
                cors_origins,
                body_limit,
            },
            database: DatabaseConfig {
                url: database_url,
                max_connections,
            },
            auth: AuthConfig {
                secret,
                session_max_age_secs,
                session_update_age_secs,
            },
            integrations,
            routes_dir: non_empty_var("ROUTES_DIR").map(PathBuf::from),
            run_migrations,
        })
    }

    /// Returns the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }

    /// Development defaults with the given secret; used by tests and tools
    pub fn for_testing(secret: impl Into<String>) -> Self {
        Self {
            api: ApiConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
                production: false,
                cors_origins: Vec::new(),
                body_limit: DEFAULT_BODY_LIMIT,
            },
            database: DatabaseConfig {
                url: "postgresql://localhost/reelforge_test".to_string(),
                max_connections: 5,
            },
            auth: AuthConfig {
                secret: secret.into(),
                session_max_age_secs: THIRTY_DAYS_SECS,
                session_update_age_secs: ONE_DAY_SECS,
            },
            integrations: None,
            routes_dir: None,
            run_migrations: false,
        }
    }
}
