/// Database layer for Reelforge
///
/// This module provides the injected database handle, pool configuration, and
/// the migration runner. Models live in the crate-level `models` module.
///
/// # Modules
///
/// - `pool`: `Database` handle wrapping a PostgreSQL pool, with health checks
/// - `migrations`: Embedded sqlx migrations
///
/// # Example
///
/// ```no_run
/// use reelforge_shared::db::pool::{Database, DatabaseConfig};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = DatabaseConfig {
///         url: std::env::var("DATABASE_URL")?,
///         ..Default::default()
///     };
///
///     let db = Database::connect(config).await?;
///     reelforge_shared::db::migrations::run_migrations(&db).await?;
///     Ok(())
/// }
/// ```

pub mod migrations;
pub mod pool;

pub use pool::{Database, DatabaseConfig};
