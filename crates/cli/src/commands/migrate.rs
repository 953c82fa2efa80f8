//! Database migration commands.
//!
//! Application migrations live in `crates/web/migrations` and are embedded at
//! compile time. The session table belongs to `tower-sessions-sqlx-store` and
//! is created through its own `migrate()`.

use secrecy::{ExposeSecret, SecretString};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tower_sessions_sqlx_store::PostgresStore;

/// Errors that can occur during migrations.
#[derive(Debug, thiserror::Error)]
pub enum MigrationError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    /// Database connection error.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Migration error.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Read the database URL, preferring `GEOART_DATABASE_URL` over `DATABASE_URL`.
fn database_url() -> Result<SecretString, MigrationError> {
    std::env::var("GEOART_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map(SecretString::from)
        .map_err(|_| MigrationError::MissingEnvVar("GEOART_DATABASE_URL"))
}

/// Connect to the GeoArt database.
///
/// # Errors
///
/// Returns an error if the URL is not set or the connection fails.
pub async fn connect() -> Result<PgPool, MigrationError> {
    dotenvy::dotenv().ok();
    let database_url = database_url()?;

    tracing::info!("Connecting to GeoArt database...");
    let pool = PgPoolOptions::new()
        .max_connections(1)
        .connect(database_url.expose_secret())
        .await?;
    Ok(pool)
}

/// Run application schema migrations.
///
/// # Errors
///
/// Returns an error if a migration fails.
pub async fn app(pool: &PgPool) -> Result<(), MigrationError> {
    tracing::info!("Running application migrations...");
    sqlx::migrate!("../web/migrations").run(pool).await?;
    tracing::info!("Application migrations complete");
    Ok(())
}

/// Create the session store schema.
///
/// # Errors
///
/// Returns an error if the session table cannot be created.
pub async fn sessions(pool: &PgPool) -> Result<(), MigrationError> {
    tracing::info!("Running session store migration...");
    PostgresStore::new(pool.clone()).migrate().await?;
    tracing::info!("Session store migration complete");
    Ok(())
}
