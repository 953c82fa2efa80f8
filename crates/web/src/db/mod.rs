//! Record stores for GeoArt.
//!
//! # Database: `geoart`
//!
//! ## Tables
//!
//! - `users` - Accounts (username, email, argon2 password hash)
//! - `places` - Shared places with coordinates and like counter
//! - `place_likes` - Set of (place, user) likes; primary key enforces at-most-once
//! - `comments` - Comments left on places
//! - `tower_sessions.session` - Session storage (owned by the session store)
//!
//! Each table is reached through a store trait (`PlaceStore`, `UserStore`,
//! `CommentStore`). The `PostgreSQL` implementations live next to their trait;
//! [`memory::MemoryStore`] implements all three in process.
//!
//! # Migrations
//!
//! Migrations are stored in `crates/web/migrations/` and run via:
//! ```bash
//! cargo run -p geoart-cli -- migrate
//! ```

pub mod comments;
pub mod memory;
pub mod places;
pub mod users;

use std::sync::Arc;
use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use comments::{CommentStore, PgCommentStore};
pub use memory::MemoryStore;
pub use places::{PgPlaceStore, PlaceStore};
pub use users::{PgUserStore, UserStore};

/// Errors from any record store.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique email).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// The three record stores, shared by every request.
#[derive(Clone)]
pub struct Stores {
    pub places: Arc<dyn PlaceStore>,
    pub users: Arc<dyn UserStore>,
    pub comments: Arc<dyn CommentStore>,
}

impl Stores {
    /// Stores backed by a `PostgreSQL` pool.
    #[must_use]
    pub fn postgres(pool: &PgPool) -> Self {
        Self {
            places: Arc::new(PgPlaceStore::new(pool.clone())),
            users: Arc::new(PgUserStore::new(pool.clone())),
            comments: Arc::new(PgCommentStore::new(pool.clone())),
        }
    }

    /// Stores backed by one shared in-memory store.
    #[must_use]
    pub fn memory() -> Self {
        let store = Arc::new(MemoryStore::new());
        Self {
            places: store.clone(),
            users: store.clone(),
            comments: store,
        }
    }
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Map a unique-constraint violation to `Conflict`, naming the constraint.
pub(crate) fn map_unique_violation(e: sqlx::Error) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.is_unique_violation()
    {
        let constraint = db_err.constraint().unwrap_or("unique").to_owned();
        return RepositoryError::Conflict(constraint);
    }
    RepositoryError::Database(e)
}
