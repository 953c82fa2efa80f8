//! User store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use geoart_core::{Email, UserId, Username};

use super::{RepositoryError, map_unique_violation};
use crate::models::User;

/// Persistent collection of users.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert a user.
    ///
    /// Fails with `RepositoryError::Conflict` naming `username` or `email`
    /// when either is taken.
    async fn create(
        &self,
        username: &Username,
        email: &Email,
        password_hash: &str,
    ) -> Result<User, RepositoryError>;

    /// Fetch one user.
    async fn find(&self, id: UserId) -> Result<Option<User>, RepositoryError>;

    /// Fetch a user and their password hash by email.
    async fn find_with_password(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError>;
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: UserId,
    username: String,
    email: String,
    password_hash: String,
    created_at: DateTime<Utc>,
}

impl UserRow {
    fn into_user(self) -> Result<(User, String), RepositoryError> {
        let username = Username::parse(&self.username).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid username in database: {e}"))
        })?;
        let email = Email::parse(&self.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;

        Ok((
            User {
                id: self.id,
                username,
                email,
                created_at: self.created_at,
            },
            self.password_hash,
        ))
    }
}

/// `PostgreSQL` implementation of [`UserStore`].
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    /// Create a new user store.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn create(
        &self,
        username: &Username,
        email: &Email,
        password_hash: &str,
    ) -> Result<User, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(
            r"
            INSERT INTO users (username, email, password_hash)
            VALUES ($1, $2, $3)
            RETURNING id, username, email, password_hash, created_at
            ",
        )
        .bind(username.as_str())
        .bind(email.as_str())
        .bind(password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match map_unique_violation(e) {
            RepositoryError::Conflict(constraint) => {
                RepositoryError::Conflict(conflicting_field(&constraint).to_owned())
            }
            other => other,
        })?;

        row.into_user().map(|(user, _)| user)
    }

    async fn find(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, username, email, password_hash, created_at FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| r.into_user().map(|(user, _)| user)).transpose()
    }

    async fn find_with_password(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, username, email, password_hash, created_at FROM users WHERE email = $1",
        )
        .bind(email.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(UserRow::into_user).transpose()
    }
}

/// Which sign-up field a violated unique constraint guards.
///
/// `users_email_key` guards the email; `users_username_key` and the
/// case-insensitive `users_username_lower_key` guard the username.
fn conflicting_field(constraint: &str) -> &'static str {
    if constraint.contains("email") {
        "email"
    } else {
        "username"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constraint_names_map_to_form_fields() {
        assert_eq!(conflicting_field("users_email_key"), "email");
        assert_eq!(conflicting_field("users_username_key"), "username");
        assert_eq!(conflicting_field("users_username_lower_key"), "username");
    }
}
