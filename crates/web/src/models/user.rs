//! User domain types.

use chrono::{DateTime, Utc};

use geoart_core::{Email, UserId, Username};

use super::CurrentUser;

/// A registered user (domain type).
///
/// The password hash is deliberately not part of this type; only the user
/// store and the auth service ever see it.
#[derive(Debug, Clone)]
pub struct User {
    /// Unique user ID.
    pub id: UserId,
    /// Public display name.
    pub username: Username,
    /// Sign-in email address.
    pub email: Email,
    /// When the user signed up.
    pub created_at: DateTime<Utc>,
}

impl From<&User> for CurrentUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.to_string(),
        }
    }
}
