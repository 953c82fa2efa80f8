//! Profile page route handler.

use askama::Template;
use askama_web::WebTemplate;
use axum::extract::State;
use tracing::instrument;

use crate::error::{AppError, Result};
use crate::filters;
use crate::middleware::RequireAuth;
use crate::models::{CurrentUser, Place};
use crate::state::AppState;

/// The actor's own profile.
#[derive(Template, WebTemplate)]
#[template(path = "profile.html")]
pub struct ProfileTemplate {
    pub current_user: Option<CurrentUser>,
    pub username: String,
    pub email: String,
    pub joined: String,
    pub place_count: usize,
    pub likes_received: i64,
}

/// Likes summed over a user's places.
fn likes_received(places: &[Place]) -> i64 {
    places.iter().map(|p| p.like_count).sum()
}

/// `GET /profile` - the actor's account and sharing summary.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn profile(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<ProfileTemplate> {
    // The session can outlive the account row.
    let account = state
        .users()
        .find(user.id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("user {}", user.id)))?;
    let places = state.places().list_by_creator(user.id).await?;

    Ok(ProfileTemplate {
        username: account.username.as_str().to_owned(),
        email: account.email.as_str().to_owned(),
        joined: account.created_at.format("%B %-d, %Y").to_string(),
        place_count: places.len(),
        likes_received: likes_received(&places),
        current_user: Some(user),
    })
}
