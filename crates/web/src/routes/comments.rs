//! Comment route handlers.

use axum::{extract::State, response::Redirect};
use serde::Deserialize;
use tracing::instrument;

use geoart_core::{CommentId, PlaceId};

use crate::error::{AppError, Result};
use crate::extract::{Form, Path};
use crate::middleware::RequireAuth;
use crate::models::{MutationOutcome, NewComment, comment::MAX_COMMENT_LENGTH};
use crate::state::AppState;

/// Comment form data.
#[derive(Debug, Deserialize)]
pub struct CommentForm {
    pub body: String,
}

/// `POST /comments/{place_id}` - comment on a place.
#[instrument(skip(state, user, form), fields(user_id = %user.id))]
pub async fn add(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(place_id): Path<PlaceId>,
    Form(form): Form<CommentForm>,
) -> Result<Redirect> {
    let comment = NewComment::new(place_id, user.id, &form.body).ok_or_else(|| {
        AppError::BadRequest(format!(
            "A comment must be between 1 and {MAX_COMMENT_LENGTH} characters."
        ))
    })?;

    let comment = state
        .comments()
        .add(comment)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("place {place_id}")))?;

    tracing::info!(comment_id = %comment.id, place_id = %place_id, "Comment added");
    Ok(Redirect::to(&format!("/places/{place_id}")))
}

/// `POST /comments/delete/{id}` - delete one of the actor's comments.
///
/// Deleting someone else's comment does nothing.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn delete(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<CommentId>,
) -> Result<Redirect> {
    let Some(comment) = state.comments().find(id).await? else {
        tracing::warn!(comment_id = %id, "Delete ignored: comment does not exist");
        return Ok(Redirect::to("/"));
    };

    match state.comments().delete_authored(id, user.id).await? {
        MutationOutcome::Applied => tracing::info!(comment_id = %id, "Comment deleted"),
        MutationOutcome::NotOwner => {
            tracing::warn!(comment_id = %id, "Delete ignored: actor is not the author");
        }
        MutationOutcome::Missing => {
            tracing::warn!(comment_id = %id, "Delete ignored: comment already gone");
        }
    }

    Ok(Redirect::to(&format!("/places/{}", comment.place_id)))
}
