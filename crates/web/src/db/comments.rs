//! Comment store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use geoart_core::{CommentId, PlaceId, UserId};

use super::RepositoryError;
use crate::models::{Comment, Creator, MutationOutcome, NewComment};

/// Persistent collection of comments.
#[async_trait]
pub trait CommentStore: Send + Sync {
    /// Add a comment. Returns `None` if the place does not exist.
    async fn add(&self, comment: NewComment) -> Result<Option<Comment>, RepositoryError>;

    /// Fetch one comment.
    async fn find(&self, id: CommentId) -> Result<Option<Comment>, RepositoryError>;

    /// Comments on a place, oldest first.
    async fn list_for_place(&self, place_id: PlaceId) -> Result<Vec<Comment>, RepositoryError>;

    /// Delete a comment written by `author`.
    async fn delete_authored(
        &self,
        id: CommentId,
        author: UserId,
    ) -> Result<MutationOutcome, RepositoryError>;
}

#[derive(sqlx::FromRow)]
struct CommentRow {
    id: CommentId,
    place_id: PlaceId,
    author_id: UserId,
    author_username: String,
    body: String,
    created_at: DateTime<Utc>,
}

impl From<CommentRow> for Comment {
    fn from(row: CommentRow) -> Self {
        Self {
            id: row.id,
            place_id: row.place_id,
            author: Creator {
                id: row.author_id,
                username: row.author_username,
            },
            body: row.body,
            created_at: row.created_at,
        }
    }
}

const SELECT_COMMENTS: &str = r"
    SELECT c.id, c.place_id, c.author_id, u.username AS author_username, c.body, c.created_at
    FROM comments c
    JOIN users u ON u.id = c.author_id
";

/// `PostgreSQL` implementation of [`CommentStore`].
pub struct PgCommentStore {
    pool: PgPool,
}

impl PgCommentStore {
    /// Create a new comment store.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CommentStore for PgCommentStore {
    async fn add(&self, comment: NewComment) -> Result<Option<Comment>, RepositoryError> {
        let id: Option<CommentId> = sqlx::query_scalar(
            r"
            INSERT INTO comments (place_id, author_id, body)
            SELECT $1, $2, $3
            WHERE EXISTS (SELECT 1 FROM places WHERE id = $1)
            RETURNING id
            ",
        )
        .bind(comment.place_id)
        .bind(comment.author)
        .bind(&comment.body)
        .fetch_optional(&self.pool)
        .await?;

        match id {
            Some(id) => self.find(id).await,
            None => Ok(None),
        }
    }

    async fn find(&self, id: CommentId) -> Result<Option<Comment>, RepositoryError> {
        let row = sqlx::query_as::<_, CommentRow>(&format!("{SELECT_COMMENTS} WHERE c.id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(Comment::from))
    }

    async fn list_for_place(&self, place_id: PlaceId) -> Result<Vec<Comment>, RepositoryError> {
        let rows = sqlx::query_as::<_, CommentRow>(&format!(
            "{SELECT_COMMENTS} WHERE c.place_id = $1 ORDER BY c.created_at ASC, c.id ASC"
        ))
        .bind(place_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Comment::from).collect())
    }

    async fn delete_authored(
        &self,
        id: CommentId,
        author: UserId,
    ) -> Result<MutationOutcome, RepositoryError> {
        let result = sqlx::query("DELETE FROM comments WHERE id = $1 AND author_id = $2")
            .bind(id)
            .bind(author)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() > 0 {
            return Ok(MutationOutcome::Applied);
        }

        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM comments WHERE id = $1)")
                .bind(id)
                .fetch_one(&self.pool)
                .await?;

        Ok(if exists {
            MutationOutcome::NotOwner
        } else {
            MutationOutcome::Missing
        })
    }
}
