//! Place store.
//!
//! Every mutation is a single SQL statement, so concurrent requests rely on
//! `PostgreSQL` row-level atomicity instead of application locks. Ownership is
//! part of the `WHERE` clause of update and delete.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use geoart_core::{GeoPoint, PlaceId, UserId};

use super::RepositoryError;
use crate::models::{Creator, LikeState, MutationOutcome, NewPlace, Place, PlaceChanges};

/// Persistent collection of places.
#[async_trait]
pub trait PlaceStore: Send + Sync {
    /// Insert a place and return it with its creator resolved.
    async fn create(&self, place: NewPlace) -> Result<Place, RepositoryError>;

    /// Fetch one place.
    async fn find(&self, id: PlaceId) -> Result<Option<Place>, RepositoryError>;

    /// Every place, newest first.
    async fn list_all(&self) -> Result<Vec<Place>, RepositoryError>;

    /// The `limit` most recent places.
    async fn list_recent(&self, limit: i64) -> Result<Vec<Place>, RepositoryError>;

    /// Places created by `creator`, newest first.
    async fn list_by_creator(&self, creator: UserId) -> Result<Vec<Place>, RepositoryError>;

    /// Replace the editable fields of a place owned by `actor`.
    ///
    /// A `None` picture keeps the stored one.
    async fn update_owned(
        &self,
        id: PlaceId,
        actor: UserId,
        changes: PlaceChanges,
    ) -> Result<MutationOutcome, RepositoryError>;

    /// Flip `actor`'s like on a place in one atomic step.
    ///
    /// Returns `None` if the place does not exist.
    async fn toggle_like(
        &self,
        id: PlaceId,
        actor: UserId,
    ) -> Result<Option<LikeState>, RepositoryError>;

    /// Delete a place owned by `actor`, with its likes and comments.
    async fn delete_owned(
        &self,
        id: PlaceId,
        actor: UserId,
    ) -> Result<MutationOutcome, RepositoryError>;

    /// Check that the store is reachable.
    async fn ping(&self) -> Result<(), RepositoryError>;
}

/// Row shape shared by every place query.
#[derive(sqlx::FromRow)]
struct PlaceRow {
    id: PlaceId,
    name: String,
    description: String,
    longitude: f64,
    latitude: f64,
    picture_url: Option<String>,
    creator_id: UserId,
    creator_username: String,
    like_count: i64,
    liked_by: Vec<i32>,
    created_at: DateTime<Utc>,
}

impl TryFrom<PlaceRow> for Place {
    type Error = RepositoryError;

    fn try_from(row: PlaceRow) -> Result<Self, Self::Error> {
        let location = GeoPoint::new(row.longitude, row.latitude).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid location for place {}: {e}", row.id))
        })?;

        Ok(Self {
            id: row.id,
            name: row.name,
            description: row.description,
            location,
            picture_url: row.picture_url,
            creator: Creator {
                id: row.creator_id,
                username: row.creator_username,
            },
            like_count: row.like_count,
            liked_by: row.liked_by.into_iter().map(UserId::new).collect(),
            created_at: row.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct LikeRow {
    like_count: i64,
    liked: bool,
}

/// Build a place `SELECT` with the creator joined and likes aggregated.
fn select_places(tail: &str) -> String {
    format!(
        r"
        SELECT p.id, p.name, p.description, p.longitude, p.latitude, p.picture_url,
               p.creator_id, u.username AS creator_username, p.like_count,
               ARRAY(
                   SELECT l.user_id FROM place_likes l
                   WHERE l.place_id = p.id
                   ORDER BY l.user_id
               ) AS liked_by,
               p.created_at
        FROM places p
        JOIN users u ON u.id = p.creator_id
        {tail}
        "
    )
}

fn into_places(rows: Vec<PlaceRow>) -> Result<Vec<Place>, RepositoryError> {
    rows.into_iter().map(Place::try_from).collect()
}

/// `PostgreSQL` implementation of [`PlaceStore`].
pub struct PgPlaceStore {
    pool: PgPool,
}

impl PgPlaceStore {
    /// Create a new place store.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn exists(&self, id: PlaceId) -> Result<bool, RepositoryError> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM places WHERE id = $1)")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }

    async fn outcome_for_miss(&self, id: PlaceId) -> Result<MutationOutcome, RepositoryError> {
        if self.exists(id).await? {
            Ok(MutationOutcome::NotOwner)
        } else {
            Ok(MutationOutcome::Missing)
        }
    }
}

#[async_trait]
impl PlaceStore for PgPlaceStore {
    async fn create(&self, place: NewPlace) -> Result<Place, RepositoryError> {
        let id: PlaceId = sqlx::query_scalar(
            r"
            INSERT INTO places (name, description, longitude, latitude, picture_url, creator_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            ",
        )
        .bind(&place.name)
        .bind(&place.description)
        .bind(place.location.longitude())
        .bind(place.location.latitude())
        .bind(place.picture_url.as_deref())
        .bind(place.creator)
        .fetch_one(&self.pool)
        .await?;

        self.find(id).await?.ok_or(RepositoryError::NotFound)
    }

    async fn find(&self, id: PlaceId) -> Result<Option<Place>, RepositoryError> {
        let row = sqlx::query_as::<_, PlaceRow>(&select_places("WHERE p.id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Place::try_from).transpose()
    }

    async fn list_all(&self) -> Result<Vec<Place>, RepositoryError> {
        let rows = sqlx::query_as::<_, PlaceRow>(&select_places(
            "ORDER BY p.created_at DESC, p.id DESC",
        ))
        .fetch_all(&self.pool)
        .await?;

        into_places(rows)
    }

    async fn list_recent(&self, limit: i64) -> Result<Vec<Place>, RepositoryError> {
        let rows = sqlx::query_as::<_, PlaceRow>(&select_places(
            "ORDER BY p.created_at DESC, p.id DESC LIMIT $1",
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        into_places(rows)
    }

    async fn list_by_creator(&self, creator: UserId) -> Result<Vec<Place>, RepositoryError> {
        let rows = sqlx::query_as::<_, PlaceRow>(&select_places(
            "WHERE p.creator_id = $1 ORDER BY p.created_at DESC, p.id DESC",
        ))
        .bind(creator)
        .fetch_all(&self.pool)
        .await?;

        into_places(rows)
    }

    async fn update_owned(
        &self,
        id: PlaceId,
        actor: UserId,
        changes: PlaceChanges,
    ) -> Result<MutationOutcome, RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE places
            SET name = $3,
                description = $4,
                longitude = $5,
                latitude = $6,
                picture_url = COALESCE($7, picture_url),
                updated_at = now()
            WHERE id = $1 AND creator_id = $2
            ",
        )
        .bind(id)
        .bind(actor)
        .bind(&changes.name)
        .bind(&changes.description)
        .bind(changes.location.longitude())
        .bind(changes.location.latitude())
        .bind(changes.picture_url.as_deref())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() > 0 {
            return Ok(MutationOutcome::Applied);
        }
        self.outcome_for_miss(id).await
    }

    async fn toggle_like(
        &self,
        id: PlaceId,
        actor: UserId,
    ) -> Result<Option<LikeState>, RepositoryError> {
        // Remove-if-present, otherwise add-if-absent, and move the counter by
        // the net change, all in one statement.
        let row = sqlx::query_as::<_, LikeRow>(
            r"
            WITH target AS (
                SELECT id FROM places WHERE id = $1
            ), removed AS (
                DELETE FROM place_likes
                WHERE place_id = $1 AND user_id = $2
                RETURNING user_id
            ), inserted AS (
                INSERT INTO place_likes (place_id, user_id)
                SELECT id, $2 FROM target
                WHERE NOT EXISTS (SELECT 1 FROM removed)
                ON CONFLICT (place_id, user_id) DO NOTHING
                RETURNING user_id
            )
            UPDATE places
            SET like_count = like_count
                + (SELECT count(*) FROM inserted)
                - (SELECT count(*) FROM removed)
            WHERE id = $1
            RETURNING like_count, EXISTS (SELECT 1 FROM inserted) AS liked
            ",
        )
        .bind(id)
        .bind(actor)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| LikeState {
            liked: r.liked,
            like_count: r.like_count,
        }))
    }

    async fn delete_owned(
        &self,
        id: PlaceId,
        actor: UserId,
    ) -> Result<MutationOutcome, RepositoryError> {
        let result = sqlx::query("DELETE FROM places WHERE id = $1 AND creator_id = $2")
            .bind(id)
            .bind(actor)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() > 0 {
            return Ok(MutationOutcome::Applied);
        }
        self.outcome_for_miss(id).await
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_places_appends_tail() {
        let sql = select_places("WHERE p.id = $1");
        assert!(sql.contains("JOIN users u ON u.id = p.creator_id"));
        assert!(sql.trim_end().ends_with("WHERE p.id = $1"));
    }
}
