//! In-process implementation of every store.
//!
//! Behaves like the `PostgreSQL` stores (ordering, ownership filters, atomic
//! like toggle, cascading deletes) and backs the router tests. One lock
//! guards all tables, so each operation is atomic.

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use geoart_core::{CommentId, Email, GeoPoint, PlaceId, UserId, Username};

use super::{CommentStore, PlaceStore, RepositoryError, UserStore};
use crate::models::{
    Comment, Creator, LikeState, MutationOutcome, NewComment, NewPlace, Place, PlaceChanges, User,
};

struct UserRecord {
    user: User,
    password_hash: String,
}

struct PlaceRecord {
    name: String,
    description: String,
    location: GeoPoint,
    picture_url: Option<String>,
    creator: UserId,
    like_count: i64,
    liked_by: BTreeSet<UserId>,
    created_at: DateTime<Utc>,
}

struct CommentRecord {
    place_id: PlaceId,
    author: UserId,
    body: String,
    created_at: DateTime<Utc>,
}

#[derive(Default)]
struct Tables {
    users: BTreeMap<UserId, UserRecord>,
    places: BTreeMap<PlaceId, PlaceRecord>,
    comments: BTreeMap<CommentId, CommentRecord>,
    next_user: i32,
    next_place: i32,
    next_comment: i32,
}

impl Tables {
    fn creator(&self, id: UserId) -> Result<Creator, RepositoryError> {
        self.users
            .get(&id)
            .map(|r| Creator {
                id,
                username: r.user.username.to_string(),
            })
            .ok_or_else(|| RepositoryError::DataCorruption(format!("dangling user reference {id}")))
    }

    fn place(&self, id: PlaceId, record: &PlaceRecord) -> Result<Place, RepositoryError> {
        Ok(Place {
            id,
            name: record.name.clone(),
            description: record.description.clone(),
            location: record.location,
            picture_url: record.picture_url.clone(),
            creator: self.creator(record.creator)?,
            like_count: record.like_count,
            liked_by: record.liked_by.iter().copied().collect(),
            created_at: record.created_at,
        })
    }

    /// Places matching `filter`, newest first (ties broken by id).
    fn places_where(
        &self,
        filter: impl Fn(&PlaceRecord) -> bool,
    ) -> Result<Vec<Place>, RepositoryError> {
        let mut matching: Vec<(&PlaceId, &PlaceRecord)> =
            self.places.iter().filter(|(_, r)| filter(r)).collect();
        matching.sort_by(|(a_id, a), (b_id, b)| {
            b.created_at.cmp(&a.created_at).then_with(|| b_id.cmp(a_id))
        });
        matching
            .into_iter()
            .map(|(id, record)| self.place(*id, record))
            .collect()
    }

    fn comment(&self, id: CommentId, record: &CommentRecord) -> Result<Comment, RepositoryError> {
        Ok(Comment {
            id,
            place_id: record.place_id,
            author: self.creator(record.author)?,
            body: record.body.clone(),
            created_at: record.created_at,
        })
    }
}

/// In-memory store implementing [`PlaceStore`], [`UserStore`] and [`CommentStore`].
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PlaceStore for MemoryStore {
    async fn create(&self, place: NewPlace) -> Result<Place, RepositoryError> {
        let mut tables = self.tables.write().await;
        if !tables.users.contains_key(&place.creator) {
            return Err(RepositoryError::Conflict("places_creator_id_fkey".to_owned()));
        }

        tables.next_place += 1;
        let id = PlaceId::new(tables.next_place);
        let record = PlaceRecord {
            name: place.name,
            description: place.description,
            location: place.location,
            picture_url: place.picture_url,
            creator: place.creator,
            like_count: 0,
            liked_by: BTreeSet::new(),
            created_at: Utc::now(),
        };
        let created = tables.place(id, &record)?;
        tables.places.insert(id, record);
        Ok(created)
    }

    async fn find(&self, id: PlaceId) -> Result<Option<Place>, RepositoryError> {
        let tables = self.tables.read().await;
        tables
            .places
            .get(&id)
            .map(|record| tables.place(id, record))
            .transpose()
    }

    async fn list_all(&self) -> Result<Vec<Place>, RepositoryError> {
        self.tables.read().await.places_where(|_| true)
    }

    async fn list_recent(&self, limit: i64) -> Result<Vec<Place>, RepositoryError> {
        let limit = usize::try_from(limit).unwrap_or(0);
        let mut places = self.tables.read().await.places_where(|_| true)?;
        places.truncate(limit);
        Ok(places)
    }

    async fn list_by_creator(&self, creator: UserId) -> Result<Vec<Place>, RepositoryError> {
        self.tables
            .read()
            .await
            .places_where(|r| r.creator == creator)
    }

    async fn update_owned(
        &self,
        id: PlaceId,
        actor: UserId,
        changes: PlaceChanges,
    ) -> Result<MutationOutcome, RepositoryError> {
        let mut tables = self.tables.write().await;
        let Some(record) = tables.places.get_mut(&id) else {
            return Ok(MutationOutcome::Missing);
        };
        if record.creator != actor {
            return Ok(MutationOutcome::NotOwner);
        }

        record.name = changes.name;
        record.description = changes.description;
        record.location = changes.location;
        if let Some(url) = changes.picture_url {
            record.picture_url = Some(url);
        }
        Ok(MutationOutcome::Applied)
    }

    async fn toggle_like(
        &self,
        id: PlaceId,
        actor: UserId,
    ) -> Result<Option<LikeState>, RepositoryError> {
        let mut tables = self.tables.write().await;
        let Some(record) = tables.places.get_mut(&id) else {
            return Ok(None);
        };

        let liked = if record.liked_by.remove(&actor) {
            record.like_count -= 1;
            false
        } else {
            record.liked_by.insert(actor);
            record.like_count += 1;
            true
        };

        Ok(Some(LikeState {
            liked,
            like_count: record.like_count,
        }))
    }

    async fn delete_owned(
        &self,
        id: PlaceId,
        actor: UserId,
    ) -> Result<MutationOutcome, RepositoryError> {
        let mut tables = self.tables.write().await;
        match tables.places.get(&id) {
            None => return Ok(MutationOutcome::Missing),
            Some(record) if record.creator != actor => return Ok(MutationOutcome::NotOwner),
            Some(_) => {}
        }

        tables.places.remove(&id);
        tables.comments.retain(|_, c| c.place_id != id);
        Ok(MutationOutcome::Applied)
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        Ok(())
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn create(
        &self,
        username: &Username,
        email: &Email,
        password_hash: &str,
    ) -> Result<User, RepositoryError> {
        let mut tables = self.tables.write().await;
        for existing in tables.users.values() {
            if existing.user.email == *email {
                return Err(RepositoryError::Conflict("email".to_owned()));
            }
            if existing
                .user
                .username
                .as_str()
                .eq_ignore_ascii_case(username.as_str())
            {
                return Err(RepositoryError::Conflict("username".to_owned()));
            }
        }

        tables.next_user += 1;
        let user = User {
            id: UserId::new(tables.next_user),
            username: username.clone(),
            email: email.clone(),
            created_at: Utc::now(),
        };
        tables.users.insert(
            user.id,
            UserRecord {
                user: user.clone(),
                password_hash: password_hash.to_owned(),
            },
        );
        Ok(user)
    }

    async fn find(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        Ok(self
            .tables
            .read()
            .await
            .users
            .get(&id)
            .map(|r| r.user.clone()))
    }

    async fn find_with_password(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        Ok(self
            .tables
            .read()
            .await
            .users
            .values()
            .find(|r| r.user.email == *email)
            .map(|r| (r.user.clone(), r.password_hash.clone())))
    }
}

#[async_trait]
impl CommentStore for MemoryStore {
    async fn add(&self, comment: NewComment) -> Result<Option<Comment>, RepositoryError> {
        let mut tables = self.tables.write().await;
        if !tables.places.contains_key(&comment.place_id) {
            return Ok(None);
        }

        tables.next_comment += 1;
        let id = CommentId::new(tables.next_comment);
        let record = CommentRecord {
            place_id: comment.place_id,
            author: comment.author,
            body: comment.body,
            created_at: Utc::now(),
        };
        let added = tables.comment(id, &record)?;
        tables.comments.insert(id, record);
        Ok(Some(added))
    }

    async fn find(&self, id: CommentId) -> Result<Option<Comment>, RepositoryError> {
        let tables = self.tables.read().await;
        tables
            .comments
            .get(&id)
            .map(|record| tables.comment(id, record))
            .transpose()
    }

    async fn list_for_place(&self, place_id: PlaceId) -> Result<Vec<Comment>, RepositoryError> {
        let tables = self.tables.read().await;
        // Ids are assigned in insertion order, so map order is oldest first.
        tables
            .comments
            .iter()
            .filter(|(_, c)| c.place_id == place_id)
            .map(|(id, record)| tables.comment(*id, record))
            .collect()
    }

    async fn delete_authored(
        &self,
        id: CommentId,
        author: UserId,
    ) -> Result<MutationOutcome, RepositoryError> {
        let mut tables = self.tables.write().await;
        match tables.comments.get(&id) {
            None => Ok(MutationOutcome::Missing),
            Some(c) if c.author != author => Ok(MutationOutcome::NotOwner),
            Some(_) => {
                tables.comments.remove(&id);
                Ok(MutationOutcome::Applied)
            }
        }
    }
}
