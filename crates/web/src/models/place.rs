//! Place domain types.

use chrono::{DateTime, Utc};

use geoart_core::{GeoPoint, PlaceId, UserId};

/// The user who created a place, resolved for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Creator {
    pub id: UserId,
    pub username: String,
}

/// A shared place.
///
/// `like_count` always equals `liked_by.len()`; both are only changed
/// together by the store's like toggle.
#[derive(Debug, Clone)]
pub struct Place {
    pub id: PlaceId,
    pub name: String,
    pub description: String,
    pub location: GeoPoint,
    pub picture_url: Option<String>,
    pub creator: Creator,
    pub like_count: i64,
    /// Users currently liking this place, sorted and unique.
    pub liked_by: Vec<UserId>,
    pub created_at: DateTime<Utc>,
}

impl Place {
    /// Whether `user` created this place.
    #[must_use]
    pub fn is_owned_by(&self, user: UserId) -> bool {
        self.creator.id == user
    }

    /// Whether `user` currently likes this place.
    #[must_use]
    pub fn is_liked_by(&self, user: UserId) -> bool {
        self.liked_by.binary_search(&user).is_ok()
    }
}

/// Input for creating a place.
#[derive(Debug, Clone)]
pub struct NewPlace {
    pub name: String,
    pub description: String,
    pub location: GeoPoint,
    pub picture_url: Option<String>,
    pub creator: UserId,
}

/// Field-level replacement applied by an update.
///
/// `picture_url: None` keeps the stored picture.
#[derive(Debug, Clone)]
pub struct PlaceChanges {
    pub name: String,
    pub description: String,
    pub location: GeoPoint,
    pub picture_url: Option<String>,
}

/// Result of a mutation that is filtered by ownership.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationOutcome {
    /// The row matched id and owner and was changed.
    Applied,
    /// The row exists but belongs to someone else; nothing changed.
    NotOwner,
    /// No row with that id.
    Missing,
}

/// Like state of a place right after a toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LikeState {
    /// Whether the actor likes the place after the toggle.
    pub liked: bool,
    pub like_count: i64,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn place_with_likes(liked_by: Vec<UserId>) -> Place {
        Place {
            id: PlaceId::new(1),
            name: "Cafe".to_string(),
            description: "Corner cafe".to_string(),
            location: GeoPoint::new(-3.0, 40.0).unwrap(),
            picture_url: None,
            creator: Creator {
                id: UserId::new(10),
                username: "ana".to_string(),
            },
            like_count: i64::try_from(liked_by.len()).unwrap(),
            liked_by,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_ownership_and_likes() {
        let place = place_with_likes(vec![UserId::new(2), UserId::new(5)]);
        assert!(place.is_owned_by(UserId::new(10)));
        assert!(!place.is_owned_by(UserId::new(2)));
        assert!(place.is_liked_by(UserId::new(5)));
        assert!(!place.is_liked_by(UserId::new(10)));
    }
}
