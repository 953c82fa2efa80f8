//! Comment domain types.

use chrono::{DateTime, Utc};

use geoart_core::{CommentId, PlaceId, UserId};

use super::Creator;

/// Maximum comment length in characters.
pub const MAX_COMMENT_LENGTH: usize = 1000;

/// A comment left on a place.
#[derive(Debug, Clone)]
pub struct Comment {
    pub id: CommentId,
    pub place_id: PlaceId,
    pub author: Creator,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

/// Input for adding a comment.
#[derive(Debug, Clone)]
pub struct NewComment {
    pub place_id: PlaceId,
    pub author: UserId,
    pub body: String,
}

impl NewComment {
    /// Build a comment, trimming the body.
    ///
    /// Returns `None` when the trimmed body is empty or too long.
    #[must_use]
    pub fn new(place_id: PlaceId, author: UserId, body: &str) -> Option<Self> {
        let body = body.trim();
        let len = body.chars().count();
        if len == 0 || len > MAX_COMMENT_LENGTH {
            return None;
        }
        Some(Self {
            place_id,
            author,
            body: body.to_owned(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_body_is_trimmed_and_bounded() {
        let comment = NewComment::new(PlaceId::new(1), UserId::new(1), "  nice spot \n");
        assert_eq!(comment.map(|c| c.body), Some("nice spot".to_string()));

        assert!(NewComment::new(PlaceId::new(1), UserId::new(1), "   ").is_none());
        let long = "x".repeat(MAX_COMMENT_LENGTH + 1);
        assert!(NewComment::new(PlaceId::new(1), UserId::new(1), &long).is_none());
    }
}
