//! Domain models for GeoArt.
//!
//! These types are what handlers and templates work with; the database row
//! types stay private to the `db` module.

pub mod comment;
pub mod place;
pub mod session;
pub mod user;

pub use comment::{Comment, NewComment};
pub use place::{Creator, LikeState, MutationOutcome, NewPlace, Place, PlaceChanges};
pub use session::{CurrentUser, keys as session_keys};
pub use user::User;
