//! Place route handlers.
//!
//! Every handler except the map is guarded by [`RequireAuth`]; the actor it
//! yields is passed explicitly into each store call. Ownership of updates and
//! deletes is checked by the store in the same statement as the write.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Multipart, State},
    response::Redirect,
};
use serde::Serialize;
use tracing::instrument;

use geoart_core::{GeoPoint, PlaceId, UserId};

use crate::error::{AppError, Result};
use crate::extract::Path;
use crate::filters;
use crate::middleware::{OptionalAuth, RequireAuth};
use crate::models::{Comment, CurrentUser, MutationOutcome, NewPlace, Place, PlaceChanges};
use crate::services::upload::PictureUpload;
use crate::state::AppState;

// =============================================================================
// View Models
// =============================================================================

/// A place prepared for display.
#[derive(Debug, Clone)]
pub struct PlaceView {
    pub id: PlaceId,
    pub name: String,
    pub description: String,
    pub latitude: f64,
    pub longitude: f64,
    pub picture_url: Option<String>,
    pub creator: String,
    pub like_count: i64,
    pub created: String,
    /// Whether the viewer created this place. Display only.
    pub is_owner: bool,
    /// Whether the viewer currently likes this place.
    pub liked: bool,
}

impl PlaceView {
    /// Build the view of `place` as seen by `viewer`.
    #[must_use]
    pub fn new(place: &Place, viewer: Option<UserId>) -> Self {
        Self {
            id: place.id,
            name: place.name.clone(),
            description: place.description.clone(),
            latitude: place.location.latitude(),
            longitude: place.location.longitude(),
            picture_url: place.picture_url.clone(),
            creator: place.creator.username.clone(),
            like_count: place.like_count,
            created: place.created_at.format("%B %-d, %Y").to_string(),
            is_owner: viewer.is_some_and(|v| place.is_owned_by(v)),
            liked: viewer.is_some_and(|v| place.is_liked_by(v)),
        }
    }
}

/// A comment prepared for display.
#[derive(Debug, Clone)]
pub struct CommentView {
    pub id: i32,
    pub author: String,
    pub body: String,
    pub created: String,
    pub is_author: bool,
}

impl CommentView {
    fn new(comment: &Comment, viewer: UserId) -> Self {
        Self {
            id: comment.id.as_i32(),
            author: comment.author.username.clone(),
            body: comment.body.clone(),
            created: comment.created_at.format("%Y-%m-%d %H:%M").to_string(),
            is_author: comment.author.id == viewer,
        }
    }
}

/// One marker on the map, serialized into the page as JSON.
#[derive(Debug, Serialize)]
struct MapMarker<'a> {
    id: PlaceId,
    name: &'a str,
    creator: &'a str,
    /// `[longitude, latitude]`.
    coordinates: [f64; 2],
    picture_url: Option<&'a str>,
}

/// Serialize map markers for the `data-places` attribute.
fn markers_json(places: &[Place]) -> Result<String> {
    let markers: Vec<MapMarker<'_>> = places
        .iter()
        .map(|p| MapMarker {
            id: p.id,
            name: &p.name,
            creator: &p.creator.username,
            coordinates: p.location.coordinates(),
            picture_url: p.picture_url.as_deref(),
        })
        .collect();

    serde_json::to_string(&markers)
        .map_err(|e| AppError::Internal(format!("failed to serialize markers: {e}")))
}

/// OpenStreetMap directions to a point, from wherever the visitor is.
#[must_use]
pub fn directions_url(location: &GeoPoint) -> String {
    format!(
        "https://www.openstreetmap.org/directions?route=%3B{}%2C{}#map=15/{}/{}",
        location.latitude(),
        location.longitude(),
        location.latitude(),
        location.longitude()
    )
}

// =============================================================================
// Templates
// =============================================================================

/// The actor's own places.
#[derive(Template, WebTemplate)]
#[template(path = "places/my_list.html")]
pub struct MyListTemplate {
    pub current_user: Option<CurrentUser>,
    pub places: Vec<PlaceView>,
}

/// Create form.
#[derive(Template, WebTemplate)]
#[template(path = "places/create.html")]
pub struct CreateTemplate {
    pub current_user: Option<CurrentUser>,
}

/// Map of every place.
#[derive(Template, WebTemplate)]
#[template(path = "places/map.html")]
pub struct MapTemplate {
    pub current_user: Option<CurrentUser>,
    pub place_count: usize,
    pub markers_json: String,
}

/// One place with its comments.
#[derive(Template, WebTemplate)]
#[template(path = "places/single.html")]
pub struct SingleTemplate {
    pub current_user: Option<CurrentUser>,
    pub place: PlaceView,
    pub comments: Vec<CommentView>,
}

/// Update form, prefilled.
#[derive(Template, WebTemplate)]
#[template(path = "places/update.html")]
pub struct UpdateTemplate {
    pub current_user: Option<CurrentUser>,
    pub place: PlaceView,
}

/// Directions to a place.
#[derive(Template, WebTemplate)]
#[template(path = "places/directions.html")]
pub struct DirectionsTemplate {
    pub current_user: Option<CurrentUser>,
    pub place: PlaceView,
    pub directions_url: String,
}

// =============================================================================
// Form Parsing
// =============================================================================

/// Fields submitted by the create and update forms.
#[derive(Debug)]
struct PlaceForm {
    name: String,
    description: String,
    location: GeoPoint,
    picture: Option<PictureUpload>,
}

/// Read and validate a place form.
///
/// Unknown fields are ignored. The picture is optional; an empty file input
/// counts as no picture.
async fn read_place_form(mut multipart: Multipart, max_bytes: usize) -> Result<PlaceForm> {
    let mut name = String::new();
    let mut description = String::new();
    let mut latitude = String::new();
    let mut longitude = String::new();
    let mut picture = None;

    while let Some(field) = multipart.next_field().await? {
        let field_name = field.name().unwrap_or_default().to_owned();
        match field_name.as_str() {
            "name" => name = field.text().await?,
            "description" => description = field.text().await?,
            "latitude" => latitude = field.text().await?,
            "longitude" => longitude = field.text().await?,
            "picture" => {
                let content_type = field.content_type().map(str::to_owned);
                let bytes = field.bytes().await?;
                picture = PictureUpload::new(content_type.as_deref(), bytes.to_vec(), max_bytes)?;
            }
            _ => {}
        }
    }

    let name = name.trim();
    let description = description.trim();
    if name.is_empty() {
        return Err(AppError::BadRequest("A place needs a name.".to_owned()));
    }
    if description.is_empty() {
        return Err(AppError::BadRequest(
            "A place needs a description.".to_owned(),
        ));
    }

    let location = GeoPoint::parse_form(&latitude, &longitude)
        .map_err(|e| AppError::BadRequest(format!("Invalid location: {e}")))?;

    Ok(PlaceForm {
        name: name.to_owned(),
        description: description.to_owned(),
        location,
        picture,
    })
}

/// Store the picture, if any, and return its URL.
async fn store_picture(state: &AppState, picture: Option<PictureUpload>) -> Result<Option<String>> {
    match picture {
        Some(picture) => Ok(Some(state.pictures().store(picture).await?)),
        None => Ok(None),
    }
}

/// Pass through the result of a write that references a freshly stored picture.
///
/// If the write failed the picture is already stored and nothing points at it;
/// its URL is logged at `warn` so it can be removed.
fn report_orphaned_picture<T>(picture_url: Option<&str>, result: Result<T>) -> Result<T> {
    if let (Err(err), Some(url)) = (&result, picture_url) {
        tracing::warn!(picture_url = %url, error = %err, "Stored picture is orphaned");
    }
    result
}

/// Fetch a place or fail with 404.
async fn find_place(state: &AppState, id: PlaceId) -> Result<Place> {
    state
        .places()
        .find(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("place {id}")))
}

// =============================================================================
// Handlers
// =============================================================================

/// `GET /places/my-list` - the actor's places, newest first.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn my_list(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<MyListTemplate> {
    let places = state.places().list_by_creator(user.id).await?;
    let places = places
        .iter()
        .map(|p| PlaceView::new(p, Some(user.id)))
        .collect();

    Ok(MyListTemplate {
        current_user: Some(user),
        places,
    })
}

/// `GET /places/create` - the create form.
pub async fn create_page(RequireAuth(user): RequireAuth) -> CreateTemplate {
    CreateTemplate {
        current_user: Some(user),
    }
}

/// `POST /places/create` - insert a place owned by the actor.
#[instrument(skip(state, user, multipart), fields(user_id = %user.id))]
pub async fn create(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    multipart: Multipart,
) -> Result<Redirect> {
    let form = read_place_form(multipart, state.config().uploads.max_bytes).await?;
    let picture_url = store_picture(&state, form.picture).await?;

    let new_place = NewPlace {
        name: form.name,
        description: form.description,
        location: form.location,
        picture_url: picture_url.clone(),
        creator: user.id,
    };
    let created = state.places().create(new_place).await.map_err(AppError::from);
    let place = report_orphaned_picture(picture_url.as_deref(), created)?;

    tracing::info!(place_id = %place.id, "Place created");
    Ok(Redirect::to("/places/my-list"))
}

/// `GET /places/map` - every place on a map. Public.
#[instrument(skip(state, user))]
pub async fn map(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
) -> Result<MapTemplate> {
    let places = state.places().list_all().await?;

    Ok(MapTemplate {
        current_user: user,
        place_count: places.len(),
        markers_json: markers_json(&places)?,
    })
}

/// `GET /places/{id}` - one place with its comments.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<PlaceId>,
) -> Result<SingleTemplate> {
    let place = find_place(&state, id).await?;
    let comments = state.comments().list_for_place(id).await?;

    Ok(SingleTemplate {
        place: PlaceView::new(&place, Some(user.id)),
        comments: comments
            .iter()
            .map(|c| CommentView::new(c, user.id))
            .collect(),
        current_user: Some(user),
    })
}

/// `GET /places/update/{id}` - the update form. Owner only.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn update_page(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<PlaceId>,
) -> Result<UpdateTemplate> {
    let place = find_place(&state, id).await?;
    if !place.is_owned_by(user.id) {
        return Err(AppError::Forbidden(format!(
            "user {} does not own place {id}",
            user.id
        )));
    }

    Ok(UpdateTemplate {
        place: PlaceView::new(&place, Some(user.id)),
        current_user: Some(user),
    })
}

/// `POST /places/update/{id}` - replace the editable fields. Owner only.
///
/// Without a new picture the stored one is kept.
#[instrument(skip(state, user, multipart), fields(user_id = %user.id))]
pub async fn update(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<PlaceId>,
    multipart: Multipart,
) -> Result<Redirect> {
    let form = read_place_form(multipart, state.config().uploads.max_bytes).await?;

    // Fail fast before uploading anything for someone else's place.
    let place = find_place(&state, id).await?;
    if !place.is_owned_by(user.id) {
        return Err(AppError::Forbidden(format!(
            "user {} does not own place {id}",
            user.id
        )));
    }

    let picture_url = store_picture(&state, form.picture).await?;
    let changes = PlaceChanges {
        name: form.name,
        description: form.description,
        location: form.location,
        picture_url: picture_url.clone(),
    };

    let updated = match state.places().update_owned(id, user.id, changes).await {
        Ok(MutationOutcome::Applied) => Ok(()),
        Ok(MutationOutcome::NotOwner) => Err(AppError::Forbidden(format!(
            "user {} does not own place {id}",
            user.id
        ))),
        Ok(MutationOutcome::Missing) => Err(AppError::NotFound(format!("place {id}"))),
        Err(e) => Err(e.into()),
    };
    report_orphaned_picture(picture_url.as_deref(), updated)?;

    tracing::info!(place_id = %id, "Place updated");
    Ok(Redirect::to("/places/my-list"))
}

/// `POST /places/like/{id}` - toggle the actor's like.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn like(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<PlaceId>,
) -> Result<Redirect> {
    let like = state
        .places()
        .toggle_like(id, user.id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("place {id}")))?;

    tracing::debug!(place_id = %id, liked = like.liked, like_count = like.like_count, "Like toggled");
    Ok(Redirect::to(&format!("/places/{id}")))
}

/// `POST /places/delete/{id}` - delete an owned place.
///
/// Always redirects home; a delete that matched nothing is logged.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn delete(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<PlaceId>,
) -> Result<Redirect> {
    match state.places().delete_owned(id, user.id).await? {
        MutationOutcome::Applied => tracing::info!(place_id = %id, "Place deleted"),
        MutationOutcome::NotOwner => {
            tracing::warn!(place_id = %id, "Delete ignored: actor does not own the place");
        }
        MutationOutcome::Missing => {
            tracing::warn!(place_id = %id, "Delete ignored: place does not exist");
        }
    }

    Ok(Redirect::to("/"))
}

/// `GET /places/directions/{id}` - how to get to a place.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn directions(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<PlaceId>,
) -> Result<DirectionsTemplate> {
    let place = find_place(&state, id).await?;

    Ok(DirectionsTemplate {
        directions_url: directions_url(&place.location),
        place: PlaceView::new(&place, Some(user.id)),
        current_user: Some(user),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::{Arc, Mutex};

    use chrono::Utc;
    use tracing::field::Field;
    use tracing_subscriber::layer::{Context, Layer, SubscriberExt};
    use tracing_subscriber::util::SubscriberInitExt;

    use super::*;
    use crate::models::Creator;

    fn place() -> Place {
        Place {
            id: PlaceId::new(3),
            name: "Mural".to_string(),
            description: "Big wall".to_string(),
            location: GeoPoint::new(-9.14, 38.72).unwrap(),
            picture_url: None,
            creator: Creator {
                id: UserId::new(1),
                username: "ana".to_string(),
            },
            like_count: 1,
            liked_by: vec![UserId::new(2)],
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_place_view_flags() {
        let place = place();

        let owner = PlaceView::new(&place, Some(UserId::new(1)));
        assert!(owner.is_owner);
        assert!(!owner.liked);

        let fan = PlaceView::new(&place, Some(UserId::new(2)));
        assert!(!fan.is_owner);
        assert!(fan.liked);

        let anonymous = PlaceView::new(&place, None);
        assert!(!anonymous.is_owner && !anonymous.liked);
    }

    #[test]
    fn test_markers_are_longitude_first() {
        let json = markers_json(&[place()]).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value[0]["coordinates"][0], -9.14);
        assert_eq!(value[0]["coordinates"][1], 38.72);
        assert_eq!(value[0]["creator"], "ana");
    }

    /// Collects the fields of every `warn` event.
    #[derive(Clone, Default)]
    struct Warnings(Arc<Mutex<Vec<String>>>);

    impl<S: tracing::Subscriber> Layer<S> for Warnings {
        fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
            if *event.metadata().level() != tracing::Level::WARN {
                return;
            }
            let mut fields = String::new();
            event.record(&mut |field: &Field, value: &dyn std::fmt::Debug| {
                fields.push_str(&format!("{}={value:?} ", field.name()));
            });
            self.0.lock().unwrap().push(fields);
        }
    }

    #[test]
    fn test_failed_write_reports_stored_picture() {
        let warnings = Warnings::default();
        let _guard = tracing_subscriber::registry()
            .with(warnings.clone())
            .set_default();

        let failed: Result<()> = report_orphaned_picture(
            Some("/uploads/abc.png"),
            Err(AppError::NotFound("place 4".to_string())),
        );
        assert!(matches!(failed, Err(AppError::NotFound(_))));

        let ok = report_orphaned_picture(Some("/uploads/def.png"), Ok(7));
        assert_eq!(ok.unwrap(), 7);

        let no_picture: Result<()> =
            report_orphaned_picture(None, Err(AppError::Internal("db down".to_string())));
        assert!(no_picture.is_err());

        let logged = warnings.0.lock().unwrap().clone();
        assert_eq!(logged.len(), 1);
        assert!(logged[0].contains("/uploads/abc.png"));
    }

    #[test]
    fn test_directions_url_targets_place() {
        let url = directions_url(&GeoPoint::new(-9.14, 38.72).unwrap());
        assert!(url.contains("route=%3B38.72%2C-9.14"));
    }
}
