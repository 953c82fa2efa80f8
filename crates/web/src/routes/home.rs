//! Home page route handler.

use askama::Template;
use askama_web::WebTemplate;
use axum::extract::State;
use tracing::instrument;

use crate::error::Result;
use crate::filters;
use crate::middleware::OptionalAuth;
use crate::models::CurrentUser;
use crate::routes::places::PlaceView;
use crate::state::AppState;

/// How many places the home feed shows.
const HOME_FEED_SIZE: i64 = 20;

/// Home page template.
#[derive(Template, WebTemplate)]
#[template(path = "home.html")]
pub struct HomeTemplate {
    pub current_user: Option<CurrentUser>,
    pub places: Vec<PlaceView>,
}

/// `GET /` - the most recent places.
#[instrument(skip(state, user))]
pub async fn home(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
) -> Result<HomeTemplate> {
    let viewer = user.as_ref().map(|u| u.id);
    let places = state.places().list_recent(HOME_FEED_SIZE).await?;

    Ok(HomeTemplate {
        places: places.iter().map(|p| PlaceView::new(p, viewer)).collect(),
        current_user: user,
    })
}
