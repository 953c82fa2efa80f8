//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                              - Most recent places
//! GET  /health                        - Liveness
//! GET  /health/ready                  - Readiness (store reachable)
//!
//! # Authentication
//! GET  /authentication/sign-up        - Sign-up page
//! POST /authentication/sign-up        - Sign-up action
//! GET  /authentication/sign-in        - Sign-in page
//! POST /authentication/sign-in        - Sign-in action
//! POST /authentication/sign-out       - Sign-out action
//!
//! # Places (guarded unless noted)
//! GET  /places/my-list                - The actor's places
//! GET  /places/create                 - Create form
//! POST /places/create                 - Create action (multipart)
//! GET  /places/map                    - Map of all places (public)
//! GET  /places/{id}                   - Single place with comments
//! GET  /places/update/{id}            - Update form (owner only)
//! POST /places/update/{id}            - Update action (multipart, owner only)
//! POST /places/like/{id}              - Toggle like
//! POST /places/delete/{id}            - Delete (owner only, always redirects home)
//! GET  /places/directions/{id}        - Directions
//!
//! # Profile (guarded)
//! GET  /profile                       - The actor's account summary
//!
//! # Comments (guarded)
//! POST /comments/{place_id}           - Add a comment
//! POST /comments/delete/{id}          - Delete own comment
//!
//! # Files
//! GET  /static/*                      - Stylesheet and scripts
//! GET  /uploads/*                     - Locally stored pictures
//! ```

pub mod auth;
pub mod comments;
pub mod health;
pub mod home;
pub mod places;
pub mod profile;

#[cfg(test)]
mod tests;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use tower_http::{services::ServeDir, trace::TraceLayer};
use tower_sessions::SessionStore;

use crate::error::{error_page_middleware, not_found};
use crate::middleware::{request_id_middleware, security_headers_middleware, session_layer};
use crate::services::upload::LOCAL_UPLOADS_PATH;
use crate::state::AppState;

/// Room for the non-file form fields on top of the picture limit.
const FORM_OVERHEAD_BYTES: usize = 1024 * 1024;

/// Create the authentication routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/sign-up", get(auth::sign_up_page).post(auth::sign_up))
        .route("/sign-in", get(auth::sign_in_page).post(auth::sign_in))
        .route("/sign-out", post(auth::sign_out))
}

/// Create the place routes router.
pub fn place_routes() -> Router<AppState> {
    Router::new()
        .route("/my-list", get(places::my_list))
        .route("/create", get(places::create_page).post(places::create))
        .route("/map", get(places::map))
        .route("/{id}", get(places::show))
        .route("/update/{id}", get(places::update_page).post(places::update))
        .route("/like/{id}", post(places::like))
        .route("/delete/{id}", post(places::delete))
        .route("/directions/{id}", get(places::directions))
}

/// Create the comment routes router.
pub fn comment_routes() -> Router<AppState> {
    Router::new()
        .route("/{place_id}", post(comments::add))
        .route("/delete/{id}", post(comments::delete))
}

/// Create all page routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(home::home))
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .route("/profile", get(profile::profile))
        .nest("/authentication", auth_routes())
        .nest("/places", place_routes())
        .nest("/comments", comment_routes())
}

/// Build the full application: routes, files, error pages and middleware.
///
/// Sentry layers are added by the binary so tests run without them.
pub fn app<S>(state: AppState, session_store: S) -> Router
where
    S: SessionStore + Clone,
{
    let config = state.config();
    let body_limit = config.uploads.max_bytes + FORM_OVERHEAD_BYTES;
    let sessions = session_layer(session_store, config);
    let uploads = ServeDir::new(&config.uploads.dir);

    Router::new()
        .merge(routes())
        .nest_service("/static", ServeDir::new(static_dir()))
        .nest_service(LOCAL_UPLOADS_PATH, uploads)
        .fallback(not_found)
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            error_page_middleware,
        ))
        .layer(sessions)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(axum::middleware::from_fn(security_headers_middleware))
        .layer(axum::middleware::from_fn(request_id_middleware))
        .layer(TraceLayer::new_for_http().make_span_with(make_request_span))
        .with_state(state)
}

/// Request span with slots for the request and user IDs.
fn make_request_span(request: &axum::extract::Request) -> tracing::Span {
    tracing::info_span!(
        "request",
        method = %request.method(),
        uri = %request.uri(),
        request_id = tracing::field::Empty,
        user_id = tracing::field::Empty,
    )
}

/// Directory holding `main.css` and `map.js`.
fn static_dir() -> std::path::PathBuf {
    std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("static")
}
