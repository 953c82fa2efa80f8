//! Router tests: the full application over in-memory stores.

#![allow(clippy::unwrap_used)]

use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
    response::Response,
};
use tower::ServiceExt;

use geoart_core::{Email, PlaceId, UserId};

use crate::config::tests::test_config;
use crate::db::Stores;
use crate::middleware::SESSION_COOKIE_NAME;
use crate::models::Place;
use crate::services::upload::LocalDiskStore;
use crate::state::AppState;

const BOUNDARY: &str = "geoart-test-boundary";

struct TestApp {
    router: Router,
    stores: Stores,
    upload_dir: PathBuf,
}

impl TestApp {
    fn new() -> Self {
        let upload_dir =
            std::env::temp_dir().join(format!("geoart-routes-{}", uuid::Uuid::new_v4()));
        let stores = Stores::memory();
        let state = AppState::new(
            test_config(upload_dir.clone()),
            stores.clone(),
            Arc::new(LocalDiskStore::new(upload_dir.clone())),
        );
        let router = super::app(state, tower_sessions::MemoryStore::default());

        Self {
            router,
            stores,
            upload_dir,
        }
    }

    async fn send(&self, request: Request<Body>) -> Response {
        self.router.clone().oneshot(request).await.unwrap()
    }

    /// Sign up a user and return their session cookie.
    async fn sign_up(&self, username: &str) -> String {
        let body = format!("username={username}&email={username}%40example.com&password=password123");
        let response = self
            .send(form_post("/authentication/sign-up", None, &body))
            .await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/places/my-list");
        session_cookie(&response).unwrap()
    }

    async fn user_id(&self, username: &str) -> UserId {
        let email = Email::parse(&format!("{username}@example.com")).unwrap();
        let (user, _) = self
            .stores
            .users
            .find_with_password(&email)
            .await
            .unwrap()
            .unwrap();
        user.id
    }

    /// Create a place through the form and return it from the store.
    async fn create_place(&self, cookie: &str, name: &str, lat: &str, lon: &str) -> Place {
        let response = self
            .send(multipart_post(
                "/places/create",
                cookie,
                &[
                    ("name", name),
                    ("description", "Worth the detour"),
                    ("latitude", lat),
                    ("longitude", lon),
                ],
                None,
            ))
            .await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/places/my-list");

        let places = self.stores.places.list_all().await.unwrap();
        places.into_iter().find(|p| p.name == name).unwrap()
    }

    async fn place(&self, id: PlaceId) -> Option<Place> {
        self.stores.places.find(id).await.unwrap()
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.upload_dir);
    }
}

fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

fn form_post(uri: &str, cookie: Option<&str>, body: &str) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(body.to_owned())).unwrap()
}

fn multipart_post(
    uri: &str,
    cookie: &str,
    fields: &[(&str, &str)],
    picture: Option<(&str, &[u8])>,
) -> Request<Body> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    if let Some((content_type, bytes)) = picture {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"picture\"; filename=\"picture\"\r\nContent-Type: {content_type}\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .header(header::COOKIE, cookie)
        .body(Body::from(body))
        .unwrap()
}

fn location(response: &Response) -> &str {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}

/// `name=value` of the session cookie set by a response, if any.
fn session_cookie(response: &Response) -> Option<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with(SESSION_COOKIE_NAME))
        .and_then(|v| v.split(';').next())
        .map(str::to_owned)
}

async fn body_text(response: Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

// =============================================================================
// Guard
// =============================================================================

#[tokio::test]
async fn test_guarded_routes_redirect_to_sign_in() {
    let app = TestApp::new();

    for uri in [
        "/places/my-list",
        "/places/create",
        "/places/1",
        "/places/update/1",
        "/places/directions/1",
        "/profile",
    ] {
        let response = app.send(get(uri, None)).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER, "{uri}");
        assert_eq!(location(&response), "/authentication/sign-in", "{uri}");
    }

    let response = app.send(form_post("/places/like/1", None, "")).await;
    assert_eq!(location(&response), "/authentication/sign-in");
}

#[tokio::test]
async fn test_public_pages_render_without_session() {
    let app = TestApp::new();

    for uri in ["/", "/places/map", "/authentication/sign-in", "/health"] {
        let response = app.send(get(uri, None)).await;
        assert_eq!(response.status(), StatusCode::OK, "{uri}");
    }

    let response = app.send(get("/health/ready", None)).await;
    assert_eq!(response.status(), StatusCode::OK);
}

// =============================================================================
// Authentication
// =============================================================================

#[tokio::test]
async fn test_sign_in_and_out() {
    let app = TestApp::new();
    app.sign_up("ana").await;

    let response = app
        .send(form_post(
            "/authentication/sign-in",
            None,
            "email=ana%40example.com&password=wrong-password",
        ))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(body_text(response).await.contains("Wrong email or password."));

    let response = app
        .send(form_post(
            "/authentication/sign-in",
            None,
            "email=ana%40example.com&password=password123",
        ))
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let cookie = session_cookie(&response).unwrap();

    let response = app.send(get("/places/my-list", Some(&cookie))).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .send(form_post("/authentication/sign-out", Some(&cookie), ""))
        .await;
    assert_eq!(location(&response), "/");

    let response = app.send(get("/places/my-list", Some(&cookie))).await;
    assert_eq!(location(&response), "/authentication/sign-in");
}

#[tokio::test]
async fn test_duplicate_sign_up_rerenders_form() {
    let app = TestApp::new();
    app.sign_up("ana").await;

    let response = app
        .send(form_post(
            "/authentication/sign-up",
            None,
            "username=other&email=ana%40example.com&password=password123",
        ))
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert!(body_text(response).await.contains("already exists"));
}

#[tokio::test]
async fn test_username_differing_only_in_case_is_taken() {
    let app = TestApp::new();
    app.sign_up("ana").await;

    let response = app
        .send(form_post(
            "/authentication/sign-up",
            None,
            "username=ANA&email=someone%40example.com&password=password123",
        ))
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert!(body_text(response).await.contains("That username is taken."));
}

// =============================================================================
// Places
// =============================================================================

#[tokio::test]
async fn test_create_stores_longitude_first_with_actor_as_creator() {
    let app = TestApp::new();
    let cookie = app.sign_up("ana").await;
    let ana = app.user_id("ana").await;

    let place = app.create_place(&cookie, "Cafe", "40.0", "-3.0").await;

    assert_eq!(place.creator.id, ana);
    assert_eq!(place.location.coordinates(), [-3.0, 40.0]);
    assert_eq!(place.like_count, 0);
    assert!(place.picture_url.is_none());

    let response = app.send(get("/places/my-list", Some(&cookie))).await;
    assert!(body_text(response).await.contains("Cafe"));
}

#[tokio::test]
async fn test_create_rejects_bad_input() {
    let app = TestApp::new();
    let cookie = app.sign_up("ana").await;

    let out_of_range = app
        .send(multipart_post(
            "/places/create",
            &cookie,
            &[
                ("name", "Nowhere"),
                ("description", "Off the map"),
                ("latitude", "91"),
                ("longitude", "0"),
            ],
            None,
        ))
        .await;
    assert_eq!(out_of_range.status(), StatusCode::BAD_REQUEST);

    let not_an_image = app
        .send(multipart_post(
            "/places/create",
            &cookie,
            &[
                ("name", "Script"),
                ("description", "Sneaky"),
                ("latitude", "1"),
                ("longitude", "1"),
            ],
            Some(("text/html", b"<script>".as_slice())),
        ))
        .await;
    assert_eq!(not_an_image.status(), StatusCode::BAD_REQUEST);

    let blank_name = app
        .send(multipart_post(
            "/places/create",
            &cookie,
            &[
                ("name", "  "),
                ("description", "x"),
                ("latitude", "1"),
                ("longitude", "1"),
            ],
            None,
        ))
        .await;
    assert_eq!(blank_name.status(), StatusCode::BAD_REQUEST);

    assert!(app.stores.places.list_all().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_my_list_only_shows_own_places() {
    let app = TestApp::new();
    let ana = app.sign_up("ana").await;
    let bea = app.sign_up("bea").await;

    app.create_place(&ana, "Ana mural", "1", "1").await;
    app.create_place(&bea, "Bea statue", "2", "2").await;

    let body = body_text(app.send(get("/places/my-list", Some(&ana))).await).await;
    assert!(body.contains("Ana mural"));
    assert!(!body.contains("Bea statue"));
}

#[tokio::test]
async fn test_worked_example_like_toggle_and_delete() {
    let app = TestApp::new();
    let u1 = app.sign_up("user1").await;
    let u2 = app.sign_up("user2").await;
    let u2_id = app.user_id("user2").await;

    let p1 = app.create_place(&u1, "Cafe", "40.0", "-3.0").await;

    let map = body_text(app.send(get("/places/map", None)).await).await;
    assert!(map.contains("Cafe"));

    let like_uri = format!("/places/like/{}", p1.id);
    let response = app.send(form_post(&like_uri, Some(&u2), "")).await;
    assert_eq!(location(&response), format!("/places/{}", p1.id));

    let liked = app.place(p1.id).await.unwrap();
    assert_eq!(liked.like_count, 1);
    assert_eq!(liked.liked_by, vec![u2_id]);

    app.send(form_post(&like_uri, Some(&u2), "")).await;
    let unliked = app.place(p1.id).await.unwrap();
    assert_eq!(unliked.like_count, 0);
    assert!(unliked.liked_by.is_empty());

    let response = app
        .send(form_post(&format!("/places/delete/{}", p1.id), Some(&u1), ""))
        .await;
    assert_eq!(location(&response), "/");
    assert!(app.place(p1.id).await.is_none());

    let response = app
        .send(get(&format!("/places/{}", p1.id), Some(&u1)))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_non_owner_cannot_update_or_delete() {
    let app = TestApp::new();
    let owner = app.sign_up("owner").await;
    let other = app.sign_up("other").await;
    let place = app.create_place(&owner, "Fountain", "10", "20").await;

    let response = app
        .send(get(&format!("/places/update/{}", place.id), Some(&other)))
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .send(multipart_post(
            &format!("/places/update/{}", place.id),
            &other,
            &[
                ("name", "Hijacked"),
                ("description", "x"),
                ("latitude", "0"),
                ("longitude", "0"),
            ],
            None,
        ))
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .send(form_post(&format!("/places/delete/{}", place.id), Some(&other), ""))
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/");

    let unchanged = app.place(place.id).await.unwrap();
    assert_eq!(unchanged.name, "Fountain");
}

#[tokio::test]
async fn test_update_keeps_picture_unless_replaced() {
    let app = TestApp::new();
    let cookie = app.sign_up("ana").await;

    let response = app
        .send(multipart_post(
            "/places/create",
            &cookie,
            &[
                ("name", "Gallery"),
                ("description", "Open air"),
                ("latitude", "48.85"),
                ("longitude", "2.35"),
            ],
            Some(("image/png", [137, 80, 78, 71].as_slice())),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let place = app.stores.places.list_all().await.unwrap().remove(0);
    let original = place.picture_url.clone().unwrap();
    assert!(original.starts_with("/uploads/"));

    let response = app.send(get(&original, None)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let update_uri = format!("/places/update/{}", place.id);
    let fields = [
        ("name", "Gallery II"),
        ("description", "Still open air"),
        ("latitude", "48.86"),
        ("longitude", "2.36"),
    ];

    let response = app
        .send(multipart_post(&update_uri, &cookie, &fields, None))
        .await;
    assert_eq!(location(&response), "/places/my-list");
    let kept = app.place(place.id).await.unwrap();
    assert_eq!(kept.name, "Gallery II");
    assert_eq!(kept.picture_url.as_deref(), Some(original.as_str()));
    assert_eq!(kept.location.coordinates(), [2.36, 48.86]);

    app.send(multipart_post(
        &update_uri,
        &cookie,
        &fields,
        Some(("image/jpeg", [255, 216, 255].as_slice())),
    ))
    .await;
    let replaced = app.place(place.id).await.unwrap();
    let replaced_url = replaced.picture_url.unwrap();
    assert_ne!(replaced_url, original);
    assert!(replaced_url.ends_with(".jpg"));
}

#[tokio::test]
async fn test_single_view_shows_owner_controls_only_to_owner() {
    let app = TestApp::new();
    let owner = app.sign_up("owner").await;
    let visitor = app.sign_up("visitor").await;
    let place = app.create_place(&owner, "Bridge", "51.5", "-0.12").await;
    let uri = format!("/places/{}", place.id);
    let edit_link = format!("/places/update/{}", place.id);

    let as_owner = body_text(app.send(get(&uri, Some(&owner))).await).await;
    assert!(as_owner.contains(&edit_link));

    let as_visitor = body_text(app.send(get(&uri, Some(&visitor))).await).await;
    assert!(as_visitor.contains("Bridge"));
    assert!(!as_visitor.contains(&edit_link));
}

#[tokio::test]
async fn test_profile_summarises_shared_places() {
    let app = TestApp::new();
    let ana = app.sign_up("ana").await;
    let bea = app.sign_up("bea").await;
    let mural = app.create_place(&ana, "Mural", "1", "1").await;
    app.create_place(&ana, "Statue", "2", "2").await;
    app.create_place(&bea, "Fountain", "3", "3").await;

    app.send(form_post(&format!("/places/like/{}", mural.id), Some(&bea), ""))
        .await;

    let response = app.send(get("/profile", Some(&ana))).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_text(response).await;
    assert!(body.contains("ana@example.com"));
    assert!(body.contains(r#"data-stat="places">2</dd>"#));
    assert!(body.contains(r#"data-stat="likes">1</dd>"#));
}

#[tokio::test]
async fn test_directions_links_to_route() {
    let app = TestApp::new();
    let cookie = app.sign_up("ana").await;
    let place = app.create_place(&cookie, "Tower", "38.69", "-9.21").await;

    let response = app
        .send(get(&format!("/places/directions/{}", place.id), Some(&cookie)))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("openstreetmap.org/directions"));
}

#[tokio::test]
async fn test_missing_place_and_bad_ids() {
    let app = TestApp::new();
    let cookie = app.sign_up("ana").await;

    let response = app.send(get("/places/999", Some(&cookie))).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body_text(response).await;
    assert!(body.contains("404"));
    assert!(body.contains("Not found: place 999"), "development shows detail");

    let response = app.send(form_post("/places/like/999", Some(&cookie), "")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app.send(get("/places/not-a-number", Some(&cookie))).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_text(response).await;
    assert!(body.contains("400 · Bad Request"), "rendered as the error page");
    assert!(body.contains("Back to the home page"));

    let response = app
        .send(form_post("/comments/delete/x1", Some(&cookie), ""))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_text(response).await.contains("400 · Bad Request"));

    let response = app.send(get("/no/such/page", None)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// =============================================================================
// Comments
// =============================================================================

#[tokio::test]
async fn test_comments_add_and_author_only_delete() {
    let app = TestApp::new();
    let ana = app.sign_up("ana").await;
    let bea = app.sign_up("bea").await;
    let place = app.create_place(&ana, "Arch", "1", "1").await;

    let response = app
        .send(form_post(
            &format!("/comments/{}", place.id),
            Some(&bea),
            "body=Lovely+spot",
        ))
        .await;
    assert_eq!(location(&response), format!("/places/{}", place.id));

    let comments = app.stores.comments.list_for_place(place.id).await.unwrap();
    assert_eq!(comments.len(), 1);
    assert_eq!(comments[0].body, "Lovely spot");
    let comment_id = comments[0].id;

    let page = body_text(app.send(get(&format!("/places/{}", place.id), Some(&ana))).await).await;
    assert!(page.contains("Lovely spot"));

    // Not the author: nothing happens.
    let delete_uri = format!("/comments/delete/{comment_id}");
    let response = app.send(form_post(&delete_uri, Some(&ana), "")).await;
    assert_eq!(location(&response), format!("/places/{}", place.id));
    assert!(app.stores.comments.find(comment_id).await.unwrap().is_some());

    app.send(form_post(&delete_uri, Some(&bea), "")).await;
    assert!(app.stores.comments.find(comment_id).await.unwrap().is_none());

    let response = app
        .send(form_post("/comments/999", Some(&bea), "body=hello"))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .send(form_post(&format!("/comments/{}", place.id), Some(&bea), "body=+++"))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_security_headers_and_request_id() {
    let app = TestApp::new();
    let response = app.send(get("/", None)).await;

    let headers = response.headers();
    assert_eq!(headers.get(header::X_FRAME_OPTIONS).unwrap(), "DENY");
    assert!(headers.contains_key(header::CONTENT_SECURITY_POLICY));
    assert!(headers.contains_key("x-request-id"));
}
