//! Integration tests for GeoArt.
//!
//! The tests under `tests/` drive a running `geoart-web` server over HTTP and
//! are ignored by default.
//!
//! # Running Tests
//!
//! ```bash
//! cargo run -p geoart-cli -- migrate all
//! cargo run -p geoart-web &
//! cargo test -p geoart-integration-tests -- --ignored
//! ```
//!
//! `GEOART_BASE_URL` overrides the default `http://localhost:3000`.

use reqwest::{Client, Response, StatusCode, header::LOCATION, redirect::Policy};

/// Base URL of the server under test.
#[must_use]
pub fn base_url() -> String {
    std::env::var("GEOART_BASE_URL").unwrap_or_else(|_| "http://localhost:3000".to_string())
}

/// A browser-like client: keeps cookies and does not follow redirects.
///
/// # Panics
///
/// Panics if the HTTP client cannot be built.
#[must_use]
pub fn client() -> Client {
    Client::builder()
        .cookie_store(true)
        .redirect(Policy::none())
        .build()
        .expect("Failed to create HTTP client")
}

/// A user created for one test run.
pub struct TestUser {
    pub client: Client,
    pub username: String,
    pub email: String,
}

impl TestUser {
    /// Sign up a fresh user and keep its session cookie.
    ///
    /// # Panics
    ///
    /// Panics if sign-up does not redirect.
    pub async fn sign_up() -> Self {
        let client = client();
        let tag = uuid::Uuid::new_v4().simple().to_string();
        let username: String = format!("it{tag}").chars().take(14).collect();
        let email = format!("{username}@example.com");

        let resp = client
            .post(format!("{}/authentication/sign-up", base_url()))
            .form(&[
                ("username", username.as_str()),
                ("email", email.as_str()),
                ("password", "correct horse battery"),
            ])
            .send()
            .await
            .expect("Failed to sign up");
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);

        Self {
            client,
            username,
            email,
        }
    }

    /// GET a path on the server under test.
    ///
    /// # Panics
    ///
    /// Panics if the request fails.
    pub async fn get(&self, path: &str) -> Response {
        self.client
            .get(format!("{}{path}", base_url()))
            .send()
            .await
            .expect("GET failed")
    }

    /// POST an urlencoded form.
    ///
    /// # Panics
    ///
    /// Panics if the request fails.
    pub async fn post_form(&self, path: &str, fields: &[(&str, &str)]) -> Response {
        self.client
            .post(format!("{}{path}", base_url()))
            .form(fields)
            .send()
            .await
            .expect("POST failed")
    }

    /// Create a place without a picture and return its id.
    ///
    /// # Panics
    ///
    /// Panics if creation fails or the place does not show up in the owner's list.
    pub async fn create_place(&self, name: &str, latitude: f64, longitude: f64) -> i64 {
        let form = reqwest::multipart::Form::new()
            .text("name", name.to_owned())
            .text("description", "Created by the integration tests")
            .text("latitude", latitude.to_string())
            .text("longitude", longitude.to_string());

        let resp = self
            .client
            .post(format!("{}/places/create", base_url()))
            .multipart(form)
            .send()
            .await
            .expect("Failed to create place");
        assert_eq!(location(&resp).as_deref(), Some("/places/my-list"));

        let body = self
            .get("/places/my-list")
            .await
            .text()
            .await
            .expect("Failed to read my-list");
        place_ids(&body)
            .into_iter()
            .max()
            .expect("New place missing from my-list")
    }
}

/// The `Location` header of a redirect, if any.
#[must_use]
pub fn location(resp: &Response) -> Option<String> {
    resp.headers()
        .get(LOCATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned)
}

/// Place ids linked from a page (`href="/places/{id}"`).
#[must_use]
pub fn place_ids(html: &str) -> Vec<i64> {
    html.split("href=\"/places/")
        .skip(1)
        .filter_map(|rest| rest.split('"').next())
        .filter_map(|id| id.parse().ok())
        .collect()
}
