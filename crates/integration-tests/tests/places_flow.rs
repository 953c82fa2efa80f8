//! End-to-end place flows against a running server.
//!
//! These tests require:
//! - A migrated `PostgreSQL` database (cargo run -p geoart-cli -- migrate all)
//! - The web server running (cargo run -p geoart-web)
//!
//! Run with: cargo test -p geoart-integration-tests -- --ignored

use geoart_integration_tests::{TestUser, base_url, client, location, place_ids};
use reqwest::StatusCode;

// ============================================================================
// Public Pages
// ============================================================================

#[tokio::test]
#[ignore = "Requires running GeoArt server"]
async fn test_health_endpoints() {
    let client = client();

    let resp = client
        .get(format!("{}/health", base_url()))
        .send()
        .await
        .expect("Failed to call /health");
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = client
        .get(format!("{}/health/ready", base_url()))
        .send()
        .await
        .expect("Failed to call /health/ready");
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
#[ignore = "Requires running GeoArt server"]
async fn test_guarded_pages_redirect_anonymous_visitors() {
    let client = client();

    for path in ["/places/my-list", "/places/create"] {
        let resp = client
            .get(format!("{}{path}", base_url()))
            .send()
            .await
            .expect("Request failed");
        assert_eq!(resp.status(), StatusCode::SEE_OTHER, "{path}");
        assert_eq!(
            location(&resp).as_deref(),
            Some("/authentication/sign-in"),
            "{path}"
        );
    }
}

// ============================================================================
// Ownership
// ============================================================================

#[tokio::test]
#[ignore = "Requires running GeoArt server"]
async fn test_owner_can_update_and_delete() {
    let owner = TestUser::sign_up().await;
    let id = owner.create_place("Integration Fountain", 48.85, 2.35).await;

    let page = owner.get(&format!("/places/{id}")).await;
    assert_eq!(page.status(), StatusCode::OK);
    let body = page.text().await.expect("Failed to read body");
    assert!(body.contains("Integration Fountain"));
    assert!(body.contains(&owner.username));

    let resp = owner
        .post_form(&format!("/places/delete/{id}"), &[])
        .await;
    assert_eq!(location(&resp).as_deref(), Some("/"));

    let gone = owner.get(&format!("/places/{id}")).await;
    assert_eq!(gone.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
#[ignore = "Requires running GeoArt server"]
async fn test_other_users_cannot_touch_a_place() {
    let owner = TestUser::sign_up().await;
    let intruder = TestUser::sign_up().await;
    let id = owner.create_place("Guarded Statue", 10.0, 20.0).await;

    let edit = intruder.get(&format!("/places/update/{id}")).await;
    assert_eq!(edit.status(), StatusCode::FORBIDDEN);

    intruder
        .post_form(&format!("/places/delete/{id}"), &[])
        .await;
    let still_there = owner.get(&format!("/places/{id}")).await;
    assert_eq!(still_there.status(), StatusCode::OK);

    let intruder_list = intruder
        .get("/places/my-list")
        .await
        .text()
        .await
        .expect("Failed to read my-list");
    assert!(!place_ids(&intruder_list).contains(&id));
}

// ============================================================================
// Likes and Comments
// ============================================================================

#[tokio::test]
#[ignore = "Requires running GeoArt server"]
async fn test_like_toggles_and_comment_appears() {
    let owner = TestUser::sign_up().await;
    let fan = TestUser::sign_up().await;
    let id = owner.create_place("Mural", -33.86, 151.21).await;

    let resp = fan.post_form(&format!("/places/like/{id}"), &[]).await;
    assert_eq!(location(&resp), Some(format!("/places/{id}")));
    let body = fan
        .get(&format!("/places/{id}"))
        .await
        .text()
        .await
        .expect("Failed to read place");
    assert!(body.contains("Unlike · 1"));

    fan.post_form(&format!("/places/like/{id}"), &[]).await;
    let body = fan
        .get(&format!("/places/{id}"))
        .await
        .text()
        .await
        .expect("Failed to read place");
    assert!(body.contains("Like · 0"));

    let resp = fan
        .post_form(&format!("/comments/{id}"), &[("body", "Lovely colours")])
        .await;
    assert_eq!(location(&resp), Some(format!("/places/{id}")));
    let body = owner
        .get(&format!("/places/{id}"))
        .await
        .text()
        .await
        .expect("Failed to read place");
    assert!(body.contains("Lovely colours"));
    assert!(body.contains(&fan.username));
}

// ============================================================================
// Sessions
// ============================================================================

#[tokio::test]
#[ignore = "Requires running GeoArt server"]
async fn test_sign_out_then_sign_in_again() {
    let user = TestUser::sign_up().await;

    user.post_form("/authentication/sign-out", &[]).await;
    let resp = user.get("/places/my-list").await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);

    let resp = user
        .post_form(
            "/authentication/sign-in",
            &[
                ("email", user.email.as_str()),
                ("password", "correct horse battery"),
            ],
        )
        .await;
    assert_eq!(location(&resp).as_deref(), Some("/places/my-list"));

    let resp = user.get("/places/my-list").await;
    assert_eq!(resp.status(), StatusCode::OK);
}
