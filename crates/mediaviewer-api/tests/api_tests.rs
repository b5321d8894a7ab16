mod common;

use axum::http::StatusCode;
use serde_json::json;

use common::{TestApp, http_discovery, spawn_well_known, static_overrides};
use mediaviewer_api::homeserver::ResolverConfig;
use mediaviewer_crypto::{encoding, signature};
use mediaviewer_db::shortcut_id::is_valid_shortcut;

const KEY: [u8; 32] = [42; 32];
const SHA256: &str = "q83vEjRWeJA";
const IV: &str = "AAECAwQFBgcICQoLDA0ODw";

fn example_org_app() -> TestApp {
    TestApp::new(ResolverConfig {
        overrides: static_overrides(&[("example.org", "https://matrix.example.org")]),
        ..Default::default()
    })
}

fn reference_body(url: &str) -> String {
    json!({
        "url": url,
        "sha256": SHA256,
        "iv": IV,
        "key": encoding::encode_url(&KEY),
        "info": { "mimetype": "image/png", "size": 1234 },
    })
    .to_string()
}

fn derived_key_header() -> String {
    format!(
        "X-Derived-Key {}",
        encoding::encode(&signature::key_sha256(&KEY))
    )
}

async fn create(app: &TestApp, body: &str) -> String {
    let (status, json) = app.post_json("/create", body).await;
    assert_eq!(status, StatusCode::OK, "{json}");
    json["file_id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn create_then_fetch_reference() {
    let app = example_org_app();
    let file_id = create(&app, &reference_body("mxc://example.org/abc123")).await;
    assert_eq!(file_id.len(), 11);
    assert!(is_valid_shortcut(&file_id));

    let (status, view) = app
        .get_json(
            &format!("/{file_id}/metadata.json"),
            Some(&derived_key_header()),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let view = view.as_object().unwrap();
    assert_eq!(view.len(), 2);
    assert_eq!(view["homeserver_url"], "https://matrix.example.org");
    assert!(!view.contains_key("key_sha256"));
    assert!(!view.contains_key("auth_token"));
    assert!(!view.contains_key("homeserver"));

    let blob = encoding::decode(view["ciphertext"].as_str().unwrap()).unwrap();
    let reference: serde_json::Value = serde_json::from_slice(&blob).unwrap();
    let reference = reference.as_object().unwrap();
    assert_eq!(reference["url"], "mxc://example.org/abc123");
    assert_eq!(reference["homeserver_url"], "https://matrix.example.org");
    assert_eq!(reference["info"]["mimetype"], "image/png");
    assert!(!reference.contains_key("key"));
    assert!(!reference.contains_key("key_sha256"));

    let expected = signature::derive(&KEY, "mxc://example.org/abc123", SHA256, IV);
    assert_eq!(reference["signature"], encoding::encode(&expected.signature));
}

#[tokio::test]
async fn wrong_derived_key_is_unauthorized() {
    let app = example_org_app();
    let file_id = create(&app, &reference_body("mxc://example.org/abc123")).await;

    let (status, body) = app
        .get_json(
            &format!("/{file_id}/metadata.json"),
            Some("X-Derived-Key AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA"),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Incorrect authentication key");

    let (status, _) = app
        .get_json(&format!("/{file_id}/metadata.json"), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn unknown_shortcut_is_not_found() {
    let app = example_org_app();
    let (status, body) = app
        .get_json("/AAAAAAAAAAA/metadata.json", Some(&derived_key_header()))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "File not found");
}

#[tokio::test]
async fn create_then_fetch_auth_bundle() {
    let app = example_org_app();
    let body = json!({
        "ciphertext": "Y2lwaGVydGV4dA",
        "auth_token": "dG9rZW4",
        "homeserver": "example.org",
    })
    .to_string();
    let file_id = create(&app, &body).await;

    let (status, view) = app
        .get_json(
            &format!("/{file_id}/metadata.json"),
            Some("X-Derived-Key dG9rZW4"),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        view,
        json!({
            "ciphertext": "Y2lwaGVydGV4dA",
            "homeserver_url": "https://matrix.example.org",
        })
    );

    // The prefix is optional.
    let (status, _) = app
        .get_json(&format!("/{file_id}/metadata.json"), Some("dG9rZW4"))
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn carried_homeserver_url_is_kept() {
    let app = TestApp::new(http_discovery());
    let body = json!({
        "ciphertext": "Y2lwaGVydGV4dA",
        "auth_token": "dG9rZW4",
        "homeserver_url": "https://already.example",
    })
    .to_string();
    let file_id = create(&app, &body).await;

    let (_, view) = app
        .get_json(&format!("/{file_id}/metadata.json"), Some("dG9rZW4"))
        .await;
    assert_eq!(view["homeserver_url"], "https://already.example");
}

#[tokio::test]
async fn consecutive_creates_get_distinct_ids() {
    let app = example_org_app();
    let a = create(&app, &reference_body("mxc://example.org/one")).await;
    let b = create(&app, &reference_body("mxc://example.org/two")).await;
    assert_ne!(a, b);
}

#[tokio::test]
async fn malformed_json_is_bad_request() {
    let app = example_org_app();
    let (status, body) = app.post_json("/create", "{not json").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Failed to decode request JSON");

    let (status, body) = app.post_json("/create", r#"{"hello": "world"}"#).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Failed to decode request JSON");
}

#[tokio::test]
async fn invalid_metadata_is_bad_request() {
    let app = example_org_app();

    let (status, body) = app
        .post_json("/create", &reference_body("https://example.org/abc123"))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["message"],
        "Failed to decode metadata: invalid Matrix content URI"
    );

    let (status, body) = app
        .post_json("/create", &reference_body("mxc://bad host/abc123"))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["message"],
        "Failed to decode metadata: invalid Matrix server name"
    );

    let no_key = json!({ "url": "mxc://example.org/abc123", "sha256": SHA256, "iv": IV }).to_string();
    let (status, body) = app.post_json("/create", &no_key).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["message"],
        "Failed to decode metadata: missing key or key_sha256"
    );

    let bad_iv = json!({
        "url": "mxc://example.org/abc123",
        "sha256": SHA256,
        "iv": "***",
        "key": encoding::encode_url(&KEY),
    })
    .to_string();
    let (status, body) = app.post_json("/create", &bad_iv).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(
        body["message"]
            .as_str()
            .unwrap()
            .starts_with("Failed to decode metadata: invalid base64 in iv field")
    );
}

#[tokio::test]
async fn failed_discovery_is_server_error() {
    let server = spawn_well_known(StatusCode::INTERNAL_SERVER_ERROR, "oops").await;
    let app = TestApp::new(http_discovery());

    let (status, body) = app
        .post_json(
            "/create",
            &reference_body(&format!("mxc://{}/abc123", server.domain)),
        )
        .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["message"], "Failed to resolve homeserver URL");
    assert_eq!(server.hits(), 1);
    assert!(app.state.resolver.cache().entry(&server.domain).is_none());
}

#[tokio::test]
async fn discovered_homeserver_is_stored() {
    let server = spawn_well_known(
        StatusCode::OK,
        r#"{"m.homeserver": {"base_url": "https://matrix.discovered.example"}}"#,
    )
    .await;
    let app = TestApp::new(http_discovery());

    let file_id = create(
        &app,
        &reference_body(&format!("mxc://{}/abc123", server.domain)),
    )
    .await;
    create(
        &app,
        &reference_body(&format!("mxc://{}/def456", server.domain)),
    )
    .await;
    assert_eq!(server.hits(), 1);

    let (status, view) = app
        .get_json(
            &format!("/{file_id}/metadata.json"),
            Some(&derived_key_header()),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["homeserver_url"], "https://matrix.discovered.example");
}

#[tokio::test]
async fn viewer_page_and_assets_are_served() {
    let app = example_org_app();

    let (status, body) = app.get("/AbCdEfGhIjK", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"<html>viewer</html>");

    let (status, body) = app.get("/index.js", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"console.log('viewer')");

    let (status, _) = app.get("/missing.css", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = app.get("/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"ok");
}

#[tokio::test]
async fn get_on_create_falls_through_to_static_files() {
    let app = example_org_app();

    let (status, _) = app.get("/create", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
