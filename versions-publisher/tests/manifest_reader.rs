//! Manifest reader tests against a mock gateway.
//!
//! The reader must never fail: every broken link in the chain
//! (raw bundle manifest → versions.json id → versions.json content)
//! degrades to an empty manifest with a reason.

use serde_json::json;
use versions_publisher::manifest::reader::{FallbackReason, ManifestFetch, ManifestReader};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn mount_bundle(server: &MockServer, bundle_id: &str, paths: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path(format!("/raw/{}", bundle_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "manifest": "arweave/paths",
            "version": "0.2.0",
            "paths": paths
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_loads_deployed_manifest() {
    let server = MockServer::start().await;
    mount_bundle(
        &server,
        "BUNDLE",
        json!({
            "index.html": { "id": "HTML" },
            "versions.json": { "id": "VERSIONS" }
        }),
    )
    .await;

    Mock::given(method("GET"))
        .and(path("/VERSIONS"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "versions": [
                { "contentId": "TX2", "timestamp": 200 },
                { "contentId": "TX1", "timestamp": 100 }
            ],
            "previousManifestPointer": "BUNDLE_OLD"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let reader = ManifestReader::new(&server.uri());
    let fetch = reader.fetch("BUNDLE").await;

    assert!(fetch.is_loaded());
    let manifest = fetch.into_manifest();
    assert_eq!(manifest.len(), 2);
    assert_eq!(manifest.latest().unwrap().content_id, "TX2");
    assert_eq!(manifest.previous_manifest_pointer.as_deref(), Some("BUNDLE_OLD"));
}

#[tokio::test]
async fn test_missing_bundle_falls_back() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/raw/BUNDLE"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let fetch = ManifestReader::new(&server.uri()).fetch("BUNDLE").await;

    assert_eq!(fetch, ManifestFetch::Fallback(FallbackReason::Status(404)));
    assert!(fetch.into_manifest().is_empty());
}

#[tokio::test]
async fn test_non_json_bundle_manifest_falls_back() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/raw/BUNDLE"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>not a manifest</html>"))
        .mount(&server)
        .await;

    let fetch = ManifestReader::new(&server.uri()).fetch("BUNDLE").await;

    assert!(matches!(fetch, ManifestFetch::Fallback(FallbackReason::InvalidPathManifest(_))));
}

#[tokio::test]
async fn test_bundle_without_versions_file_falls_back() {
    let server = MockServer::start().await;
    mount_bundle(&server, "BUNDLE", json!({ "index.html": { "id": "HTML" } })).await;

    let fetch = ManifestReader::new(&server.uri()).fetch("BUNDLE").await;

    assert_eq!(fetch, ManifestFetch::Fallback(FallbackReason::MissingEntry));
}

#[tokio::test]
async fn test_malformed_versions_falls_back() {
    let server = MockServer::start().await;
    mount_bundle(&server, "BUNDLE", json!({ "versions.json": { "id": "VERSIONS" } })).await;

    Mock::given(method("GET"))
        .and(path("/VERSIONS"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{ \"versions\": [ oops"))
        .mount(&server)
        .await;

    let fetch = ManifestReader::new(&server.uri()).fetch("BUNDLE").await;

    assert!(matches!(fetch, ManifestFetch::Fallback(FallbackReason::InvalidVersions(_))));
    assert!(fetch.into_manifest().is_empty());
}

#[tokio::test]
async fn test_versions_without_list_falls_back() {
    let server = MockServer::start().await;
    mount_bundle(&server, "BUNDLE", json!({ "versions.json": { "id": "VERSIONS" } })).await;

    Mock::given(method("GET"))
        .and(path("/VERSIONS"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "latest": "TX1" })))
        .mount(&server)
        .await;

    let fetch = ManifestReader::new(&server.uri()).fetch("BUNDLE").await;

    assert!(matches!(fetch, ManifestFetch::Fallback(FallbackReason::InvalidVersions(_))));
}

#[tokio::test]
async fn test_versions_file_error_status_falls_back() {
    let server = MockServer::start().await;
    mount_bundle(&server, "BUNDLE", json!({ "versions.json": { "id": "VERSIONS" } })).await;

    Mock::given(method("GET"))
        .and(path("/VERSIONS"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;

    let fetch = ManifestReader::new(&server.uri()).fetch("BUNDLE").await;

    assert_eq!(fetch, ManifestFetch::Fallback(FallbackReason::Status(502)));
}
