//! Contract tests for the HTTP record resolver and bundle uploader.

use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine;
use serde_json::json;
use std::fs;
use tempfile::TempDir;
use versions_publisher::manifest::paths::{PathManifest, PATH_MANIFEST_CONTENT_TYPE};
use versions_publisher::records::{HttpRecordResolver, Record, RecordResolver, RECORD_TTL_SECONDS};
use versions_publisher::upload::{BundleUploader, HttpBundleUploader};
use versions_publisher::{DeployKey, PublishError};
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ────────────────────────────────────────────────────────────────────────────
// Record resolver
// ────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_get_record() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/PROC/records/@"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "transactionId": "TX1",
            "ttlSeconds": 900
        })))
        .mount(&server)
        .await;

    let resolver = HttpRecordResolver::new(&server.uri(), "PROC");
    let record = resolver.get_record("@").await.unwrap();

    assert_eq!(
        record,
        Some(Record {
            transaction_id: "TX1".to_string(),
            ttl_seconds: Some(900),
        })
    );
}

#[tokio::test]
async fn test_get_missing_record() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/PROC/records/docs"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let resolver = HttpRecordResolver::new(&server.uri(), "PROC");
    assert_eq!(resolver.get_record("docs").await.unwrap(), None);
}

#[tokio::test]
async fn test_get_record_server_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/PROC/records/@"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let resolver = HttpRecordResolver::new(&server.uri(), "PROC");
    let result = resolver.get_record("@").await;

    match result {
        Err(PublishError::Resolver(message)) => assert!(message.contains("boom")),
        other => panic!("expected resolver error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_get_records() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/PROC/records"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "@": { "transactionId": "BUNDLE" },
            "docs": { "transactionId": "DOCS", "ttlSeconds": 3600 }
        })))
        .mount(&server)
        .await;

    let resolver = HttpRecordResolver::new(&server.uri(), "PROC");
    let records = resolver.get_records().await.unwrap();

    assert_eq!(records.len(), 2);
    assert_eq!(records["@"].transaction_id, "BUNDLE");
    assert_eq!(records["docs"].ttl_seconds, Some(3600));
}

#[tokio::test]
async fn test_set_record_request_shape() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/PROC/records"))
        .and(header("x-deploy-owner", "OWNER"))
        .and(header("authorization", "Bearer secret-token"))
        .and(body_json(json!({
            "undername": "@",
            "transactionId": "NEW_BUNDLE",
            "ttlSeconds": 3600
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true })))
        .expect(1)
        .mount(&server)
        .await;

    let resolver = HttpRecordResolver::new(&server.uri(), "PROC")
        .with_owner("OWNER")
        .with_api_token(Some("secret-token".to_string()));

    resolver
        .set_record("@", "NEW_BUNDLE", RECORD_TTL_SECONDS)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_set_record_rejected() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/PROC/records"))
        .respond_with(ResponseTemplate::new(403).set_body_string("not the owner"))
        .mount(&server)
        .await;

    let resolver = HttpRecordResolver::new(&server.uri(), "PROC");
    let result = resolver.set_record("@", "NEW_BUNDLE", RECORD_TTL_SECONDS).await;

    assert!(matches!(result, Err(PublishError::Resolver(_))));
}

// ────────────────────────────────────────────────────────────────────────────
// Bundle uploader
// ────────────────────────────────────────────────────────────────────────────

fn deploy_key() -> DeployKey {
    let jwk = json!({ "kty": "RSA", "n": URL_SAFE_NO_PAD.encode(b"uploader-modulus"), "e": "AQAB" });
    DeployKey::from_base64(&STANDARD.encode(serde_json::to_vec(&jwk).unwrap())).unwrap()
}

fn staged_site() -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::create_dir_all(dir.path().join("assets")).unwrap();
    fs::write(dir.path().join("index.html"), "<html></html>").unwrap();
    fs::write(dir.path().join("assets/app.js"), "console.log(1)").unwrap();
    fs::write(dir.path().join("versions.json"), "{\"versions\":[]}").unwrap();
    dir
}

async fn mount_file(server: &MockServer, relative_path: &str, content_type: &str, id: &str) {
    Mock::given(method("POST"))
        .and(path("/tx"))
        .and(header("x-relative-path", relative_path))
        .and(header("content-type", content_type))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": id })))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_upload_bundle_builds_path_manifest() {
    let server = MockServer::start().await;
    let site = staged_site();
    let key = deploy_key();

    mount_file(&server, "index.html", "text/html", "ID_INDEX").await;
    mount_file(&server, "assets/app.js", "application/javascript", "ID_APP").await;
    mount_file(&server, "versions.json", "application/json", "ID_VERSIONS").await;

    Mock::given(method("POST"))
        .and(path("/tx"))
        .and(header("content-type", PATH_MANIFEST_CONTENT_TYPE))
        .and(header("x-deploy-owner", key.address()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "BUNDLE" })))
        .expect(1)
        .mount(&server)
        .await;

    let uploader = HttpBundleUploader::new(&server.uri());
    let bundle_id = uploader.upload_bundle(site.path(), &key).await.unwrap();

    assert_eq!(bundle_id.as_deref(), Some("BUNDLE"));

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 4);
    assert!(requests
        .iter()
        .all(|r| r.headers.get("x-deploy-owner").is_some_and(|v| v.as_bytes() == key.address().as_bytes())));
    let manifest_request = requests
        .iter()
        .find(|r| {
            r.headers
                .get("content-type")
                .is_some_and(|v| v.as_bytes() == PATH_MANIFEST_CONTENT_TYPE.as_bytes())
        })
        .unwrap();
    let manifest: PathManifest = serde_json::from_slice(&manifest_request.body).unwrap();

    assert_eq!(manifest.index.as_ref().map(|i| i.path.as_str()), Some("index.html"));
    assert_eq!(manifest.id_for("index.html"), Some("ID_INDEX"));
    assert_eq!(manifest.id_for("assets/app.js"), Some("ID_APP"));
    assert_eq!(manifest.id_for("versions.json"), Some("ID_VERSIONS"));
}

#[tokio::test]
async fn test_upload_failure_is_an_error() {
    let server = MockServer::start().await;
    let site = staged_site();

    Mock::given(method("POST"))
        .and(path("/tx"))
        .respond_with(ResponseTemplate::new(402).set_body_string("insufficient balance"))
        .mount(&server)
        .await;

    let uploader = HttpBundleUploader::new(&server.uri());
    let result = uploader.upload_bundle(site.path(), &deploy_key()).await;

    assert!(matches!(result, Err(PublishError::UploadFailed(_))));
}

#[tokio::test]
async fn test_manifest_without_id_yields_none() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("versions.json"), "{\"versions\":[]}").unwrap();

    mount_file(&server, "versions.json", "application/json", "ID_VERSIONS").await;

    Mock::given(method("POST"))
        .and(path("/tx"))
        .and(header("content-type", PATH_MANIFEST_CONTENT_TYPE))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;

    let uploader = HttpBundleUploader::new(&server.uri());
    let bundle_id = uploader.upload_bundle(dir.path(), &deploy_key()).await.unwrap();

    assert_eq!(bundle_id, None);
}

#[tokio::test]
async fn test_empty_directory_yields_none() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    let uploader = HttpBundleUploader::new(&server.uri());
    let bundle_id = uploader.upload_bundle(dir.path(), &deploy_key()).await.unwrap();

    assert_eq!(bundle_id, None);
    assert!(server.received_requests().await.unwrap().is_empty());
}
