//! Uploader backed by an HTTP upload service.
//!
//! Every file is posted to `{endpoint}/tx` and answered with `{ "id": ... }`.
//! A path manifest listing those ids is uploaded last; its id identifies the
//! bundle. Signing happens on the service side; requests name the key's
//! owner address.

use super::BundleUploader;
use crate::credentials::DeployKey;
use crate::fs::walker::{total_size, walk_directory, FileInfo, WalkOptions};
use crate::manifest::paths::{PathManifest, PATH_MANIFEST_CONTENT_TYPE};
use crate::records::http::OWNER_HEADER;
use crate::utils::errors::{PublishError, Result};
use async_trait::async_trait;
use bytes::Bytes;
use serde::Deserialize;
use std::path::Path;
use tracing::{error, info, warn};

/// Served when the bundle root is requested.
pub const INDEX_FILE: &str = "index.html";

#[derive(Debug, Clone)]
pub struct HttpBundleUploader {
    client: reqwest::Client,
    endpoint: String,
    api_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    #[serde(default)]
    id: Option<String>,
}

impl HttpBundleUploader {
    pub fn new(endpoint: &str) -> Self {
        Self::with_client(reqwest::Client::new(), endpoint)
    }

    pub fn with_client(client: reqwest::Client, endpoint: &str) -> Self {
        Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_token: None,
        }
    }

    pub fn with_api_token(mut self, token: Option<String>) -> Self {
        self.api_token = token.filter(|t| !t.is_empty());
        self
    }

    /// Post one payload, returning the id the service assigned to it.
    async fn post(&self, key: &DeployKey, label: &str, content_type: &str, body: Bytes) -> Result<Option<String>> {
        let url = format!("{}/tx", self.endpoint);
        let size = body.len();

        let mut request = self
            .client
            .post(&url)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .header("x-relative-path", label)
            .header("x-total-size", size.to_string())
            .header(OWNER_HEADER, key.address())
            .body(body);

        if let Some(token) = &self.api_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            error!("Upload failed with status {}: {}. Error: {}", status, label, error_text);
            return Err(PublishError::UploadFailed(format!("{}: {} - {}", label, status, error_text)));
        }

        let uploaded: UploadResponse = response.json().await?;
        Ok(uploaded.id.filter(|id| !id.is_empty()))
    }

    async fn upload_file(&self, key: &DeployKey, file_info: &FileInfo) -> Result<String> {
        let label = file_info.manifest_path();
        let data = tokio::fs::read(&file_info.path).await?;

        let id = self
            .post(key, &label, content_type(&file_info.path), Bytes::from(data))
            .await?
            .ok_or_else(|| PublishError::UploadFailed(format!("{}: no id returned", label)))?;

        info!("Uploaded {} bytes: {} -> {}", file_info.size, label, id);
        Ok(id)
    }
}

#[async_trait]
impl BundleUploader for HttpBundleUploader {
    async fn upload_bundle(&self, dir: &Path, key: &DeployKey) -> Result<Option<String>> {
        let root = dir.to_path_buf();
        let files = tokio::task::spawn_blocking(move || {
            let options = WalkOptions {
                follow_links: true,
                ..WalkOptions::default()
            };
            walk_directory(&root, &options)
        })
        .await
        .map_err(|e| PublishError::UploadFailed(format!("directory scan aborted: {}", e)))??;

        if files.is_empty() {
            warn!("Nothing to upload in {}", dir.display());
            return Ok(None);
        }

        info!(
            "Uploading {} files ({} bytes) from {} as {}",
            files.len(),
            total_size(&files),
            dir.display(),
            key.address()
        );

        let mut manifest = PathManifest::new();
        for file_info in &files {
            let id = self.upload_file(key, file_info).await?;
            manifest.insert(file_info.manifest_path(), id);
        }

        if manifest.paths.contains_key(INDEX_FILE) {
            manifest.set_index(INDEX_FILE);
        }

        let body = serde_json::to_vec(&manifest)?;
        let manifest_id = self
            .post(key, "manifest", PATH_MANIFEST_CONTENT_TYPE, Bytes::from(body))
            .await?;

        match &manifest_id {
            Some(id) => info!("Uploaded bundle manifest {} ({} paths)", id, manifest.paths.len()),
            None => warn!("Upload service returned no id for the bundle manifest"),
        }

        Ok(manifest_id)
    }
}

/// Content type by file extension.
pub fn content_type(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    match extension.as_str() {
        "html" | "htm" => "text/html",
        "css" => "text/css",
        "js" | "mjs" => "application/javascript",
        "json" => "application/json",
        "txt" => "text/plain",
        "svg" => "image/svg+xml",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "ico" => "image/x-icon",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "wasm" => "application/wasm",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_type() {
        assert_eq!(content_type(Path::new("index.html")), "text/html");
        assert_eq!(content_type(Path::new("versions.json")), "application/json");
        assert_eq!(content_type(Path::new("assets/LOGO.PNG")), "image/png");
        assert_eq!(content_type(Path::new("LICENSE")), "application/octet-stream");
    }
}
