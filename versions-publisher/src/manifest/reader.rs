//! Best-effort retrieval of the currently deployed `versions.json`.
//!
//! Any failure along the way yields [`ManifestFetch::Fallback`] with the
//! reason; the caller continues with an empty manifest.

use super::paths::PathManifest;
use super::{VersionManifest, VERSIONS_FILE};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Why the remote manifest could not be used.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FallbackReason {
    #[error("gateway unreachable: {0}")]
    Unreachable(String),

    #[error("gateway returned HTTP {0}")]
    Status(u16),

    #[error("invalid bundle manifest: {0}")]
    InvalidPathManifest(String),

    #[error("bundle has no versions.json entry")]
    MissingEntry,

    #[error("invalid versions.json: {0}")]
    InvalidVersions(String),
}

/// Outcome of a single fetch attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum ManifestFetch {
    Loaded(VersionManifest),
    Fallback(FallbackReason),
}

impl ManifestFetch {
    pub fn is_loaded(&self) -> bool {
        matches!(self, ManifestFetch::Loaded(_))
    }

    /// The fetched manifest, or the empty manifest for any fallback.
    pub fn into_manifest(self) -> VersionManifest {
        match self {
            ManifestFetch::Loaded(manifest) => manifest,
            ManifestFetch::Fallback(_) => VersionManifest::empty(),
        }
    }
}

/// Normalise a gateway setting to a base URL without a trailing slash.
///
/// A bare host name is addressed over HTTPS.
pub fn gateway_base_url(gateway: &str) -> String {
    let gateway = gateway.trim().trim_end_matches('/');
    if gateway.contains("://") {
        gateway.to_string()
    } else {
        format!("https://{}", gateway)
    }
}

/// Reads manifests through a gateway.
#[derive(Debug, Clone)]
pub struct ManifestReader {
    client: reqwest::Client,
    base_url: String,
}

impl ManifestReader {
    pub fn new(gateway: &str) -> Self {
        Self::with_client(reqwest::Client::new(), gateway)
    }

    pub fn with_client(client: reqwest::Client, gateway: &str) -> Self {
        Self {
            client,
            base_url: gateway_base_url(gateway),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetch the manifest deployed in `bundle_id`. Never fails.
    pub async fn fetch(&self, bundle_id: &str) -> ManifestFetch {
        let raw_url = format!("{}/raw/{}", self.base_url, bundle_id);

        match self.try_fetch(&raw_url).await {
            Ok(manifest) => {
                info!("Fetched {}: {} versions", VERSIONS_FILE, manifest.len());
                ManifestFetch::Loaded(manifest)
            }
            Err(reason) => {
                warn!(
                    "Unable to fetch {} from {} ({}). Creating new {}.",
                    VERSIONS_FILE, raw_url, reason, VERSIONS_FILE
                );
                ManifestFetch::Fallback(reason)
            }
        }
    }

    async fn try_fetch(&self, raw_url: &str) -> Result<VersionManifest, FallbackReason> {
        let response = self
            .client
            .get(raw_url)
            .send()
            .await
            .map_err(|e| FallbackReason::Unreachable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(FallbackReason::Status(response.status().as_u16()));
        }

        let paths: PathManifest = response
            .json()
            .await
            .map_err(|e| FallbackReason::InvalidPathManifest(e.to_string()))?;

        let file_id = paths.id_for(VERSIONS_FILE).ok_or(FallbackReason::MissingEntry)?;
        debug!("{} is stored as {}", VERSIONS_FILE, file_id);

        let response = self
            .client
            .get(format!("{}/{}", self.base_url, file_id))
            .send()
            .await
            .map_err(|e| FallbackReason::Unreachable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(FallbackReason::Status(response.status().as_u16()));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| FallbackReason::Unreachable(e.to_string()))?;

        serde_json::from_slice(&body).map_err(|e| FallbackReason::InvalidVersions(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gateway_base_url() {
        assert_eq!(gateway_base_url("arweave.net"), "https://arweave.net");
        assert_eq!(gateway_base_url("arweave.net/"), "https://arweave.net");
        assert_eq!(gateway_base_url("http://127.0.0.1:1984"), "http://127.0.0.1:1984");
        assert_eq!(gateway_base_url(" https://g8way.io/ "), "https://g8way.io");
    }

    #[test]
    fn test_fallback_yields_empty_manifest() {
        let fetch = ManifestFetch::Fallback(FallbackReason::MissingEntry);
        assert!(!fetch.is_loaded());
        assert!(fetch.into_manifest().is_empty());
    }

    #[tokio::test]
    async fn test_unreachable_gateway_falls_back() {
        // Port 9 (discard) is never served in the test environment.
        let reader = ManifestReader::new("http://127.0.0.1:9");

        let fetch = reader.fetch("BUNDLE").await;

        assert!(matches!(fetch, ManifestFetch::Fallback(FallbackReason::Unreachable(_))));
    }
}
