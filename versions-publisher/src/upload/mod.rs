//! Bundle upload.

pub mod http;

use crate::credentials::DeployKey;
use crate::utils::errors::Result;
use async_trait::async_trait;
use std::path::Path;

pub use http::HttpBundleUploader;

/// Uploads a staged directory as a single addressable bundle.
#[async_trait]
pub trait BundleUploader: Send + Sync {
    /// Upload every file in `dir` on behalf of `key` and return the bundle's
    /// content identifier, or `None` when the uploader produced no identifier.
    async fn upload_bundle(&self, dir: &Path, key: &DeployKey) -> Result<Option<String>>;
}
