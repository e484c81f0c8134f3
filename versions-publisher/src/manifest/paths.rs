//! Path manifest describing a deployed bundle.
//!
//! The gateway serves it at `/raw/{bundle_id}`; the uploader produces one for
//! every staged directory it deploys.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const PATH_MANIFEST_KIND: &str = "arweave/paths";
pub const PATH_MANIFEST_VERSION: &str = "0.2.0";
pub const PATH_MANIFEST_CONTENT_TYPE: &str = "application/x.arweave-manifest+json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathManifest {
    #[serde(default = "default_kind")]
    pub manifest: String,

    #[serde(default = "default_version")]
    pub version: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<PathIndex>,

    /// Logical file path → uploaded content.
    pub paths: BTreeMap<String, PathEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathIndex {
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathEntry {
    pub id: String,
}

fn default_kind() -> String {
    PATH_MANIFEST_KIND.to_string()
}

fn default_version() -> String {
    PATH_MANIFEST_VERSION.to_string()
}

impl Default for PathManifest {
    fn default() -> Self {
        Self {
            manifest: default_kind(),
            version: default_version(),
            index: None,
            paths: BTreeMap::new(),
        }
    }
}

impl PathManifest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl Into<String>, id: impl Into<String>) {
        self.paths.insert(path.into(), PathEntry { id: id.into() });
    }

    pub fn set_index(&mut self, path: impl Into<String>) {
        self.index = Some(PathIndex { path: path.into() });
    }

    /// Content identifier recorded for `path`.
    pub fn id_for(&self, path: &str) -> Option<&str> {
        self.paths
            .get(path)
            .map(|entry| entry.id.as_str())
            .filter(|id| !id.is_empty())
    }
}
