//! Version manifest types.
//!
//! A version manifest is serialized as `versions.json` at the root of every
//! deployed versions site. Entries are newest-first, and each manifest points
//! back at the bundle that was live before it was published.

pub mod merge;
pub mod paths;
pub mod reader;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// File name of the manifest inside a staged or deployed bundle.
pub const VERSIONS_FILE: &str = "versions.json";

/// Key holding an entry's content identifier.
pub const CONTENT_ID_KEY: &str = "contentId";

/// Older name of [`CONTENT_ID_KEY`], still found in deployed histories.
pub const LEGACY_CONTENT_ID_KEY: &str = "txId";

/// Key holding an entry's publish time in milliseconds since epoch.
pub const TIMESTAMP_KEY: &str = "timestamp";

const VERSIONS_KEY: &str = "versions";
const PREVIOUS_POINTER_KEY: &str = "previousManifestPointer";
const LEGACY_PREVIOUS_POINTER_KEY: &str = "previousVersionsSiteTxId";

/// Version manifest, serialized as `versions.json`.
///
/// Reading accepts the legacy `previousVersionsSiteTxId` key; when both
/// names are present `previousManifestPointer` wins and the legacy key is
/// dropped. Writing always uses the current name.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct VersionManifest {
    /// Released versions, newest first.
    pub versions: Vec<VersionEntry>,

    /// Content identifier of the bundle this manifest replaced.
    #[serde(rename = "previousManifestPointer", skip_serializing_if = "Option::is_none")]
    pub previous_manifest_pointer: Option<String>,

    /// Top-level keys this tool does not manage, kept verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A single released version.
///
/// Everything except the content identifier lives in `fields` so entries
/// read from a remote manifest round-trip without losing keys or order.
/// `contentId` is read first, then the legacy `txId`; whichever is not used
/// is dropped so a written entry never carries both.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VersionEntry {
    #[serde(rename = "contentId")]
    pub content_id: String,

    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl VersionEntry {
    /// Publish time in milliseconds, if the entry carries an integer timestamp.
    pub fn timestamp(&self) -> Option<i64> {
        self.fields.get(TIMESTAMP_KEY).and_then(Value::as_i64)
    }
}

impl<'de> Deserialize<'de> for VersionEntry {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Map::<String, Value>::deserialize(deserializer)?;

        let mut content_id = None;
        let mut legacy_id = None;
        let mut fields = Map::new();
        for (key, value) in raw {
            match key.as_str() {
                CONTENT_ID_KEY => content_id = Some(value),
                LEGACY_CONTENT_ID_KEY => legacy_id = Some(value),
                _ => {
                    fields.insert(key, value);
                }
            }
        }

        let content_id = match content_id.or(legacy_id) {
            Some(value) => string_value(CONTENT_ID_KEY, value)?,
            None => return Err(D::Error::missing_field(CONTENT_ID_KEY)),
        };

        Ok(Self { content_id, fields })
    }
}

impl<'de> Deserialize<'de> for VersionManifest {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Map::<String, Value>::deserialize(deserializer)?;

        let mut versions = None;
        let mut pointer = None;
        let mut legacy_pointer = None;
        let mut extra = Map::new();
        for (key, value) in raw {
            match key.as_str() {
                VERSIONS_KEY => versions = Some(value),
                PREVIOUS_POINTER_KEY => pointer = Some(value),
                LEGACY_PREVIOUS_POINTER_KEY => legacy_pointer = Some(value),
                _ => {
                    extra.insert(key, value);
                }
            }
        }

        let versions = match versions {
            Some(value) => Vec::<VersionEntry>::deserialize(value).map_err(D::Error::custom)?,
            None => return Err(D::Error::missing_field(VERSIONS_KEY)),
        };

        let previous_manifest_pointer = match pointer.or(legacy_pointer) {
            None | Some(Value::Null) => None,
            Some(value) => Some(string_value(PREVIOUS_POINTER_KEY, value)?),
        };

        Ok(Self {
            versions,
            previous_manifest_pointer,
            extra,
        })
    }
}

fn string_value<E: serde::de::Error>(key: &str, value: Value) -> Result<String, E> {
    match value {
        Value::String(s) => Ok(s),
        other => Err(E::custom(format!("{} must be a string, got {}", key, other))),
    }
}

impl VersionManifest {
    /// The manifest used when no history exists or it cannot be read.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Most recently released version.
    pub fn latest(&self) -> Option<&VersionEntry> {
        self.versions.first()
    }

    pub fn len(&self) -> usize {
        self.versions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }

    /// Pretty-printed JSON as written to `versions.json`.
    pub fn to_pretty_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
