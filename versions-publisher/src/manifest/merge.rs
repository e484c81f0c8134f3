//! Version log merge.
//!
//! Pure function of its inputs: the caller supplies the clock reading so the
//! merge can be tested without touching time or the network.

use super::{VersionEntry, VersionManifest, CONTENT_ID_KEY, LEGACY_CONTENT_ID_KEY, TIMESTAMP_KEY};
use crate::utils::errors::{PublishError, Result};
use serde_json::{Map, Value};

/// Result of merging a candidate into a manifest.
#[derive(Debug, Clone, PartialEq)]
pub enum MergeOutcome {
    /// The candidate already heads the manifest; nothing to publish.
    Unchanged(VersionManifest),
    /// A new entry was prepended.
    Changed(VersionManifest),
}

impl MergeOutcome {
    pub fn is_changed(&self) -> bool {
        matches!(self, MergeOutcome::Changed(_))
    }

    pub fn manifest(&self) -> &VersionManifest {
        match self {
            MergeOutcome::Unchanged(m) | MergeOutcome::Changed(m) => m,
        }
    }

    pub fn into_manifest(self) -> VersionManifest {
        match self {
            MergeOutcome::Unchanged(m) | MergeOutcome::Changed(m) => m,
        }
    }
}

/// Build a new entry from the computed fields and the caller's extra fields.
///
/// The merge is right-biased: `{contentId, timestamp}` first, then every
/// extra key in order, with extra values replacing computed ones. A
/// replacement `contentId` must be a non-empty string. The legacy `txId` key
/// names the same field: it replaces the identifier when `contentId` is not
/// given and is never written alongside it.
pub fn build_entry(candidate: &str, now_ms: i64, extra: &Map<String, Value>) -> Result<VersionEntry> {
    let replacement = [CONTENT_ID_KEY, LEGACY_CONTENT_ID_KEY]
        .into_iter()
        .find_map(|key| extra.get(key).map(|value| (key, value)));

    let content_id = match replacement {
        None => candidate.to_string(),
        Some((_, Value::String(id))) if !id.is_empty() => id.clone(),
        Some((key, other)) => {
            return Err(PublishError::InvalidExtraFields(format!(
                "{} must be a non-empty string, got {}",
                key, other
            )))
        }
    };

    let mut fields = Map::new();
    fields.insert(TIMESTAMP_KEY.to_string(), Value::from(now_ms));
    for (key, value) in extra {
        if key != CONTENT_ID_KEY && key != LEGACY_CONTENT_ID_KEY {
            fields.insert(key.clone(), value.clone());
        }
    }

    Ok(VersionEntry { content_id, fields })
}

/// Merge `candidate` into `manifest`.
///
/// Only the newest entry is compared against the candidate. When a new entry
/// is prepended, `previousManifestPointer` is set to `previous_pointer`, or
/// cleared when there was none.
pub fn merge_versions(
    mut manifest: VersionManifest,
    candidate: &str,
    previous_pointer: Option<&str>,
    extra: &Map<String, Value>,
    now_ms: i64,
) -> Result<MergeOutcome> {
    if candidate.is_empty() {
        return Err(PublishError::MissingTransactionId(String::new()));
    }

    if manifest
        .latest()
        .is_some_and(|latest| latest.content_id == candidate)
    {
        return Ok(MergeOutcome::Unchanged(manifest));
    }

    let entry = build_entry(candidate, now_ms, extra)?;
    manifest.versions.insert(0, entry);
    manifest.previous_manifest_pointer = previous_pointer
        .filter(|pointer| !pointer.is_empty())
        .map(str::to_string);

    Ok(MergeOutcome::Changed(manifest))
}
