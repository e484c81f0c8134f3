//! Bundle staging.
//!
//! Builds the directory that gets uploaded: a fresh copy of the site template
//! (or an empty directory) plus the updated `versions.json`.

use crate::fs::walker::{walk_directory, WalkOptions};
use crate::manifest::{VersionManifest, VERSIONS_FILE};
use crate::utils::errors::Result;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

/// Template entries that never belong in a bundle.
pub const TEMPLATE_EXCLUDES: &[&str] = &[".git"];

/// Where to build the bundle and what to seed it with.
#[derive(Debug, Clone)]
pub struct StageOptions {
    /// Site template copied into the bundle when it exists.
    pub template_dir: Option<PathBuf>,

    /// Output directory, replaced on every run.
    pub staging_dir: PathBuf,
}

/// A staged bundle ready for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedBundle {
    pub dir: PathBuf,
    pub manifest_path: PathBuf,
    pub template_files: usize,
}

/// Stage `manifest` into `options.staging_dir`.
///
/// Blocking; call from `spawn_blocking` inside async code.
pub fn stage_bundle(options: &StageOptions, manifest: &VersionManifest) -> Result<StagedBundle> {
    let staging_dir = &options.staging_dir;

    if staging_dir.exists() {
        info!("Removing existing {} folder", staging_dir.display());
        fs::remove_dir_all(staging_dir)?;
    }

    let template_files = match options.template_dir.as_deref().filter(|dir| dir.is_dir()) {
        Some(template_dir) => {
            info!("Copying {} to {}", template_dir.display(), staging_dir.display());
            copy_dir(template_dir, staging_dir)?
        }
        None => {
            info!("Creating new {} folder", staging_dir.display());
            fs::create_dir_all(staging_dir)?;
            0
        }
    };

    info!("Writing {} to {}", VERSIONS_FILE, staging_dir.display());
    let manifest_path = staging_dir.join(VERSIONS_FILE);
    write_manifest(&manifest_path, manifest)?;

    Ok(StagedBundle {
        dir: staging_dir.clone(),
        manifest_path,
        template_files,
    })
}

/// Recursively copy `src` into a new directory `dest`, returning the number
/// of files copied.
fn copy_dir(src: &Path, dest: &Path) -> Result<usize> {
    fs::create_dir_all(dest)?;

    let options = WalkOptions {
        follow_links: true,
        include_dirs: true,
        exclude_names: TEMPLATE_EXCLUDES.iter().map(|name| name.to_string()).collect(),
    };

    let mut copied = 0;
    for entry in walk_directory(src, &options)? {
        let target = dest.join(&entry.relative_path);
        if entry.is_dir {
            fs::create_dir_all(&target)?;
        } else {
            fs::copy(&entry.path, &target)?;
            copied += 1;
        }
    }

    Ok(copied)
}

/// Write the manifest pretty-printed and sync it to disk.
fn write_manifest(path: &Path, manifest: &VersionManifest) -> Result<()> {
    let json = manifest.to_pretty_json()?;
    let mut file = fs::File::create(path)?;
    file.write_all(json.as_bytes())?;
    file.flush()?;
    file.sync_all()?;
    Ok(())
}
