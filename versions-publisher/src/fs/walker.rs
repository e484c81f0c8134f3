//! Directory traversal for staging and uploading bundles.

use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

/// Options for directory walking
#[derive(Debug, Clone, Default)]
pub struct WalkOptions {
    /// Follow symbolic links
    pub follow_links: bool,

    /// File or directory names to skip, matched exactly
    pub exclude_names: Vec<String>,

    /// Also report directories (needed to recreate empty ones)
    pub include_dirs: bool,
}

/// Information about an entry discovered during walking
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
    /// Full path to the entry
    pub path: PathBuf,

    /// Relative path from the root
    pub relative_path: PathBuf,

    /// File size in bytes (0 for directories)
    pub size: u64,

    /// Is this a directory?
    pub is_dir: bool,
}

impl FileInfo {
    /// Create FileInfo from a DirEntry.
    /// Symlinks resolve to their target; links to directories and broken
    /// links are skipped.
    fn from_entry(entry: &DirEntry, root: &Path) -> std::io::Result<Option<Self>> {
        let raw_metadata = entry.metadata()?;
        let path = entry.path().to_path_buf();
        let relative_path = path.strip_prefix(root).unwrap_or(&path).to_path_buf();

        let (size, is_dir) = if raw_metadata.is_symlink() {
            match std::fs::metadata(&path) {
                Ok(resolved) if resolved.is_dir() => return Ok(None),
                Ok(resolved) => (resolved.len(), false),
                Err(_) => return Ok(None),
            }
        } else if raw_metadata.is_dir() {
            (0, true)
        } else {
            (raw_metadata.len(), false)
        };

        Ok(Some(Self {
            path,
            relative_path,
            size,
            is_dir,
        }))
    }

    /// Relative path with `/` separators, as used in path manifests.
    pub fn manifest_path(&self) -> String {
        self.relative_path
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/")
    }
}

/// Walk a directory tree and collect its entries, parents before children,
/// sorted by name within each directory.
///
/// The root itself is never reported.
pub fn walk_directory(root: &Path, options: &WalkOptions) -> std::io::Result<Vec<FileInfo>> {
    let mut files = Vec::new();

    let entries = WalkDir::new(root)
        .follow_links(options.follow_links)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| !should_exclude(entry, &options.exclude_names));

    for entry in entries {
        let entry = entry?;

        if entry.file_type().is_dir() && !options.include_dirs {
            continue;
        }

        if let Some(file_info) = FileInfo::from_entry(&entry, root)? {
            files.push(file_info);
        }
    }

    Ok(files)
}

/// Total size of the files in `entries`.
pub fn total_size(entries: &[FileInfo]) -> u64 {
    entries.iter().filter(|f| !f.is_dir).map(|f| f.size).sum()
}

/// Check if a directory entry should be excluded by name
fn should_exclude(entry: &DirEntry, names: &[String]) -> bool {
    let file_name = entry.file_name().to_string_lossy();
    names.iter().any(|name| file_name == name.as_str())
}
