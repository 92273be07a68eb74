//! Root resolution and directory discovery

use crate::error::{Result, SetupError};
use crate::manifest::{is_hidden, DirectoryManifest};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

/// Resolve the run root to an absolute, symlink-free directory path
pub fn resolve_root(root: &Path) -> std::result::Result<PathBuf, SetupError> {
    let resolved = fs::canonicalize(root).map_err(|source| SetupError::RootNotFound {
        path: root.to_path_buf(),
        source,
    })?;

    if !resolved.is_dir() {
        return Err(SetupError::NotADirectory { path: resolved });
    }

    Ok(resolved)
}

/// Walk `root` and load the manifest of every non-hidden directory
///
/// A hidden directory is not a unit of work itself, but the walk still
/// descends into it, so `.hidden/visible` is discovered. The root is always
/// included, even when its own name is hidden. Symlinked directories are not
/// followed. Any traversal or manifest load error aborts discovery.
pub fn discover_directories(root: &Path) -> Result<BTreeMap<PathBuf, DirectoryManifest>> {
    info!(root = %root.display(), "Populating subdirectories");

    let mut directories = BTreeMap::new();

    let walker = WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter();

    for entry in walker {
        let entry = entry.map_err(|e| SetupError::Walk {
            path: e
                .path()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| root.to_path_buf()),
            reason: e.to_string(),
        })?;

        if !entry.file_type().is_dir() {
            continue;
        }

        if entry.depth() > 0 && is_hidden(&entry.file_name().to_string_lossy()) {
            debug!(path = %entry.path().display(), "Skipping hidden directory");
            continue;
        }

        let manifest = DirectoryManifest::load(entry.path())?;
        debug!(path = %entry.path().display(), files = manifest.len(), "Found directory");
        directories.insert(entry.into_path(), manifest);
    }

    info!(count = directories.len(), "Found directories");

    Ok(directories)
}
