//! Per-directory checksum manifests
//!
//! Every processed directory owns one `.checksums.json` holding the
//! checksums of the plain files directly inside it. Subdirectories get
//! their own manifest; nothing is aggregated upwards.
//!
//! ```text
//! {"created":1700000000,"updated":1700000500,"files":{"a.txt":"d41d8cd9..."}}
//! ```

pub mod directory;

pub use directory::DirectoryManifest;

use crate::content::checksum::compute_md5_with_size;
use crate::error::{ManifestError, ManifestResult};
use crate::progress::print_finding;
use crate::stats::RunStats;
use std::path::{Path, PathBuf};

/// Reserved manifest file name inside each directory
pub const MANIFEST_FILE_NAME: &str = ".checksums.json";

/// Suffix of the scratch file a manifest is written to before the rename
pub const MANIFEST_TEMP_SUFFIX: &str = ".tmp";

/// Hidden entries (including the manifest) are never files or work units
pub fn is_hidden(name: &str) -> bool {
    name.starts_with('.')
}

/// Terminal state of one directory after a pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DirState {
    /// Every recorded file matched
    Verified,
    /// At least one recorded file did not match
    Mismatched,
    /// New files were recorded, none changed
    Added,
    /// At least one recorded checksum was replaced
    Updated,
    /// Update pass found nothing to record
    Unchanged,
    /// The pass for this directory ended with an error
    Failed,
}

impl DirState {
    pub fn as_str(&self) -> &'static str {
        match self {
            DirState::Verified => "verified",
            DirState::Mismatched => "mismatched",
            DirState::Added => "added",
            DirState::Updated => "updated",
            DirState::Unchanged => "unchanged",
            DirState::Failed => "failed",
        }
    }
}

impl std::fmt::Display for DirState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shared state handed to every manifest operation during a pass
pub struct PassContext<'a> {
    stats: &'a RunStats,
    narrate: bool,
}

impl<'a> PassContext<'a> {
    pub fn new(stats: &'a RunStats, narrate: bool) -> Self {
        Self { stats, narrate }
    }

    pub fn stats(&self) -> &RunStats {
        self.stats
    }

    /// Checksum a file, counting the bytes read
    pub(crate) fn checksum(&self, path: &Path) -> ManifestResult<String> {
        let (sum, bytes) =
            compute_md5_with_size(path).map_err(|source| ManifestError::Checksum {
                path: path.to_path_buf(),
                source,
            })?;
        self.stats.add_bytes(bytes);
        Ok(sum)
    }

    pub(crate) fn report_verified(&self) {
        self.stats.incr_verified();
    }

    pub(crate) fn report_failed(&self, path: PathBuf) {
        if self.narrate {
            print_finding("failed", &path);
        }
        self.stats.incr_failed(path);
    }

    pub(crate) fn report_new(&self, path: PathBuf) {
        if self.narrate {
            print_finding("new", &path);
        }
        self.stats.incr_new(path);
    }

    pub(crate) fn report_updated(&self, path: PathBuf) {
        if self.narrate {
            print_finding("updated", &path);
        }
        self.stats.incr_updated(path);
    }
}
