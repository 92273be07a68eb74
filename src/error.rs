//! Error types for rotcheck
//!
//! This module defines the error hierarchy for:
//! - Setup failures (root resolution, directory discovery)
//! - Manifest load/save/verify failures, always tied to a path
//! - Configuration and CLI errors
//! - Worker thread errors
//!
//! Checksum mismatches are findings, not errors, and never appear here.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Top-level error type for rotcheck
#[derive(Error, Debug)]
pub enum RotError {
    /// Setup errors abort a run before any worker starts
    #[error("Setup error: {0}")]
    Setup(#[from] SetupError),

    /// Manifest errors
    #[error("Manifest error: {0}")]
    Manifest(#[from] ManifestError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Worker/concurrency errors
    #[error("Worker error: {0}")]
    Worker(#[from] WorkerError),
}

/// Errors raised while resolving the root and discovering directories
#[derive(Error, Debug)]
pub enum SetupError {
    /// Root path could not be resolved
    #[error("Directory '{path}' does not exist, cannot manage checksums: {source}")]
    RootNotFound {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Root path exists but is not a directory
    #[error("'{path}' is not a directory, cannot manage checksums")]
    NotADirectory { path: PathBuf },

    /// Walking the tree failed
    #[error("Could not traverse '{path}': {reason}")]
    Walk { path: PathBuf, reason: String },
}

/// Errors for a single directory manifest
#[derive(Error, Debug)]
pub enum ManifestError {
    /// Manifest target is not a directory
    #[error("Could not load '{path}', it's not a directory")]
    NotADirectory { path: PathBuf },

    /// Manifest file exists but could not be read
    #[error("Could not open checksum file '{path}': {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Manifest file is not valid JSON
    #[error("Could not parse JSON data in file '{path}': {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    /// Manifest could not be encoded
    #[error("Could not JSON encode '{path}': {source}")]
    Encode {
        path: PathBuf,
        source: serde_json::Error,
    },

    /// Manifest could not be written back
    #[error("Writing to '{path}' failed: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Directory listing failed
    #[error("Could not list directory '{path}': {source}")]
    ReadDir {
        path: PathBuf,
        source: std::io::Error,
    },

    /// File could not be read while computing its checksum
    #[error("Could not calculate checksum for '{path}': {source}")]
    Checksum {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl ManifestError {
    /// Path of the file or directory the error is attributed to
    pub fn path(&self) -> &Path {
        match self {
            ManifestError::NotADirectory { path }
            | ManifestError::Read { path, .. }
            | ManifestError::Parse { path, .. }
            | ManifestError::Encode { path, .. }
            | ManifestError::Write { path, .. }
            | ManifestError::ReadDir { path, .. }
            | ManifestError::Checksum { path, .. } => path,
        }
    }
}

/// Configuration and CLI errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Invalid worker count
    #[error("Invalid worker count {count}: must be between 1 and {max}")]
    InvalidWorkerCount { count: usize, max: usize },
}

/// Worker thread errors
#[derive(Error, Debug)]
pub enum WorkerError {
    /// Worker panicked
    #[error("Worker {id} panicked: {message}")]
    Panicked { id: usize, message: String },

    /// Work queue send failed
    #[error("Failed to send work item: queue full or closed")]
    QueueSendFailed,

    /// Worker thread could not be spawned
    #[error("Failed to initialize worker {id}: {reason}")]
    InitFailed { id: usize, reason: String },
}

/// Result type alias for RotError
pub type Result<T> = std::result::Result<T, RotError>;

/// Result type alias for ManifestError
pub type ManifestResult<T> = std::result::Result<T, ManifestError>;

/// A manifest error attributed to the directory whose pass it ended
#[derive(Debug)]
pub struct DirectoryError {
    /// Directory being processed
    pub directory: PathBuf,

    /// Underlying error
    pub error: ManifestError,
}

impl std::fmt::Display for DirectoryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.directory.display(), self.error)
    }
}

impl std::error::Error for DirectoryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_manifest_error_path() {
        let err = ManifestError::Checksum {
            path: "/data/a.txt".into(),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        };
        assert_eq!(err.path(), Path::new("/data/a.txt"));

        let err = ManifestError::Write {
            path: "/data/.checksums.json".into(),
            source: io::Error::new(io::ErrorKind::Other, "disk full"),
        };
        assert_eq!(err.path(), Path::new("/data/.checksums.json"));
    }

    #[test]
    fn test_error_conversion() {
        let err = ManifestError::NotADirectory {
            path: "/missing".into(),
        };
        let rot_err: RotError = err.into();
        assert!(matches!(rot_err, RotError::Manifest(_)));
    }

    #[test]
    fn test_directory_error_display() {
        let err = DirectoryError {
            directory: "/data".into(),
            error: ManifestError::ReadDir {
                path: "/data".into(),
                source: io::Error::new(io::ErrorKind::NotFound, "gone"),
            },
        };
        let msg = err.to_string();
        assert!(msg.starts_with("/data: "));
        assert!(msg.contains("Could not list directory"));
    }
}
