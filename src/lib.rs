//! rotcheck - Bit Rot Detection for Directory Trees
//!
//! Records a checksum for every file in a tree and later re-checks them to
//! detect silent corruption. Each directory owns a flat `.checksums.json`
//! manifest describing the plain files directly inside it.
//!
//! # Features
//!
//! - **Per-Directory Manifests**: Directories are self-contained; moving a
//!   directory moves its integrity history with it.
//!
//! - **Parallel Passes**: A fixed pool of worker threads processes one
//!   directory at a time each, from a queue filled before the pass starts.
//!
//! - **Safe Under Failure**: Corrupt manifests abort the run instead of being
//!   discarded, unreadable files fail their directory loudly, and manifests
//!   are replaced atomically.
//!
//! - **Live Progress**: Optional progress bar fed from the shared statistics.
//!
//! # Example
//!
//! ```no_run
//! use rotcheck::{ChecksumEngine, EngineConfig};
//!
//! let config = EngineConfig::new("/srv/photos").workers(4).quiet(true);
//! let mut engine = ChecksumEngine::new(config)?;
//!
//! engine.update()?;
//! let result = engine.verify()?;
//! println!("{} failed", result.failed);
//! # Ok::<(), rotcheck::RotError>(())
//! ```

pub mod config;
pub mod content;
pub mod engine;
pub mod error;
pub mod manifest;
pub mod progress;
pub mod stats;

pub use config::{CliArgs, EngineConfig, RunConfig};
pub use engine::{ChecksumEngine, DirOutcome, Mode, RunResult};
pub use error::{DirectoryError, ManifestError, Result, RotError};
pub use manifest::{DirState, DirectoryManifest, MANIFEST_FILE_NAME};
pub use stats::{RunStats, StatsSnapshot};
