//! Checksum engine: discovery plus parallel verify/update passes
//!
//! # Architecture
//!
//! ```text
//!                 ┌──────────────────────────┐
//!                 │      ChecksumEngine      │
//!                 │  - resolve root          │
//!                 │  - walk + load manifests │
//!                 └────────────┬─────────────┘
//!                              │ every directory, then close
//!                              ▼
//!                 ┌──────────────────────────┐
//!                 │ Work Queue (bounded = N) │
//!                 └────────────┬─────────────┘
//!       ┌──────────────────────┼──────────────────────┐
//! ┌─────▼─────┐          ┌─────▼─────┐          ┌─────▼─────┐
//! │  Worker 0 │          │  Worker 1 │   ...    │  Worker W │
//! │  verify / │          │  verify / │          │  verify / │
//! │  update   │          │  update   │          │  update   │
//! └─────┬─────┘          └─────┬─────┘          └─────┬─────┘
//!       │   RunStats (one lock) + result channel      │
//!       └──────────────────────┼──────────────────────┘
//!                              ▼
//!                 join, stop progress, RunResult
//! ```

pub mod coordinator;
pub mod discovery;
pub mod queue;
pub mod worker;

pub use coordinator::{ChecksumEngine, DirOutcome, RunResult};
pub use discovery::{discover_directories, resolve_root};

/// Which pass to run over the tree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Read-only comparison against recorded checksums
    Verify,
    /// Record new files and refresh changed checksums
    Update,
    /// Record new files only
    AddOnly,
}

impl Mode {
    /// Whether this pass may write manifests
    pub fn is_mutating(&self) -> bool {
        !matches!(self, Mode::Verify)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Verify => "verify",
            Mode::Update => "update",
            Mode::AddOnly => "add",
        }
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
