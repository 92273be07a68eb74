//! Configuration types for rotcheck
//!
//! This module defines:
//! - CLI argument parsing using clap derive macros
//! - Library configuration for the checksum engine
//! - Validated runtime configuration for the binary

use crate::engine::Mode;
use crate::error::ConfigError;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Maximum reasonable worker count
pub const MAX_WORKERS: usize = 512;

/// Detect and report bit rot
#[derive(Parser, Debug, Clone)]
#[command(
    name = "rotcheck",
    version,
    about = "Detect and report bit rot",
    long_about = "Records an MD5 checksum for every file in a directory tree and later \
                  re-checks them to detect silent corruption.\n\n\
                  Each directory keeps its own .checksums.json describing the plain \
                  files directly inside it. Hidden files and directories are ignored.",
    after_help = "EXAMPLES:\n    \
        rotcheck -p /srv/photos update --yes\n    \
        rotcheck -p /srv/photos --progress verify\n    \
        rotcheck -p /srv/photos -w 8 add -y\n    \
        rotcheck -p /srv/photos verify -q && echo clean"
)]
pub struct CliArgs {
    /// Root path to traverse
    #[arg(short = 'p', long, value_name = "DIR")]
    pub path: PathBuf,

    /// Number of worker threads used for checksumming
    #[arg(
        short = 'w',
        long,
        default_value_t = default_workers(),
        value_name = "NUM"
    )]
    pub workers: usize,

    /// Enable verbose logging
    #[arg(short = 'v', long)]
    pub verbose: bool,

    /// Enable debug logging
    #[arg(short = 'd', long)]
    pub debug: bool,

    /// Show a progress bar and summary
    #[arg(long)]
    pub progress: bool,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Command,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Verify previously recorded checksums
    Verify {
        /// Do not produce output, only exit with 0 or 1
        #[arg(short = 'q', long)]
        quiet: bool,
    },

    /// Store new checksums and update existing ones that do not match
    Update {
        /// Assume yes to any questions
        #[arg(short = 'y', long)]
        yes: bool,
    },

    /// Store checksums for new files, leaving existing entries untouched
    Add {
        /// Assume yes to any questions
        #[arg(short = 'y', long)]
        yes: bool,
    },
}

/// One worker per CPU; hashing is mostly I/O and CPU in equal parts
pub fn default_workers() -> usize {
    num_cpus::get().max(1)
}

/// Settings for a [`ChecksumEngine`](crate::engine::ChecksumEngine)
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Root of the tree; resolved to an absolute path by the engine
    pub root: PathBuf,

    /// Number of worker threads (at least one is always used)
    pub worker_count: usize,

    /// Suppress progress and per-file output
    pub quiet: bool,

    /// Show a progress bar instead of per-file output
    pub progress: bool,
}

impl EngineConfig {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            worker_count: default_workers(),
            quiet: false,
            progress: false,
        }
    }

    pub fn workers(mut self, count: usize) -> Self {
        self.worker_count = count;
        self
    }

    pub fn quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    pub fn progress(mut self, progress: bool) -> Self {
        self.progress = progress;
        self
    }

    /// Print a line per failed/new/updated file while the pass runs
    pub fn narrate(&self) -> bool {
        !self.quiet && !self.progress
    }

    pub fn show_progress(&self) -> bool {
        self.progress && !self.quiet
    }
}

/// Validated runtime configuration for the binary
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub engine: EngineConfig,
    pub mode: Mode,

    /// Skip the confirmation prompt before mutating passes
    pub assume_yes: bool,

    pub verbose: bool,
    pub debug: bool,
}

impl RunConfig {
    /// Create and validate configuration from CLI arguments
    pub fn from_args(args: CliArgs) -> Result<Self, ConfigError> {
        if args.workers == 0 || args.workers > MAX_WORKERS {
            return Err(ConfigError::InvalidWorkerCount {
                count: args.workers,
                max: MAX_WORKERS,
            });
        }

        let (mode, quiet, assume_yes) = match args.command {
            Command::Verify { quiet } => (Mode::Verify, quiet, false),
            Command::Update { yes } => (Mode::Update, false, yes),
            Command::Add { yes } => (Mode::AddOnly, false, yes),
        };

        // Log output and the progress bar would interleave
        let progress = args.progress && !(args.verbose || args.debug || quiet);

        Ok(Self {
            engine: EngineConfig::new(args.path)
                .workers(args.workers)
                .quiet(quiet)
                .progress(progress),
            mode,
            assume_yes,
            verbose: args.verbose,
            debug: args.debug,
        })
    }
}
