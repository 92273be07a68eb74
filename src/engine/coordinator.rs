//! Pass coordinator - drives the worker pool over all discovered directories
//!
//! The coordinator is responsible for:
//! - Resolving the root and discovering directories once
//! - Filling and closing the work queue for each pass
//! - Spawning, joining and reporting on workers
//! - Starting and stopping the progress display
//! - Collecting manifests back and building the final result

use crate::config::EngineConfig;
use crate::engine::discovery::{discover_directories, resolve_root};
use crate::engine::queue::{DirTask, WorkQueue};
use crate::engine::worker::{DirReport, PassJob, Worker};
use crate::engine::Mode;
use crate::error::{DirectoryError, Result, WorkerError};
use crate::manifest::{DirState, DirectoryManifest};
use crate::progress::ProgressReporter;
use crate::stats::RunStats;
use crossbeam_channel::bounded;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

/// Final state of one directory in a pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirOutcome {
    pub path: PathBuf,
    pub state: DirState,
}

/// Result of a completed pass
#[derive(Debug)]
pub struct RunResult {
    /// Pass that was run
    pub mode: Mode,

    /// Resolved root of the run
    pub root: PathBuf,

    /// Directories completed
    pub total_dirs: usize,

    /// Files whose checksum matched
    pub verified: u64,

    /// Files recorded for the first time
    pub new: u64,

    /// Files whose recorded checksum was replaced
    pub updated: u64,

    /// Files whose checksum did not match
    pub failed: u64,

    /// Bytes read while checksumming
    pub bytes: u64,

    /// Affected files, sorted by path
    pub new_files: Vec<PathBuf>,
    pub updated_files: Vec<PathBuf>,
    pub failed_files: Vec<PathBuf>,

    /// Per-directory states, sorted by path
    pub outcomes: Vec<DirOutcome>,

    /// Directories whose pass ended with an error, sorted by path
    pub errors: Vec<DirectoryError>,

    /// Time taken for the pass
    pub duration: Duration,
}

impl RunResult {
    /// True when no directory failed and, for verify, nothing mismatched
    pub fn success(&self) -> bool {
        match self.mode {
            Mode::Verify => self.errors.is_empty() && self.failed == 0,
            Mode::Update | Mode::AddOnly => self.errors.is_empty(),
        }
    }

    /// Exit-status view of the pass: changes recorded by an update count as
    /// noteworthy, so only a pass that found nothing is clean
    pub fn is_clean(&self) -> bool {
        match self.mode {
            Mode::Verify => self.success(),
            Mode::Update | Mode::AddOnly => {
                self.success() && self.new == 0 && self.updated == 0
            }
        }
    }

    /// Number of directories that ended in `state`
    pub fn count_state(&self, state: DirState) -> usize {
        self.outcomes.iter().filter(|o| o.state == state).count()
    }
}

/// Manages checksums for every directory below one root
pub struct ChecksumEngine {
    config: EngineConfig,
    root: PathBuf,
    directories: BTreeMap<PathBuf, DirectoryManifest>,
}

impl ChecksumEngine {
    /// Resolve the root and load every directory's manifest
    ///
    /// Fails before any pass can run if the root is unusable, the walk
    /// fails, or any manifest cannot be loaded.
    pub fn new(config: EngineConfig) -> Result<Self> {
        let root = resolve_root(&config.root)?;
        let directories = discover_directories(&root)?;

        Ok(Self {
            config,
            root,
            directories,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn directory_count(&self) -> usize {
        self.directories.len()
    }

    /// Discovered directories in path order
    pub fn directories(&self) -> impl Iterator<Item = &Path> {
        self.directories.keys().map(PathBuf::as_path)
    }

    pub fn manifest(&self, dir: &Path) -> Option<&DirectoryManifest> {
        self.directories.get(dir)
    }

    /// Report previously recorded files that no longer match
    pub fn verify(&mut self) -> Result<RunResult> {
        info!("Verifying checksums");
        self.run_pass(Mode::Verify)
    }

    /// Record new files and replace checksums that no longer match
    pub fn update(&mut self) -> Result<RunResult> {
        info!("Updating checksums");
        self.run_pass(Mode::Update)
    }

    /// Record new files without touching existing checksums
    pub fn add(&mut self) -> Result<RunResult> {
        info!("Adding new file checksums");
        self.run_pass(Mode::AddOnly)
    }

    pub fn run(&mut self, mode: Mode) -> Result<RunResult> {
        match mode {
            Mode::Verify => self.verify(),
            Mode::Update => self.update(),
            Mode::AddOnly => self.add(),
        }
    }

    fn run_pass(&mut self, mode: Mode) -> Result<RunResult> {
        let count = self.directories.len();
        let worker_count = self.config.worker_count.max(1);

        info!(
            root = %self.root.display(),
            mode = %mode,
            directories = count,
            workers = worker_count,
            "Starting pass"
        );

        let stats = Arc::new(RunStats::new());
        stats.set_dir_count(count);

        // Queue every directory up front so no send can block
        let queue = WorkQueue::new(count);
        for (_, manifest) in std::mem::take(&mut self.directories) {
            queue.push(DirTask::new(manifest))?;
        }
        let receiver = queue.close();

        let (results_tx, results_rx) = bounded::<DirReport>(count.max(1));

        let progress = self
            .config
            .show_progress()
            .then(|| ProgressReporter::start(Arc::clone(&stats)));

        let job = PassJob {
            mode,
            narrate: self.config.narrate(),
        };

        let mut workers = Vec::with_capacity(worker_count);
        let mut failure: Option<WorkerError> = None;

        for id in 0..worker_count {
            match Worker::spawn(
                id,
                job,
                receiver.clone(),
                results_tx.clone(),
                Arc::clone(&stats),
            ) {
                Ok(worker) => workers.push(worker),
                Err(e) => {
                    error!(worker = id, error = %e, "Could not spawn worker");
                    failure = Some(e);
                    break;
                }
            }
        }
        drop(results_tx);

        info!(count = workers.len(), "Workers spawned");

        for worker in workers {
            let id = worker.id();
            if let Err(e) = worker.join() {
                error!(worker = id, error = %e, "Worker failed to join cleanly");
                if failure.is_none() {
                    failure = Some(e);
                }
            }
        }

        if let Some(progress) = progress {
            progress.finish();
        }

        let mut outcomes = Vec::with_capacity(count);
        let mut errors = Vec::new();

        for report in results_rx.try_iter() {
            let path = report.manifest.path().to_path_buf();
            outcomes.push(DirOutcome {
                path: path.clone(),
                state: report.state,
            });
            if let Some(error) = report.error {
                errors.push(DirectoryError {
                    directory: path.clone(),
                    error,
                });
            }
            self.directories.insert(path, report.manifest);
        }

        // Tasks no worker got to (only when spawning failed)
        for task in receiver.drain() {
            let path = task.manifest.path().to_path_buf();
            self.directories.insert(path, task.manifest);
        }

        if let Some(e) = failure {
            return Err(e.into());
        }

        outcomes.sort_by(|a, b| a.path.cmp(&b.path));
        errors.sort_by(|a, b| a.directory.cmp(&b.directory));

        let mut snapshot = stats.snapshot();
        snapshot.new_files.sort();
        snapshot.updated_files.sort();
        snapshot.failed_files.sort();

        let duration = stats.elapsed();
        let queue_stats = receiver.stats();

        info!(
            mode = %mode,
            dirs = snapshot.directories,
            verified = snapshot.verified,
            new = snapshot.new,
            updated = snapshot.updated,
            failed = snapshot.failed,
            errors = errors.len(),
            enqueued = queue_stats.enqueued(),
            dequeued = queue_stats.dequeued(),
            duration_ms = duration.as_millis() as u64,
            "Pass completed"
        );

        Ok(RunResult {
            mode,
            root: self.root.clone(),
            total_dirs: snapshot.directories,
            verified: snapshot.verified,
            new: snapshot.new,
            updated: snapshot.updated,
            failed: snapshot.failed,
            bytes: snapshot.bytes,
            new_files: snapshot.new_files,
            updated_files: snapshot.updated_files,
            failed_files: snapshot.failed_files,
            outcomes,
            errors,
            duration,
        })
    }
}
