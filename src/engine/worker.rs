//! Worker threads for verify/update passes
//!
//! Each worker:
//! - Pulls one directory at a time from the closed work queue
//! - Runs the pass for the current mode on that directory's manifest
//! - Counts the directory as completed, whatever the outcome
//! - Hands the manifest back to the engine on the result channel

use crate::engine::queue::WorkQueueReceiver;
use crate::engine::Mode;
use crate::error::{ManifestError, ManifestResult, WorkerError};
use crate::manifest::{DirState, DirectoryManifest, PassContext};
use crate::stats::RunStats;
use crossbeam_channel::Sender;
use std::any::Any;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, error, info, warn};

/// Per-pass settings shared by every worker
#[derive(Debug, Clone, Copy)]
pub struct PassJob {
    pub mode: Mode,
    pub narrate: bool,
}

/// What a worker sends back for each directory
#[derive(Debug)]
pub struct DirReport {
    pub manifest: DirectoryManifest,
    pub state: DirState,
    pub error: Option<ManifestError>,
}

/// A worker thread that processes directory tasks
pub struct Worker {
    id: usize,
    handle: Option<JoinHandle<()>>,
}

impl Worker {
    /// Spawn a new worker thread
    pub fn spawn(
        id: usize,
        job: PassJob,
        queue: WorkQueueReceiver,
        results: Sender<DirReport>,
        stats: Arc<RunStats>,
    ) -> Result<Self, WorkerError> {
        let handle = thread::Builder::new()
            .name(format!("rotcheck-{}", id))
            .spawn(move || worker_loop(id, job, queue, results, stats))
            .map_err(|e| WorkerError::InitFailed {
                id,
                reason: e.to_string(),
            })?;

        Ok(Self {
            id,
            handle: Some(handle),
        })
    }

    pub fn id(&self) -> usize {
        self.id
    }

    /// Wait for the worker to finish
    pub fn join(mut self) -> Result<(), WorkerError> {
        match self.handle.take() {
            Some(handle) => handle.join().map_err(|payload| WorkerError::Panicked {
                id: self.id,
                message: panic_message(payload.as_ref()),
            }),
            None => Ok(()),
        }
    }
}

fn worker_loop(
    id: usize,
    job: PassJob,
    queue: WorkQueueReceiver,
    results: Sender<DirReport>,
    stats: Arc<RunStats>,
) {
    info!(worker = id, mode = %job.mode, "Worker starting");

    let ctx = PassContext::new(&stats, job.narrate);
    let mut processed = 0u64;

    while let Some(task) = queue.recv() {
        let mut manifest = task.manifest;
        let outcome = process_directory(&mut manifest, job.mode, &ctx);
        stats.incr_directories();
        processed += 1;

        let report = match outcome {
            Ok(state) => {
                debug!(worker = id, path = %manifest.path().display(), state = %state, "Directory processed");
                DirReport {
                    manifest,
                    state,
                    error: None,
                }
            }
            Err(e) => {
                error!(worker = id, path = %manifest.path().display(), error = %e, "Directory failed");
                DirReport {
                    manifest,
                    state: DirState::Failed,
                    error: Some(e),
                }
            }
        };

        if results.send(report).is_err() {
            warn!(worker = id, "Result channel closed, stopping");
            break;
        }
    }

    info!(worker = id, dirs = processed, "Worker shutting down");
}

/// Run one pass of `mode` over a single directory
pub fn process_directory(
    manifest: &mut DirectoryManifest,
    mode: Mode,
    ctx: &PassContext<'_>,
) -> ManifestResult<DirState> {
    match mode {
        Mode::Verify => manifest.verify(ctx),
        Mode::Update => manifest.update(ctx),
        Mode::AddOnly => manifest.add(ctx),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "Worker thread panicked".into()
    }
}
