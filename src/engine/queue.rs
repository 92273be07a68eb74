//! Pre-sized work queue for directory tasks
//!
//! The queue is filled completely before any worker starts and then closed,
//! so sends never block and workers simply drain it until it is empty.

use crate::error::WorkerError;
use crate::manifest::DirectoryManifest;
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// A directory handed to exactly one worker
#[derive(Debug)]
pub struct DirTask {
    /// Manifest of the directory, owned by the worker while it is processed
    pub manifest: DirectoryManifest,
}

impl DirTask {
    pub fn new(manifest: DirectoryManifest) -> Self {
        Self { manifest }
    }
}

/// Statistics for the work queue
#[derive(Debug, Default)]
pub struct QueueStats {
    /// Total tasks enqueued
    pub enqueued: AtomicU64,

    /// Total tasks dequeued
    pub dequeued: AtomicU64,
}

impl QueueStats {
    pub fn enqueued(&self) -> u64 {
        self.enqueued.load(Ordering::Relaxed)
    }

    pub fn dequeued(&self) -> u64 {
        self.dequeued.load(Ordering::Relaxed)
    }
}

/// Bounded queue sized to the number of directories in a pass
pub struct WorkQueue {
    sender: Sender<DirTask>,
    receiver: Receiver<DirTask>,
    stats: Arc<QueueStats>,
}

impl WorkQueue {
    /// Create a queue able to hold `capacity` tasks without blocking
    pub fn new(capacity: usize) -> Self {
        let (sender, receiver) = bounded(capacity.max(1));

        Self {
            sender,
            receiver,
            stats: Arc::new(QueueStats::default()),
        }
    }

    /// Enqueue a task; fails instead of blocking when the queue is full
    pub fn push(&self, task: DirTask) -> Result<(), WorkerError> {
        match self.sender.try_send(task) {
            Ok(()) => {
                self.stats.enqueued.fetch_add(1, Ordering::Relaxed);
                Ok(())
            }
            Err(TrySendError::Full(_)) | Err(TrySendError::Disconnected(_)) => {
                Err(WorkerError::QueueSendFailed)
            }
        }
    }

    /// Close the queue for sending and return the shared receiver
    pub fn close(self) -> WorkQueueReceiver {
        drop(self.sender);
        WorkQueueReceiver {
            receiver: self.receiver,
            stats: self.stats,
        }
    }

}

/// Receiving side of a closed queue (clone for each worker)
#[derive(Clone)]
pub struct WorkQueueReceiver {
    receiver: Receiver<DirTask>,
    stats: Arc<QueueStats>,
}

impl WorkQueueReceiver {
    /// Take the next task, or `None` once the closed queue is drained
    pub fn recv(&self) -> Option<DirTask> {
        match self.receiver.recv() {
            Ok(task) => {
                self.stats.dequeued.fetch_add(1, Ordering::Relaxed);
                Some(task)
            }
            Err(_) => None,
        }
    }

    /// Take every task still queued without blocking
    pub fn drain(&self) -> Vec<DirTask> {
        let tasks: Vec<DirTask> = self.receiver.try_iter().collect();
        self.stats
            .dequeued
            .fetch_add(tasks.len() as u64, Ordering::Relaxed);
        tasks
    }

    pub fn stats(&self) -> Arc<QueueStats> {
        Arc::clone(&self.stats)
    }
}
