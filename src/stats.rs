//! Run statistics shared between workers
//!
//! A single lock guards the whole counter group. Updates are O(1) and rare
//! compared to the checksum work between them, so one lock is enough.

use parking_lot::Mutex;
use std::path::PathBuf;
use std::time::{Duration, Instant};

#[derive(Debug, Default)]
struct Counters {
    dir_count: usize,
    directories: usize,
    verified: u64,
    new: u64,
    updated: u64,
    failed: u64,
    bytes: u64,
    new_files: Vec<PathBuf>,
    updated_files: Vec<PathBuf>,
    failed_files: Vec<PathBuf>,
}

/// Thread-safe statistics for one verify/update pass
#[derive(Debug)]
pub struct RunStats {
    inner: Mutex<Counters>,
    start_time: Instant,
}

/// Point-in-time copy of [`RunStats`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// Expected number of directories
    pub dir_count: usize,

    /// Directories completed
    pub directories: usize,

    /// Files whose checksum matched
    pub verified: u64,

    /// Files recorded for the first time
    pub new: u64,

    /// Files whose checksum was replaced
    pub updated: u64,

    /// Files whose checksum did not match
    pub failed: u64,

    /// Bytes read through the digest
    pub bytes: u64,

    pub new_files: Vec<PathBuf>,
    pub updated_files: Vec<PathBuf>,
    pub failed_files: Vec<PathBuf>,
}

impl RunStats {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Counters::default()),
            start_time: Instant::now(),
        }
    }

    /// Time since these stats were created
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    pub fn set_dir_count(&self, count: usize) {
        self.inner.lock().dir_count = count;
    }

    pub fn incr_directories(&self) {
        self.inner.lock().directories += 1;
    }

    pub fn incr_verified(&self) {
        self.inner.lock().verified += 1;
    }

    pub fn incr_new(&self, path: PathBuf) {
        let mut inner = self.inner.lock();
        inner.new += 1;
        inner.new_files.push(path);
    }

    pub fn incr_updated(&self, path: PathBuf) {
        let mut inner = self.inner.lock();
        inner.updated += 1;
        inner.updated_files.push(path);
    }

    pub fn incr_failed(&self, path: PathBuf) {
        let mut inner = self.inner.lock();
        inner.failed += 1;
        inner.failed_files.push(path);
    }

    pub fn add_bytes(&self, bytes: u64) {
        self.inner.lock().bytes += bytes;
    }

    pub fn dir_count(&self) -> usize {
        self.inner.lock().dir_count
    }

    pub fn directories(&self) -> usize {
        self.inner.lock().directories
    }

    pub fn verified(&self) -> u64 {
        self.inner.lock().verified
    }

    pub fn new_count(&self) -> u64 {
        self.inner.lock().new
    }

    pub fn updated(&self) -> u64 {
        self.inner.lock().updated
    }

    pub fn failed(&self) -> u64 {
        self.inner.lock().failed
    }

    pub fn bytes(&self) -> u64 {
        self.inner.lock().bytes
    }

    pub fn new_files(&self) -> Vec<PathBuf> {
        self.inner.lock().new_files.clone()
    }

    pub fn updated_files(&self) -> Vec<PathBuf> {
        self.inner.lock().updated_files.clone()
    }

    pub fn failed_files(&self) -> Vec<PathBuf> {
        self.inner.lock().failed_files.clone()
    }

    /// True once every expected directory has been completed
    pub fn is_completed(&self) -> bool {
        let inner = self.inner.lock();
        inner.directories >= inner.dir_count
    }

    /// Consistent copy of every counter and list taken under one lock
    pub fn snapshot(&self) -> StatsSnapshot {
        let inner = self.inner.lock();
        StatsSnapshot {
            dir_count: inner.dir_count,
            directories: inner.directories,
            verified: inner.verified,
            new: inner.new,
            updated: inner.updated,
            failed: inner.failed,
            bytes: inner.bytes,
            new_files: inner.new_files.clone(),
            updated_files: inner.updated_files.clone(),
            failed_files: inner.failed_files.clone(),
        }
    }
}

impl Default for RunStats {
    fn default() -> Self {
        Self::new()
    }
}
