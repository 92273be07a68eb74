//! Progress reporting and console output
//!
//! Provides the live progress bar (indicatif), per-file narration lines and
//! the end-of-run summary.

use crate::engine::{Mode, RunResult};
use crate::stats::RunStats;
use console::style;
use humansize::{format_size, BINARY};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::warn;

/// How often the poller refreshes the bar
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Progress bar tracking completed directories against the expected count
pub struct ProgressReporter {
    bar: ProgressBar,
    stats: Arc<RunStats>,
    stop: Arc<AtomicBool>,
    poller: Option<JoinHandle<()>>,
}

impl ProgressReporter {
    /// Create the bar and start polling `stats` in the background
    pub fn start(stats: Arc<RunStats>) -> Self {
        let bar = ProgressBar::new(stats.dir_count() as u64);

        bar.set_style(
            ProgressStyle::default_bar()
                .template("{prefix} [{elapsed_precise}] [{bar:40.green/blue}] {pos}/{len} ({percent}%)")
                .expect("Invalid progress template")
                .progress_chars("=> "),
        );
        bar.set_prefix("Completed Sub Directories");

        let stop = Arc::new(AtomicBool::new(false));

        let poller = {
            let bar = bar.clone();
            let stats = Arc::clone(&stats);
            let stop = Arc::clone(&stop);

            thread::Builder::new()
                .name("rotcheck-progress".into())
                .spawn(move || loop {
                    bar.set_position(stats.directories() as u64);

                    if stats.is_completed() || stop.load(Ordering::SeqCst) {
                        break;
                    }

                    thread::sleep(POLL_INTERVAL);
                })
        };

        let poller = match poller {
            Ok(handle) => Some(handle),
            Err(e) => {
                warn!(error = %e, "Could not start progress thread");
                None
            }
        };

        Self {
            bar,
            stats,
            stop,
            poller,
        }
    }

    /// Stop polling and show the final count
    pub fn finish(mut self) {
        self.stop_poller();
        self.bar.set_position(self.stats.directories() as u64);
        self.bar.finish();
    }

    fn stop_poller(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.poller.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for ProgressReporter {
    fn drop(&mut self) {
        self.stop_poller();
    }
}

/// Print one narration line such as `failed: /data/a.txt`
pub fn print_finding(kind: &str, path: &Path) {
    let label = format!("{}:", kind);
    let label = match kind {
        "failed" => style(label).red().bold(),
        "new" => style(label).green(),
        "updated" => style(label).yellow(),
        _ => style(label),
    };
    println!("{} {}", label, path.display());
}

/// Print a deferred list of findings (used when the progress bar hid them)
pub fn print_file_list(kind: &str, files: &[PathBuf]) {
    for file in files {
        print_finding(kind, file);
    }
}

/// Format a number with thousands separators
fn format_number(n: u64) -> String {
    let s = n.to_string();
    let bytes: Vec<_> = s.bytes().rev().collect();

    let chunks: Vec<String> = bytes
        .chunks(3)
        .map(|chunk| {
            chunk
                .iter()
                .rev()
                .map(|&b| b as char)
                .collect::<String>()
        })
        .collect();

    chunks.into_iter().rev().collect::<Vec<_>>().join(",")
}

/// Print a summary of the pass
pub fn print_summary(result: &RunResult) {
    println!("{}", style("Summary:").bold());
    println!("    Root Directory: {}", result.root.display());
    println!("   Sub Directories: {}", format_number(result.total_dirs as u64));
    println!("    Files Verified: {}", format_number(result.verified));

    match result.mode {
        Mode::Verify => {
            let failed = format_number(result.failed);
            if result.failed > 0 {
                println!("      Files Failed: {}", style(failed).red().bold());
            } else {
                println!("      Files Failed: {}", failed);
            }
        }
        Mode::Update | Mode::AddOnly => {
            println!("       Files Added: {}", format_number(result.new));
            println!("     Files Changed: {}", format_number(result.updated));
        }
    }

    println!("  Data Checksummed: {}", format_size(result.bytes, BINARY));
    println!(
        "          Duration: {:.1}s",
        result.duration.as_secs_f64()
    );

    if !result.errors.is_empty() {
        println!();
        println!(
            "{} {} director{} could not be processed:",
            style("Errors:").yellow().bold(),
            result.errors.len(),
            if result.errors.len() == 1 { "y" } else { "ies" }
        );
        for err in &result.errors {
            println!("    {}", err);
        }
    }
}
