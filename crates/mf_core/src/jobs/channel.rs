//! Progress and cancellation channels.
//!
//! The engine reports `done total` after every unit of work and polls a
//! cancellation flag once per outer iteration. The file channel exposes both
//! through the job's output directory so another process can watch it; the
//! memory channel is for callers in the same process.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// Progress file written during a bank sweep.
pub const SWEEP_PROGRESS_FILE: &str = "00_progress_mf.dat";
/// Progress file written during a batch build.
pub const BUILD_PROGRESS_FILE: &str = "00_progress_create.dat";
/// Sentinel that requests cancellation.
pub const CANCEL_SENTINEL: &str = "canceled.txt";

/// Units of work done out of a total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Progress {
    pub done: u64,
    pub total: u64,
}

impl Progress {
    pub fn new(done: u64, total: u64) -> Self {
        Self { done, total }
    }

    pub fn is_finished(&self) -> bool {
        self.done >= self.total
    }

    /// Completed share in `[0, 1]`.
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            1.0
        } else {
            (self.done as f64 / self.total as f64).min(1.0)
        }
    }
}

/// Where a job publishes progress and learns about cancellation.
pub trait JobChannel: Send + Sync {
    /// Publish the current progress.
    fn report(&self, progress: Progress) -> io::Result<()>;

    /// Whether cancellation has been requested.
    fn is_cancel_requested(&self) -> bool;

    /// Clear the request once the job has stopped for it.
    fn acknowledge_cancel(&self) -> io::Result<()>;
}

/// Progress file and cancel sentinel in a job's output directory.
#[derive(Debug, Clone)]
pub struct FileChannel {
    progress_path: PathBuf,
    sentinel_path: PathBuf,
}

impl FileChannel {
    pub fn new(dir: &Path, progress_file: &str) -> Self {
        Self {
            progress_path: dir.join(progress_file),
            sentinel_path: dir.join(CANCEL_SENTINEL),
        }
    }

    pub fn for_sweep(dir: &Path) -> Self {
        Self::new(dir, SWEEP_PROGRESS_FILE)
    }

    pub fn for_build(dir: &Path) -> Self {
        Self::new(dir, BUILD_PROGRESS_FILE)
    }

    pub fn progress_path(&self) -> &Path {
        &self.progress_path
    }

    pub fn sentinel_path(&self) -> &Path {
        &self.sentinel_path
    }
}

impl JobChannel for FileChannel {
    fn report(&self, progress: Progress) -> io::Result<()> {
        if let Some(parent) = self.progress_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let temp = self.progress_path.with_extension("dat.tmp");
        fs::write(&temp, format!("{} {}\n", progress.done, progress.total))?;
        fs::rename(&temp, &self.progress_path)
    }

    fn is_cancel_requested(&self) -> bool {
        self.sentinel_path.exists()
    }

    fn acknowledge_cancel(&self) -> io::Result<()> {
        match fs::remove_file(&self.sentinel_path) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }
}

/// Read a progress file. `None` if the job has not started or the file is
/// unreadable.
pub fn read_progress(path: &Path) -> Option<Progress> {
    let content = fs::read_to_string(path).ok()?;
    let mut parts = content.split_whitespace().map(str::parse::<u64>);
    match (parts.next(), parts.next()) {
        (Some(Ok(done)), Some(Ok(total))) => Some(Progress { done, total }),
        _ => None,
    }
}

/// Ask the job writing into `dir` to stop at its next check.
pub fn request_cancel(dir: &Path) -> io::Result<PathBuf> {
    let path = dir.join(CANCEL_SENTINEL);
    fs::write(&path, "")?;
    Ok(path)
}

/// Shared flag for cancelling an in-process job.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle {
    flag: Arc<AtomicBool>,
}

impl CancelHandle {
    /// The job stops at its next check.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// In-process channel that records every report.
#[derive(Debug, Clone, Default)]
pub struct MemoryChannel {
    cancel: CancelHandle,
    reports: Arc<Mutex<Vec<Progress>>>,
}

impl MemoryChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Most recent report, if any.
    pub fn latest(&self) -> Option<Progress> {
        self.reports.lock().last().copied()
    }

    pub fn reports(&self) -> Vec<Progress> {
        self.reports.lock().clone()
    }
}

impl JobChannel for MemoryChannel {
    fn report(&self, progress: Progress) -> io::Result<()> {
        self.reports.lock().push(progress);
        Ok(())
    }

    fn is_cancel_requested(&self) -> bool {
        self.cancel.is_cancelled()
    }

    fn acknowledge_cancel(&self) -> io::Result<()> {
        self.cancel.flag.store(false, Ordering::SeqCst);
        Ok(())
    }
}
