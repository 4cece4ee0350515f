//! Advisory workbook lock
//!
//! A `LOCK`-style sibling file next to the workbook is locked exclusively for
//! the whole load-mutate-save cycle of a guarded mutation. Waiting is bounded:
//! when the lock cannot be taken before the timeout the caller gets
//! `SheetError::Locked` instead of silently overwriting another writer.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use fs2::FileExt;

use crate::error::{SheetError, SheetResult};

const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Held exclusive lock on the workbook; released on drop
#[derive(Debug)]
pub struct WorkbookLock {
    path: PathBuf,
    file: File,
}

impl WorkbookLock {
    /// Acquire the lock, polling until `timeout` elapses
    pub fn acquire(path: &Path, timeout: Duration) -> SheetResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .map_err(|e| {
                SheetError::Io(format!("Failed to open lock file {}: {}", path.display(), e))
            })?;

        let deadline = Instant::now() + timeout;
        loop {
            if file.try_lock_exclusive().is_ok() {
                tracing::debug!(lock = %path.display(), "workbook lock acquired");
                return Ok(Self {
                    path: path.to_path_buf(),
                    file,
                });
            }
            if Instant::now() >= deadline {
                return Err(SheetError::Locked(format!(
                    "{} still held after {} ms",
                    path.display(),
                    timeout.as_millis()
                )));
            }
            thread::sleep(POLL_INTERVAL);
        }
    }

    /// Path of the lock file
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for WorkbookLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
        tracing::debug!(lock = %self.path.display(), "workbook lock released");
    }
}
