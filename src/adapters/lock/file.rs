use std::fs::{File, OpenOptions};
use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};

use fs2::FileExt;

use crate::constants::LOCK_POLL_MS;
use crate::types::errors::{Error, ErrorKind, Result};

use super::{LockGuard, LockManager};

/// Advisory lock on a file in the state directory, shared by every installer process.
#[derive(Debug)]
pub struct FileLockManager {
    path: PathBuf,
}

impl FileLockManager {
    #[must_use]
    pub const fn new(path: PathBuf) -> Self {
        Self { path }
    }

    fn open(&self) -> Result<File> {
        if let Some(dir) = self.path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        Ok(OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&self.path)?)
    }
}

/// Held lock; released on drop. The lock file itself stays in place.
struct HeldLock {
    file: File,
    path: PathBuf,
}

impl Drop for HeldLock {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            log::warn!("lock: releasing {} failed: {e}", self.path.display());
        }
    }
}

impl LockGuard for HeldLock {}

impl LockManager for FileLockManager {
    fn acquire_process_lock(&self, timeout_ms: u64) -> Result<Box<dyn LockGuard>> {
        let deadline = Instant::now() + Duration::from_millis(timeout_ms);
        let file = self.open()?;
        let mut last_err = match file.try_lock_exclusive() {
            Ok(()) => return Ok(self.held(file)),
            Err(e) => e,
        };
        log::debug!("lock: {} is busy, waiting up to {timeout_ms}ms", self.path.display());
        while Instant::now() < deadline {
            thread::sleep(Duration::from_millis(LOCK_POLL_MS));
            match file.try_lock_exclusive() {
                Ok(()) => return Ok(self.held(file)),
                Err(e) => last_err = e,
            }
        }
        Err(Error::new(
            ErrorKind::Locking,
            format!(
                "{} still held after {timeout_ms}ms: {last_err}",
                self.path.display()
            ),
        ))
    }
}

impl FileLockManager {
    fn held(&self, file: File) -> Box<dyn LockGuard> {
        Box::new(HeldLock {
            file,
            path: self.path.clone(),
        })
    }
}
