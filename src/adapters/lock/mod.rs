pub mod file;
use crate::types::errors::Result;

/// Held for the duration of a committing run; releases on drop.
pub trait LockGuard: Send {}

pub trait LockManager: Send + Sync {
    /// Acquire the installer process lock within `timeout_ms`.
    /// # Errors
    /// Returns `ErrorKind::Locking` if the lock cannot be acquired in time.
    fn acquire_process_lock(&self, timeout_ms: u64) -> Result<Box<dyn LockGuard>>;
}
