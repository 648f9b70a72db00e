pub mod env;
pub mod launch;
pub mod local;
pub mod lock;

pub use env::{CopyOutcome, Placed, ShortcutRequest, TargetEnv};
pub use launch::{Launcher, ProcessLauncher};
pub use local::LocalEnv;
pub use lock::file::FileLockManager;
pub use lock::{LockGuard, LockManager};
