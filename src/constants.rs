//! Shared crate-wide constants for setupkit.
//!
//! Centralizes magic values and default labels used across modules.
//! Adjusting these here will propagate through the crate.

/// Default logical tag used for naming backups of overwritten files.
/// Example filename: `.<name>.<tag>.<millis>.bak` next to the replaced file.
pub const DEFAULT_BACKUP_TAG: &str = "setupkit";

/// Temporary filename suffix used while staging a copy inside its destination directory.
/// The temporary name is constructed as `.{fname}.{pid}.{ctr}{TMP_SUFFIX}`.
pub const TMP_SUFFIX: &str = ".setupkit.tmp";

/// File extension of uninstall logs written under the state directory.
pub const UNINSTALL_LOG_EXT: &str = "uninstall.jsonl";

/// Subdirectory of the state directory holding uninstall records.
pub const RECORDS_DIR: &str = "records";

/// Name of the process lock file inside the state directory.
pub const LOCK_FILE_NAME: &str = "setupkit.lock";

/// Poll interval in milliseconds for the file-backed lock manager (see `adapters/lock/file.rs`).
pub const LOCK_POLL_MS: u64 = 25;

/// Default lock timeout used by `Installer::new()` unless overridden by `with_lock_timeout_ms()`.
pub const DEFAULT_LOCK_TIMEOUT_MS: u64 = 5_000;

/// UUIDv5 namespace tag for deterministic plan/step IDs.
pub const NS_TAG: &str = "https://setupkit.dev/plan";

/// Schema version stamped on every uninstall log entry.
pub const LOG_SCHEMA: &str = "uninstall_log.v1";

/// Schema version stamped on uninstall records.
pub const RECORD_SCHEMA: &str = "uninstall_record.v1";

/// Placeholders accepted in `Files`/`Icons`/`Run` templates.
pub const ENTRY_PLACEHOLDERS: &[&str] = &[
    "app",
    "group",
    "userdesktop",
    "commondesktop",
    "autodesktop",
    "desktop",
];

/// Placeholders accepted only at the head of `DefaultDirName`.
pub const ROOT_PLACEHOLDERS: &[&str] = &["pf", "autopf", "commonpf"];
