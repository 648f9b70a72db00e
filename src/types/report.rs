use std::path::PathBuf;

use serde::Serialize;
use uuid::Uuid;

use super::errors::ErrorKind;
use super::plan::InstallStep;

#[derive(Clone, Debug, Default, Serialize)]
pub struct InstallReport {
    pub executed: Vec<InstallStep>,
    pub applied_count: usize,
    /// Copies that actually wrote content into the destination.
    pub files_changed: usize,
    /// Copies skipped by their overwrite policy.
    pub files_skipped: usize,
    pub duration_ms: u64,
    pub plan_uuid: Option<Uuid>,
    pub dry_run: bool,
}

/// A log entry the uninstall engine passed over because its target was already gone.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SkippedEntry {
    pub seq: u64,
    pub path: PathBuf,
    pub reason: SkipReason,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    Missing,
    /// File flagged to survive uninstall.
    Kept,
    /// Directory still holds foreign content.
    NotEmpty,
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct UninstallReport {
    pub reversed: usize,
    pub skipped: Vec<SkippedEntry>,
    pub duration_ms: u64,
}

/// Failure recorded while reversing a single log entry.
#[derive(Clone, Debug, Serialize)]
pub struct ReversalFailure {
    pub seq: u64,
    pub path: PathBuf,
    pub kind: ErrorKind,
    pub msg: String,
}
