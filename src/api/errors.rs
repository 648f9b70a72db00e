use std::path::PathBuf;

use crate::types::errors::{Error, ErrorKind};
use crate::types::{ReversalFailure, SkippedEntry, StepKind};

/// The environment resolved a location the planner cannot build on.
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum PlanError {
    #[error("install root {0} is not absolute")]
    RelativeRoot(PathBuf),
    #[error("{what} resolved to unusable path {path}")]
    UnsafePath { what: &'static str, path: PathBuf },
}

/// A step failed (or the run could not start). Rollback has already run.
#[derive(Debug)]
pub struct InstallError {
    /// `None` when the run failed before its first step (locking).
    pub at_step: Option<StepKind>,
    pub step_index: Option<usize>,
    pub path: Option<PathBuf>,
    pub cause: Error,
    /// Log entries reversed by the automatic rollback.
    pub rolled_back: usize,
    pub rollback_errors: Vec<ReversalFailure>,
}

impl InstallError {
    pub(crate) fn before_start(cause: Error) -> Self {
        Self {
            at_step: None,
            step_index: None,
            path: None,
            cause,
            rolled_back: 0,
            rollback_errors: Vec::new(),
        }
    }

    /// True when rollback left applied steps behind.
    #[must_use]
    pub fn rollback_incomplete(&self) -> bool {
        !self.rollback_errors.is_empty()
    }

    #[must_use]
    pub fn error_id(&self) -> ErrorId {
        if self.cause.kind == ErrorKind::Locking {
            ErrorId::E_LOCKING
        } else if self.rollback_incomplete() {
            ErrorId::E_ROLLBACK
        } else {
            ErrorId::E_INSTALL
        }
    }
}

impl std::fmt::Display for InstallError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut s = match (self.at_step, self.step_index) {
            (Some(kind), Some(idx)) => format!("install failed at step {idx} ({kind})"),
            _ => "install failed before the first step".to_string(),
        };
        if let Some(p) = &self.path {
            s.push_str(&format!(" on {}", p.display()));
        }
        s.push_str(&format!(": {}", self.cause));
        if self.rollback_incomplete() {
            s.push_str(&format!(
                "; rollback incomplete ({} entries left)",
                self.rollback_errors.len()
            ));
        }
        f.write_str(&s)
    }
}

impl std::error::Error for InstallError {}

/// A reversal failed; the log still holds the entries not yet reversed.
#[derive(Debug, thiserror::Error)]
#[error("uninstall halted at log entry {at_entry} ({}): {cause}", path.display())]
pub struct UninstallError {
    pub at_entry: u64,
    pub path: PathBuf,
    pub cause: Error,
    pub reversed: usize,
    pub skipped: Vec<SkippedEntry>,
}

impl UninstallError {
    #[must_use]
    pub fn error_id(&self) -> ErrorId {
        if self.cause.kind == ErrorKind::Locking {
            ErrorId::E_LOCKING
        } else {
            ErrorId::E_UNINSTALL
        }
    }
}

/// Non-fatal: the post-install program could not be started.
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
#[error("could not launch {}: {msg}", program.display())]
pub struct RunnerWarning {
    pub program: PathBuf,
    pub msg: String,
}

// Stable identifiers attached to failure facts and mapped to process exit codes.
#[allow(non_camel_case_types, reason = "Error IDs are emitted verbatim in facts")]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorId {
    E_VALIDATION,
    E_INSTALL,
    E_ROLLBACK,
    E_UNINSTALL,
    E_LOCKING,
    E_GENERIC,
}

#[must_use]
pub const fn id_str(id: ErrorId) -> &'static str {
    match id {
        ErrorId::E_VALIDATION => "E_VALIDATION",
        ErrorId::E_INSTALL => "E_INSTALL",
        ErrorId::E_ROLLBACK => "E_ROLLBACK",
        ErrorId::E_UNINSTALL => "E_UNINSTALL",
        ErrorId::E_LOCKING => "E_LOCKING",
        ErrorId::E_GENERIC => "E_GENERIC",
    }
}

#[must_use]
pub const fn exit_code_for(id: ErrorId) -> i32 {
    match id {
        ErrorId::E_VALIDATION => 10,
        ErrorId::E_INSTALL => 20,
        ErrorId::E_ROLLBACK => 21,
        ErrorId::E_UNINSTALL => 30,
        ErrorId::E_LOCKING => 40,
        ErrorId::E_GENERIC => 1,
    }
}
