//! Error types raised by target-environment adapters.
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// High-level error categories for environment operations and adapters.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    #[error("not found")]
    NotFound,
    #[error("permission denied")]
    PermissionDenied,
    #[error("disk full")]
    DiskFull,
    #[error("missing source file")]
    MissingSource,
    #[error("cancelled")]
    Cancelled,
    #[error("locking")]
    Locking,
    #[error("io error")]
    Io,
}

/// Structured error with a kind and human message.
#[derive(Debug, Clone, Error)]
#[error("{kind}: {msg}")]
pub struct Error {
    pub kind: ErrorKind,
    pub msg: String,
}

impl Error {
    pub fn new(kind: ErrorKind, msg: impl Into<String>) -> Self {
        Self {
            kind,
            msg: msg.into(),
        }
    }

    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self.kind, ErrorKind::NotFound | ErrorKind::MissingSource)
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        let kind = classify_io(&e);
        Error {
            kind,
            msg: e.to_string(),
        }
    }
}

/// Map an io error onto the adapter taxonomy. ENOSPC/EDQUOT count as disk full.
#[must_use]
pub fn classify_io(e: &std::io::Error) -> ErrorKind {
    use std::io::ErrorKind as K;
    match e.raw_os_error() {
        Some(code) if code == libc::ENOSPC => return ErrorKind::DiskFull,
        #[cfg(unix)]
        Some(code) if code == libc::EDQUOT => return ErrorKind::DiskFull,
        _ => {}
    }
    match e.kind() {
        K::NotFound => ErrorKind::NotFound,
        K::PermissionDenied => ErrorKind::PermissionDenied,
        K::StorageFull => ErrorKind::DiskFull,
        _ => ErrorKind::Io,
    }
}

/// Convenient alias for results returning a `types::Error`.
pub type Result<T> = std::result::Result<T, Error>;
