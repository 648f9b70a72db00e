//! Durable, append-only uninstall log.
//!
//! Each applied install step is written as one JSON line holding the step and
//! the reversal descriptor the executor derived from what the environment
//! actually did. The file is synced after every append, so after a crash it
//! lists at most the steps that were applied. A torn trailing line (partial
//! write) is dropped on open.
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::constants::LOG_SCHEMA;
use crate::fs::write_atomic;
use crate::types::errors::{Error, ErrorKind, Result};
use crate::types::InstallStep;

/// How to undo one applied step.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Reversal {
    /// Directories the step created, outermost first.
    RemoveDirs { dirs: Vec<PathBuf> },
    RemoveFile {
        path: PathBuf,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        backup: Option<PathBuf>,
        #[serde(default)]
        keep_on_uninstall: bool,
    },
    /// The step changed nothing (copy skipped by policy).
    Nothing { path: PathBuf },
    RemoveShortcut {
        path: PathBuf,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        backup: Option<PathBuf>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        created_dirs: Vec<PathBuf>,
    },
    EraseRecord {
        path: PathBuf,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        backup: Option<PathBuf>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        created_dirs: Vec<PathBuf>,
    },
}

impl Reversal {
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Reversal::RemoveDirs { dirs } => dirs.last().map_or(Path::new(""), PathBuf::as_path),
            Reversal::RemoveFile { path, .. }
            | Reversal::Nothing { path }
            | Reversal::RemoveShortcut { path, .. }
            | Reversal::EraseRecord { path, .. } => path,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub schema: String,
    pub seq: u64,
    pub plan_id: String,
    pub step_id: String,
    pub step: InstallStep,
    pub reversal: Reversal,
    pub ts: String,
}

impl LogEntry {
    #[must_use]
    pub fn new(
        seq: u64,
        plan_id: String,
        step_id: String,
        step: InstallStep,
        reversal: Reversal,
        ts: String,
    ) -> Self {
        Self {
            schema: LOG_SCHEMA.to_string(),
            seq,
            plan_id,
            step_id,
            step,
            reversal,
            ts,
        }
    }
}

#[derive(Debug)]
pub struct UninstallLog {
    path: PathBuf,
    entries: Vec<LogEntry>,
    file: Option<File>,
    sync: bool,
    /// Directories the first append had to create, outermost first.
    created_dirs: Vec<PathBuf>,
}

fn corrupt(path: &Path, line: usize, e: &serde_json::Error) -> Error {
    Error::new(
        ErrorKind::Io,
        format!("{}: line {line} is not a log entry: {e}", path.display()),
    )
}

impl UninstallLog {
    /// Open the log at `path` for a new install run. Existing entries are kept
    /// and new ones continue their sequence. The file is created on first append.
    ///
    /// # Errors
    ///
    /// Returns an error if an existing file cannot be read or holds a corrupt entry.
    pub fn open_append(path: &Path) -> Result<Self> {
        let entries = match fs::read_to_string(path) {
            Ok(text) => Self::decode(path, &text)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e.into()),
        };
        Ok(Self {
            path: path.to_path_buf(),
            entries,
            file: None,
            sync: true,
            created_dirs: Vec::new(),
        })
    }

    /// Open an existing log for uninstall.
    ///
    /// # Errors
    ///
    /// `NotFound` if there is no log at `path`; otherwise read or decode failures.
    pub fn open(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            entries: Self::decode(path, &text)?,
            file: None,
            sync: true,
            created_dirs: Vec::new(),
        })
    }

    fn decode(path: &Path, text: &str) -> Result<Vec<LogEntry>> {
        let lines: Vec<(usize, &str)> = text
            .lines()
            .enumerate()
            .filter(|(_, l)| !l.trim().is_empty())
            .collect();
        let mut entries = Vec::with_capacity(lines.len());
        let mut torn = false;
        for (pos, (idx, line)) in lines.iter().enumerate() {
            match serde_json::from_str::<LogEntry>(line) {
                Ok(e) => entries.push(e),
                Err(e) if pos + 1 == lines.len() && !text.ends_with('\n') => {
                    log::warn!(
                        "journal: ignoring torn trailing line {} in {}: {e}",
                        idx + 1,
                        path.display()
                    );
                    torn = true;
                }
                Err(e) => return Err(corrupt(path, idx + 1, &e)),
            }
        }
        if torn {
            Self::rewrite(path, &entries)?;
        }
        Ok(entries)
    }

    fn rewrite(path: &Path, entries: &[LogEntry]) -> Result<()> {
        let mut buf = Vec::new();
        for e in entries {
            serde_json::to_writer(&mut buf, e)
                .map_err(|err| Error::new(ErrorKind::Io, err.to_string()))?;
            buf.push(b'\n');
        }
        write_atomic(path, &buf)?;
        Ok(())
    }

    /// Disable per-entry fsync (tests and non-durable policies).
    pub fn set_sync(&mut self, sync: bool) {
        self.sync = sync;
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    #[must_use]
    pub fn next_seq(&self) -> u64 {
        self.entries.last().map_or(1, |e| e.seq + 1)
    }

    /// Append `entry` and make it durable before returning.
    ///
    /// # Errors
    ///
    /// Returns an error if the line cannot be written or synced; the in-memory
    /// entries are left unchanged.
    pub fn append(&mut self, entry: LogEntry) -> Result<()> {
        let mut line = serde_json::to_vec(&entry)
            .map_err(|e| Error::new(ErrorKind::Io, format!("serialize log entry: {e}")))?;
        line.push(b'\n');
        if self.file.is_none() {
            if let Some(parent) = self.path.parent() {
                let missing: Vec<PathBuf> = parent
                    .ancestors()
                    .take_while(|d| {
                        !d.as_os_str().is_empty() && fs::symlink_metadata(d).is_err()
                    })
                    .map(Path::to_path_buf)
                    .collect();
                fs::create_dir_all(parent)?;
                self.created_dirs.extend(missing.into_iter().rev());
            }
            let f = OpenOptions::new().create(true).append(true).open(&self.path)?;
            self.file = Some(f);
        }
        if let Some(f) = self.file.as_mut() {
            f.write_all(&line)?;
            if self.sync {
                f.sync_data()?;
            }
        }
        self.entries.push(entry);
        Ok(())
    }

    /// Keep only the first `keep` entries, rewriting the file atomically.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be rewritten.
    pub fn truncate(&mut self, keep: usize) -> Result<()> {
        if keep >= self.entries.len() {
            return Ok(());
        }
        self.entries.truncate(keep);
        self.file = None;
        if self.entries.is_empty() {
            return self.discard();
        }
        Self::rewrite(&self.path, &self.entries)
    }

    /// Remove the log file and forget all entries. Directories this log created
    /// are removed too while they are empty.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be removed.
    pub fn discard(&mut self) -> Result<()> {
        self.entries.clear();
        self.file = None;
        match fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        while let Some(d) = self.created_dirs.pop() {
            if fs::remove_dir(&d).is_err() {
                self.created_dirs.clear();
                break;
            }
        }
        Ok(())
    }
}
