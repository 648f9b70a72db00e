//! `TargetEnv` backed by the local filesystem.
//!
//! Shortcuts are freedesktop `.desktop` entries and uninstall records are JSON
//! documents under `<state>/records/`. Anything replaced (an existing payload
//! file, shortcut or record) is moved aside to a tagged backup first so the
//! write can be undone.
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;

use super::env::{CopyOutcome, Placed, ShortcutRequest, TargetEnv};
use crate::constants::{DEFAULT_BACKUP_TAG, RECORDS_DIR, RECORD_SCHEMA};
use crate::fs::{
    copy_staged, file_stem_for, fsync_parent_dir, modified_of, move_aside, restore_from,
    write_atomic,
};
use crate::types::errors::{Error, ErrorKind, Result};
use crate::types::{OverwritePolicy, UninstallRecord};

#[derive(Clone, Debug)]
pub struct LocalEnv {
    install_root: PathBuf,
    start_menu: PathBuf,
    desktop: PathBuf,
    state_dir: PathBuf,
    backup_tag: String,
}

impl LocalEnv {
    /// Lay every location out below `root`; used for sandboxes and tests.
    #[must_use]
    pub fn rooted(root: &Path) -> Self {
        Self {
            install_root: root.join("Program Files"),
            start_menu: root.join("Start Menu").join("Programs"),
            desktop: root.join("Desktop"),
            state_dir: root.join(".setupkit"),
            backup_tag: DEFAULT_BACKUP_TAG.to_string(),
        }
    }

    /// Use the invoking user's directories.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` when no home directory can be determined.
    pub fn for_current_user() -> Result<Self> {
        let base = directories::BaseDirs::new()
            .ok_or_else(|| Error::new(ErrorKind::NotFound, "no home directory for current user"))?;
        let desktop = directories::UserDirs::new()
            .and_then(|u| u.desktop_dir().map(Path::to_path_buf))
            .unwrap_or_else(|| base.home_dir().join("Desktop"));
        let state_dir = directories::ProjectDirs::from("dev", "setupkit", "setupkit")
            .map_or_else(
                || base.data_local_dir().join("setupkit"),
                |p| p.data_local_dir().to_path_buf(),
            );
        Ok(Self {
            install_root: base.data_local_dir().join("Programs"),
            start_menu: base.data_dir().join("applications"),
            desktop,
            state_dir,
            backup_tag: DEFAULT_BACKUP_TAG.to_string(),
        })
    }

    #[must_use]
    pub fn with_backup_tag(mut self, tag: impl Into<String>) -> Self {
        self.backup_tag = tag.into();
        self
    }

    fn record_path(&self, app_name: &str) -> PathBuf {
        self.state_dir
            .join(RECORDS_DIR)
            .join(format!("{}.json", file_stem_for(app_name)))
    }

    /// Write `bytes` to `path`, creating parents and backing up a previous file.
    /// A file that already holds `bytes` is left in place.
    fn place(&self, path: &Path, bytes: &[u8]) -> Result<Placed> {
        if fs::read(path).is_ok_and(|cur| cur == bytes) {
            return Ok(Placed {
                path: path.to_path_buf(),
                unchanged: true,
                ..Placed::default()
            });
        }
        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        let created_dirs = self.make_dir(dir)?;
        let backup = if fs::symlink_metadata(path).is_ok() {
            match move_aside(path, &self.backup_tag) {
                Ok(b) => Some(b),
                Err(e) => {
                    undo_dirs(&created_dirs);
                    return Err(e.into());
                }
            }
        } else {
            None
        };
        if let Err(e) = write_atomic(path, bytes) {
            return Err(match &backup {
                Some(b) => put_back(b, path, e),
                None => {
                    undo_dirs(&created_dirs);
                    e.into()
                }
            });
        }
        Ok(Placed {
            path: path.to_path_buf(),
            created_dirs,
            backup,
            unchanged: false,
        })
    }
}

/// Move `backup` back over `path` after a failed write. When that fails too the
/// returned error names where the previous content now lives.
fn put_back(backup: &Path, path: &Path, cause: std::io::Error) -> Error {
    match restore_from(backup, path) {
        Ok(()) => cause.into(),
        Err(re) => {
            log::error!(
                "local: failed to restore {} from {}: {re}",
                path.display(),
                backup.display()
            );
            Error::new(
                ErrorKind::Io,
                format!(
                    "write {} failed ({cause}); previous content left at {}",
                    path.display(),
                    backup.display()
                ),
            )
        }
    }
}

fn undo_dirs(created: &[PathBuf]) {
    for d in created.iter().rev() {
        let _ = fs::remove_dir(d);
    }
}

fn remove_node(path: &Path) -> Result<()> {
    fs::remove_file(path)?;
    fsync_parent_dir(path)?;
    Ok(())
}

/// Quote one argument of a desktop-entry `Exec` line.
fn exec_quote(arg: &str) -> String {
    let reserved = |c: char| c.is_whitespace() || "\"'\\><~|&;$*?#()`".contains(c);
    if !arg.is_empty() && !arg.contains(reserved) {
        return arg.to_string();
    }
    let mut out = String::with_capacity(arg.len() + 2);
    out.push('"');
    for c in arg.chars() {
        if matches!(c, '"' | '`' | '$' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
    out
}

fn desktop_entry(req: &ShortcutRequest<'_>) -> String {
    let mut exec = exec_quote(&req.target.to_string_lossy());
    for a in req.args {
        exec.push(' ');
        exec.push_str(&exec_quote(a));
    }
    let mut s = String::from("[Desktop Entry]\nType=Application\n");
    s.push_str(&format!("Name={}\n", req.name));
    s.push_str(&format!("Exec={exec}\n"));
    if let Some(dir) = req.target.parent() {
        s.push_str(&format!("Path={}\n", dir.display()));
    }
    if let Some(c) = req.comment {
        s.push_str(&format!("Comment={c}\n"));
    }
    s
}

#[derive(Serialize)]
struct RecordDoc<'a> {
    schema: &'static str,
    #[serde(flatten)]
    record: &'a UninstallRecord,
}

impl TargetEnv for LocalEnv {
    fn resolve_install_root(&self) -> PathBuf {
        self.install_root.clone()
    }

    fn resolve_group_path(&self, name: &str) -> PathBuf {
        let mut p = self.start_menu.clone();
        for part in name.split(['\\', '/']).filter(|s| !s.is_empty() && *s != "." && *s != "..") {
            p.push(part);
        }
        p
    }

    fn resolve_desktop_path(&self) -> PathBuf {
        self.desktop.clone()
    }

    fn resolve_state_dir(&self) -> PathBuf {
        self.state_dir.clone()
    }

    fn make_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        let mut missing = Vec::new();
        let mut cur = Some(path);
        while let Some(p) = cur {
            if fs::symlink_metadata(p).is_ok() {
                break;
            }
            missing.push(p.to_path_buf());
            cur = p.parent();
        }
        missing.reverse();
        let mut created = Vec::with_capacity(missing.len());
        for d in missing {
            if let Err(e) = fs::create_dir(&d) {
                undo_dirs(&created);
                return Err(e.into());
            }
            created.push(d);
        }
        if let Some(last) = created.last() {
            fsync_parent_dir(last)?;
        } else if !path.is_dir() {
            return Err(Error::new(
                ErrorKind::Io,
                format!("{} exists and is not a directory", path.display()),
            ));
        }
        Ok(created)
    }

    fn copy_file(&self, src: &Path, dst: &Path, policy: OverwritePolicy) -> Result<CopyOutcome> {
        let Some(src_mtime) = modified_of(src) else {
            return Err(Error::new(
                ErrorKind::MissingSource,
                format!("source {} is missing", src.display()),
            ));
        };
        let exists = fs::symlink_metadata(dst).is_ok();
        if exists {
            match policy {
                OverwritePolicy::Never => return Ok(CopyOutcome::Skipped),
                OverwritePolicy::IfNewer => {
                    if modified_of(dst).is_some_and(|d| src_mtime <= d) {
                        return Ok(CopyOutcome::Skipped);
                    }
                }
                OverwritePolicy::Always => {}
            }
        }
        let backup = if exists {
            Some(move_aside(dst, &self.backup_tag)?)
        } else {
            None
        };
        if let Err(e) = copy_staged(src, dst) {
            if let Some(b) = &backup {
                if let Err(re) = restore_from(b, dst) {
                    log::error!(
                        "local: failed to restore {} from {}: {re}",
                        dst.display(),
                        b.display()
                    );
                }
            }
            return Err(e.into());
        }
        Ok(CopyOutcome::Copied { backup })
    }

    fn create_shortcut(&self, req: &ShortcutRequest<'_>) -> Result<Placed> {
        let path = req.location.dir.join(format!("{}.desktop", req.name));
        self.place(&path, desktop_entry(req).as_bytes())
    }

    fn write_uninstall_record(&self, record: &UninstallRecord) -> Result<Placed> {
        let doc = RecordDoc {
            schema: RECORD_SCHEMA,
            record,
        };
        let bytes = serde_json::to_vec_pretty(&doc)
            .map_err(|e| Error::new(ErrorKind::Io, format!("serialize record: {e}")))?;
        self.place(&self.record_path(&record.app_name), &bytes)
    }

    fn remove_file(&self, path: &Path) -> Result<()> {
        remove_node(path)
    }

    fn restore_backup(&self, backup: &Path, dst: &Path) -> Result<()> {
        if fs::symlink_metadata(dst).is_ok() {
            remove_node(dst)?;
        }
        restore_from(backup, dst)?;
        Ok(())
    }

    fn remove_dir_if_empty(&self, path: &Path) -> Result<bool> {
        if fs::read_dir(path)?.next().is_some() {
            return Ok(false);
        }
        fs::remove_dir(path)?;
        fsync_parent_dir(path)?;
        Ok(true)
    }

    fn remove_shortcut(&self, path: &Path) -> Result<()> {
        remove_node(path)
    }

    fn remove_uninstall_record(&self, path: &Path) -> Result<()> {
        remove_node(path)
    }
}
