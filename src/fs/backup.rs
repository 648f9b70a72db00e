//! Backup naming and move-aside helpers for files the installer replaces.
//!
//! A backup lives next to the file it preserves as `.<name>.<tag>.<millis>.bak`
//! so that restoring it is a same-directory rename.
use std::fs;
use std::path::{Path, PathBuf};

use super::atomic::fsync_parent_dir;

/// Compute a timestamped backup path for `target` using `tag`.
#[must_use]
pub fn backup_path_with_tag(target: &Path, tag: &str) -> PathBuf {
    use std::time::{SystemTime, UNIX_EPOCH};
    let name = target
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("backup");
    let parent = target.parent().unwrap_or_else(|| Path::new("."));
    let ts = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis();
    parent.join(format!(".{name}.{tag}.{ts}.bak"))
}

/// Rename `target` to a fresh backup path and return that path.
///
/// Never overwrites an earlier backup of the same file: a collision within the
/// same millisecond gets a numeric suffix.
///
/// # Errors
///
/// Returns an IO error if the rename or the parent fsync fails.
pub fn move_aside(target: &Path, tag: &str) -> std::io::Result<PathBuf> {
    let base = backup_path_with_tag(target, tag);
    let mut candidate = base.clone();
    let mut n = 1u32;
    while fs::symlink_metadata(&candidate).is_ok() {
        candidate = PathBuf::from(format!("{}.{n}", base.display()));
        n += 1;
    }
    fs::rename(target, &candidate)?;
    fsync_parent_dir(target)?;
    Ok(candidate)
}

/// Put a backup produced by [`move_aside`] back over `target`.
///
/// # Errors
///
/// Returns an IO error if the backup is gone or the rename fails.
pub fn restore_from(backup: &Path, target: &Path) -> std::io::Result<()> {
    fs::rename(backup, target)?;
    fsync_parent_dir(target)
}
