//! Staged writes: content lands in a temporary sibling, is synced, then renamed
//! over the final name and the parent directory is fsynced.
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::constants::TMP_SUFFIX;

// Global counter to produce unique temporary names within a process.
static NEXT_TMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Fsync the parent directory of `path` for durability.
///
/// # Errors
///
/// Returns an IO error if the parent directory cannot be opened or fsynced.
pub fn fsync_parent_dir(path: &Path) -> std::io::Result<()> {
    #[cfg(unix)]
    if let Some(parent) = path.parent() {
        let dir = fs::File::open(parent)?;
        dir.sync_all()?;
    }
    #[cfg(not(unix))]
    let _ = path;
    Ok(())
}

fn tmp_sibling(target: &Path) -> PathBuf {
    let parent = target.parent().unwrap_or_else(|| Path::new("."));
    let fname = target
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("target");
    let pid = std::process::id();
    let ctr = NEXT_TMP_COUNTER.fetch_add(1, Ordering::Relaxed);
    parent.join(format!(".{fname}.{pid}.{ctr}{TMP_SUFFIX}"))
}

/// Copy `source` to `target` through a temporary sibling so readers never see
/// a half-written file. The source modification time is carried over.
///
/// # Errors
///
/// Returns an IO error if any stage fails; the temporary file is removed.
pub fn copy_staged(source: &Path, target: &Path) -> std::io::Result<()> {
    let tmp = tmp_sibling(target);
    let res = (|| {
        fs::copy(source, &tmp)?;
        let modified = fs::metadata(source)?.modified()?;
        let f = fs::OpenOptions::new().write(true).open(&tmp)?;
        f.set_modified(modified)?;
        f.sync_all()?;
        fs::rename(&tmp, target)?;
        fsync_parent_dir(target)
    })();
    if res.is_err() {
        let _ = fs::remove_file(&tmp);
    }
    res
}

/// Write `bytes` to `target` atomically (temp + rename + parent fsync).
///
/// # Errors
///
/// Returns an IO error if any stage fails; the temporary file is removed.
pub fn write_atomic(target: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let tmp = tmp_sibling(target);
    let res = (|| {
        let mut f = fs::File::create(&tmp)?;
        f.write_all(bytes)?;
        f.sync_all()?;
        fs::rename(&tmp, target)?;
        fsync_parent_dir(target)
    })();
    if res.is_err() {
        let _ = fs::remove_file(&tmp);
    }
    res
}
