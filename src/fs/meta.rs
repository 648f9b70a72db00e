//! Read-only inspection of destination paths: node kind, content hash and mtime.
use std::path::Path;
use std::time::SystemTime;

use sha2::{Digest, Sha256};

/// Lowercase hex SHA-256 of the file at `path`; `None` if it cannot be read.
#[must_use]
pub fn sha256_hex_of(path: &Path) -> Option<String> {
    let mut file = std::fs::File::open(path).ok()?;
    let mut digest = Sha256::new();
    std::io::copy(&mut file, &mut digest).ok()?;
    Some(hex::encode(digest.finalize()))
}

/// `file`, `dir`, `symlink`, `other`, or `missing`.
#[must_use]
pub fn kind_of(path: &Path) -> &'static str {
    let Ok(md) = std::fs::symlink_metadata(path) else {
        return "missing";
    };
    let ft = md.file_type();
    match (ft.is_symlink(), ft.is_dir(), ft.is_file()) {
        (true, _, _) => "symlink",
        (_, true, _) => "dir",
        (_, _, true) => "file",
        _ => "other",
    }
}

#[must_use]
pub fn modified_of(path: &Path) -> Option<SystemTime> {
    std::fs::metadata(path).and_then(|m| m.modified()).ok()
}
