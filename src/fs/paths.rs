//! Path utilities for installer state files.

use std::path::{Component, Path};

/// Turn an application name into a single safe file-name component.
///
/// Keeps ASCII alphanumerics, `-`, `_` and `.`; everything else becomes `_`.
/// A name that would be empty or start with a dot gets a leading `_`.
#[must_use]
pub fn file_stem_for(name: &str) -> String {
    let mut out: String = name
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if out.is_empty() || out.starts_with('.') {
        out.insert(0, '_');
    }
    out
}

/// True when `path` holds no `..` components.
#[must_use]
pub fn is_safe_path(path: &Path) -> bool {
    !path.components().any(|c| matches!(c, Component::ParentDir))
}
