use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::template::Template;
use crate::types::{OverwritePolicy, Placement};

/// `[Setup]` metadata. Immutable once loaded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AppMetadata {
    pub name: String,
    /// Version exactly as written in the manifest.
    pub version: String,
    /// Normalized form used for comparisons.
    pub semver: semver::Version,
    pub publisher: Option<String>,
    pub default_dir: Template,
    pub default_group: String,
    /// Setup keys the engine does not interpret, kept verbatim (lowercased keys).
    pub extra: BTreeMap<String, String>,
}

/// Manifest-wide defaults applied to every file entry unless overridden.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct InstallDefaults {
    pub overwrite: OverwritePolicy,
    pub keep_on_uninstall: bool,
}

/// Per-entry overrides; `None` inherits from [`InstallDefaults`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FileOverrides {
    pub overwrite: Option<OverwritePolicy>,
    pub keep_on_uninstall: Option<bool>,
}

/// Options a file entry is installed with after merging defaults and overrides.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EffectiveFileOptions {
    pub overwrite: OverwritePolicy,
    pub keep_on_uninstall: bool,
}

impl FileOverrides {
    #[must_use]
    pub fn merge(&self, defaults: &InstallDefaults) -> EffectiveFileOptions {
        EffectiveFileOptions {
            overwrite: self.overwrite.unwrap_or(defaults.overwrite),
            keep_on_uninstall: self.keep_on_uninstall.unwrap_or(defaults.keep_on_uninstall),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileEntry {
    /// Build-time source, already joined onto the manifest directory.
    pub source: PathBuf,
    pub dest_dir: Template,
    pub dest_name: String,
    pub overrides: FileOverrides,
    pub line: usize,
}

impl FileEntry {
    /// Full install-time destination (`dest_dir` + file name).
    #[must_use]
    pub fn destination(&self) -> Template {
        self.dest_dir.join(&self.dest_name)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShortcutEntry {
    pub name: String,
    pub placement: Placement,
    /// Full shortcut template from the `Name` key; its parent is the directory.
    pub location: Template,
    pub target: Template,
    pub args: Vec<String>,
    pub comment: Option<String>,
    pub line: usize,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunEntryFlags {
    /// Offered to the user after install; interactive runs need consent.
    pub postinstall: bool,
    pub nowait: bool,
    pub skip_if_silent: bool,
    pub skip_if_not_silent: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunEntry {
    pub target: Template,
    pub description: String,
    pub args: Vec<String>,
    pub working_dir: Option<Template>,
    pub flags: RunEntryFlags,
    pub line: usize,
}
