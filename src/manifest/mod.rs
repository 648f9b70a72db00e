//! Manifest model: the declarative description of an application's install layout.
//!
//! A manifest is loaded once from text, validated in full, and never mutated
//! afterwards; consumers only get shared references to its entries.
//!
//! Submodules:
//! - `parse`: line reader for the `[Setup]` / `[Files]` / `[Icons]` / `[Run]` format
//! - `template`: placeholder-anchored directory templates
//! - `model`: entry types and the defaults/override merge
//! - `validate`: cross-entry checks and [`ValidationError`]

use std::path::{Path, PathBuf};

pub mod model;
mod parse;
pub mod template;
pub mod validate;

pub use model::{
    AppMetadata, EffectiveFileOptions, FileEntry, FileOverrides, InstallDefaults, RunEntry,
    RunEntryFlags, ShortcutEntry,
};
pub use template::{Anchor, Anchors, Template, TemplateError, TemplateUse};
pub use validate::{parse_version, EntryRef, Rule, ValidationError};

#[derive(Clone, Debug)]
pub struct Manifest {
    app: AppMetadata,
    defaults: InstallDefaults,
    files: Vec<FileEntry>,
    shortcuts: Vec<ShortcutEntry>,
    runs: Vec<RunEntry>,
    base_dir: PathBuf,
}

impl Manifest {
    /// Read and validate a manifest file. Relative `Source` paths resolve
    /// against the manifest's own directory.
    ///
    /// # Errors
    ///
    /// Returns a `ValidationError` when the file cannot be read or any check fails.
    pub fn load(path: &Path) -> Result<Self, ValidationError> {
        let text = std::fs::read_to_string(path).map_err(|e| ValidationError {
            entry: EntryRef {
                section: "manifest",
                line: None,
                ident: path.display().to_string(),
            },
            rule: Rule::Syntax(format!("cannot read manifest: {e}")),
        })?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        Self::parse(&text, base)
    }

    /// Parse and validate manifest text.
    ///
    /// # Errors
    ///
    /// Returns the first `ValidationError` found; no partial manifest is produced.
    pub fn parse(text: &str, base_dir: &Path) -> Result<Self, ValidationError> {
        let raw = parse::read(text)?;
        let manifest = validate::build(raw, base_dir)?;
        log::debug!(
            "manifest: loaded {} {} ({} files, {} shortcuts, {} run entries)",
            manifest.app.name,
            manifest.app.version,
            manifest.files.len(),
            manifest.shortcuts.len(),
            manifest.runs.len()
        );
        Ok(manifest)
    }

    #[must_use]
    pub fn app(&self) -> &AppMetadata {
        &self.app
    }

    #[must_use]
    pub fn defaults(&self) -> &InstallDefaults {
        &self.defaults
    }

    #[must_use]
    pub fn files(&self) -> &[FileEntry] {
        &self.files
    }

    #[must_use]
    pub fn shortcuts(&self) -> &[ShortcutEntry] {
        &self.shortcuts
    }

    #[must_use]
    pub fn runs(&self) -> &[RunEntry] {
        &self.runs
    }

    #[must_use]
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }
}
