use std::path::{Path, PathBuf};

use crate::types::errors::Result;
use crate::types::{OverwritePolicy, ShortcutLocation, UninstallRecord};

/// Result of a copy request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CopyOutcome {
    /// Content was written. `backup` holds the previous file when one was replaced.
    Copied { backup: Option<PathBuf> },
    /// The overwrite policy kept the existing destination.
    Skipped,
}

/// Something the environment wrote, plus what it had to create or move aside to do so.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Placed {
    pub path: PathBuf,
    /// Directories created for this write, outermost first.
    pub created_dirs: Vec<PathBuf>,
    pub backup: Option<PathBuf>,
    /// The file already held these exact bytes and was left alone.
    pub unchanged: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShortcutRequest<'a> {
    pub name: &'a str,
    pub target: &'a Path,
    pub location: &'a ShortcutLocation,
    pub args: &'a [String],
    pub comment: Option<&'a str>,
}

/// Abstraction over the file system and shortcut registry of one platform.
///
/// The engine only sequences calls to this trait. Reversal primitives report
/// an absent target with `ErrorKind::NotFound`.
pub trait TargetEnv: Send + Sync {
    /// Directory that `{pf}`-style placeholders resolve to.
    fn resolve_install_root(&self) -> PathBuf;
    /// Start-menu directory for the group `name`.
    fn resolve_group_path(&self, name: &str) -> PathBuf;
    fn resolve_desktop_path(&self) -> PathBuf;
    /// Where uninstall logs and records are kept.
    fn resolve_state_dir(&self) -> PathBuf;

    /// Create `path` and any missing ancestors.
    /// # Errors
    /// Returns an error if a directory cannot be created.
    fn make_dir(&self, path: &Path) -> Result<Vec<PathBuf>>;

    /// Copy `src` to `dst` honoring `policy`.
    /// # Errors
    /// `MissingSource` when `src` is absent; otherwise the classified IO failure.
    fn copy_file(&self, src: &Path, dst: &Path, policy: OverwritePolicy) -> Result<CopyOutcome>;

    /// Write a shortcut into `req.location`.
    /// # Errors
    /// Returns an error if the shortcut cannot be written.
    fn create_shortcut(&self, req: &ShortcutRequest<'_>) -> Result<Placed>;

    /// Register the install so it can be found and removed later.
    /// # Errors
    /// Returns an error if the record cannot be written.
    fn write_uninstall_record(&self, record: &UninstallRecord) -> Result<Placed>;

    /// # Errors
    /// `NotFound` if `path` is already gone.
    fn remove_file(&self, path: &Path) -> Result<()>;

    /// Move `backup` back over `dst`.
    /// # Errors
    /// `NotFound` if the backup is gone.
    fn restore_backup(&self, backup: &Path, dst: &Path) -> Result<()>;

    /// Remove `path` when it holds nothing. Returns `false` when it still has content.
    /// # Errors
    /// `NotFound` if `path` is already gone.
    fn remove_dir_if_empty(&self, path: &Path) -> Result<bool>;

    /// # Errors
    /// `NotFound` if the shortcut is already gone.
    fn remove_shortcut(&self, path: &Path) -> Result<()>;

    /// # Errors
    /// `NotFound` if the record is already gone.
    fn remove_uninstall_record(&self, path: &Path) -> Result<()>;
}
