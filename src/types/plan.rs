use std::path::PathBuf;

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ApplyMode {
    #[default]
    DryRun,
    Commit,
}

/// How a copy treats a destination file that already exists.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverwritePolicy {
    /// Replace unconditionally; the previous file is kept as a backup.
    Always,
    /// Replace only when the source is newer than the destination.
    #[default]
    IfNewer,
    /// Never replace an existing destination.
    Never,
}

impl OverwritePolicy {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            OverwritePolicy::Always => "always",
            OverwritePolicy::IfNewer => "ifnewer",
            OverwritePolicy::Never => "never",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Placement {
    StartMenu,
    Desktop,
}

/// Resolved directory a shortcut is written into.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShortcutLocation {
    pub placement: Placement,
    pub dir: PathBuf,
}

/// Data written to the environment so the install can be found and removed later.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UninstallRecord {
    pub app_name: String,
    pub app_version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publisher: Option<String>,
    pub install_dir: PathBuf,
    pub log_path: PathBuf,
}

/// One reversible install action with fully resolved paths.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InstallStep {
    MakeDir {
        path: PathBuf,
    },
    CopyFile {
        source: PathBuf,
        dest: PathBuf,
        overwrite: OverwritePolicy,
        keep_on_uninstall: bool,
    },
    WriteShortcut {
        name: String,
        target: PathBuf,
        location: ShortcutLocation,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        args: Vec<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        comment: Option<String>,
    },
    WriteUninstallRecord {
        record: UninstallRecord,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    MakeDir,
    CopyFile,
    WriteShortcut,
    WriteUninstallRecord,
}

impl StepKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            StepKind::MakeDir => "make_dir",
            StepKind::CopyFile => "copy_file",
            StepKind::WriteShortcut => "write_shortcut",
            StepKind::WriteUninstallRecord => "write_uninstall_record",
        }
    }
}

impl std::fmt::Display for StepKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl InstallStep {
    #[must_use]
    pub fn kind(&self) -> StepKind {
        match self {
            InstallStep::MakeDir { .. } => StepKind::MakeDir,
            InstallStep::CopyFile { .. } => StepKind::CopyFile,
            InstallStep::WriteShortcut { .. } => StepKind::WriteShortcut,
            InstallStep::WriteUninstallRecord { .. } => StepKind::WriteUninstallRecord,
        }
    }

    /// Primary path this step affects, used for facts and messages.
    #[must_use]
    pub fn path(&self) -> PathBuf {
        match self {
            InstallStep::MakeDir { path } => path.clone(),
            InstallStep::CopyFile { dest, .. } => dest.clone(),
            InstallStep::WriteShortcut { name, location, .. } => location.dir.join(name),
            InstallStep::WriteUninstallRecord { record } => record.install_dir.clone(),
        }
    }
}

/// Post-install launch resolved at plan time.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunAction {
    pub program: PathBuf,
    pub description: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_dir: Option<PathBuf>,
    pub flags: crate::manifest::RunEntryFlags,
}

/// Identity of the application a plan installs.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanApp {
    pub name: String,
    pub version: String,
    pub install_dir: PathBuf,
    /// Where the executor writes the uninstall log for this plan.
    pub log_path: PathBuf,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    pub app: PlanApp,
    pub steps: Vec<InstallStep>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub runs: Vec<RunAction>,
}
