use std::path::PathBuf;

use crate::adapters::{CopyOutcome, ShortcutRequest, TargetEnv};
use crate::journal::Reversal;
use crate::types::errors::Result;
use crate::types::InstallStep;

/// What one applied step did, as far as undoing it is concerned.
pub(super) struct Applied {
    pub reversal: Reversal,
    /// Short word for facts: `created`, `copied`, `skipped`, `exists`,
    /// `written` or `unchanged`.
    pub outcome: &'static str,
}

/// Perform `step` against the environment and derive its undo descriptor from
/// what actually happened.
pub(super) fn apply_step(env: &dyn TargetEnv, step: &InstallStep) -> Result<Applied> {
    match step {
        InstallStep::MakeDir { path } => {
            let dirs = env.make_dir(path)?;
            if dirs.is_empty() {
                return Ok(Applied {
                    reversal: Reversal::Nothing { path: path.clone() },
                    outcome: "exists",
                });
            }
            Ok(Applied {
                reversal: Reversal::RemoveDirs { dirs },
                outcome: "created",
            })
        }
        InstallStep::CopyFile {
            source,
            dest,
            overwrite,
            keep_on_uninstall,
        } => match env.copy_file(source, dest, *overwrite)? {
            CopyOutcome::Copied { backup } => Ok(Applied {
                reversal: Reversal::RemoveFile {
                    path: dest.clone(),
                    backup,
                    keep_on_uninstall: *keep_on_uninstall,
                },
                outcome: "copied",
            }),
            CopyOutcome::Skipped => Ok(Applied {
                reversal: Reversal::Nothing { path: dest.clone() },
                outcome: "skipped",
            }),
        },
        InstallStep::WriteShortcut {
            name,
            target,
            location,
            args,
            comment,
        } => {
            let placed = env.create_shortcut(&ShortcutRequest {
                name,
                target,
                location,
                args,
                comment: comment.as_deref(),
            })?;
            if placed.unchanged {
                return Ok(unchanged(placed.path));
            }
            Ok(Applied {
                reversal: Reversal::RemoveShortcut {
                    path: placed.path,
                    backup: placed.backup,
                    created_dirs: placed.created_dirs,
                },
                outcome: "written",
            })
        }
        InstallStep::WriteUninstallRecord { record } => {
            let placed = env.write_uninstall_record(record)?;
            if placed.unchanged {
                return Ok(unchanged(placed.path));
            }
            Ok(Applied {
                reversal: Reversal::EraseRecord {
                    path: placed.path,
                    backup: placed.backup,
                    created_dirs: placed.created_dirs,
                },
                outcome: "written",
            })
        }
    }
}

fn unchanged(path: PathBuf) -> Applied {
    Applied {
        reversal: Reversal::Nothing { path },
        outcome: "unchanged",
    }
}
