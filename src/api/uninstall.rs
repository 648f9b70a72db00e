//! Uninstall engine: replays an uninstall log in strict reverse order.
//!
//! The same pass serves automatic rollback (reversing only the entries a failed
//! run appended) and a later, explicit uninstall (reversing the whole log).
//! A target that is already gone is recorded as skipped; any other failure
//! halts the pass and the log is cut back to the entries not yet reversed.
use std::path::{Path, PathBuf};
use std::time::Instant;

use log::Level;
use serde_json::json;

use crate::adapters::TargetEnv;
use crate::api::errors::{exit_code_for, id_str, ErrorId, UninstallError};
use crate::api::Installer;
use crate::journal::{Reversal, UninstallLog};
use crate::logging::audit::{new_run_id, AuditCtx, AuditMode};
use crate::logging::{now_iso, AuditSink, FactsEmitter, StageLogger};
use crate::types::errors::{Error, ErrorKind, Result};
use crate::types::{ReversalFailure, SkipReason, SkippedEntry, UninstallReport};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ReversalMode {
    /// Undo a failed install run; everything goes, including kept files.
    Rollback,
    /// Explicit uninstall; files flagged keep-on-uninstall stay.
    Uninstall,
}

/// Outcome of one reverse pass over a log tail.
#[derive(Debug, Default)]
pub(crate) struct Pass {
    pub reversed: usize,
    pub skipped: Vec<SkippedEntry>,
    pub failure: Option<ReversalFailure>,
    pub failure_cause: Option<Error>,
}

/// Remove directories a write created, innermost first, leaving any that
/// gained other content.
fn remove_created_dirs(env: &dyn TargetEnv, dirs: &[PathBuf]) -> Result<()> {
    for d in dirs.iter().rev() {
        match env.remove_dir_if_empty(d) {
            Ok(true) => {}
            Ok(false) => return Ok(()),
            Err(e) if e.is_not_found() => {}
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

/// Put a file back the way the install found it.
fn undo_write(
    env: &dyn TargetEnv,
    path: &Path,
    backup: Option<&Path>,
    remove: impl Fn(&Path) -> Result<()>,
) -> Result<()> {
    match backup {
        Some(b) => env.restore_backup(b, path),
        None => remove(path),
    }
}

/// Reverse a single entry. `Ok(Some(reason))` means the entry was passed over.
pub(crate) fn reverse_one(
    env: &dyn TargetEnv,
    reversal: &Reversal,
    mode: ReversalMode,
) -> Result<Option<SkipReason>> {
    match reversal {
        Reversal::Nothing { .. } => Ok(None),
        Reversal::RemoveDirs { dirs } => {
            let mut removed_any = false;
            for d in dirs.iter().rev() {
                match env.remove_dir_if_empty(d) {
                    Ok(true) => removed_any = true,
                    Ok(false) if removed_any => return Ok(None),
                    Ok(false) => return Ok(Some(SkipReason::NotEmpty)),
                    Err(e) if e.is_not_found() => {}
                    Err(e) => return Err(e),
                }
            }
            if removed_any || dirs.is_empty() {
                Ok(None)
            } else {
                Ok(Some(SkipReason::Missing))
            }
        }
        Reversal::RemoveFile {
            path,
            backup,
            keep_on_uninstall,
        } => {
            if *keep_on_uninstall && mode == ReversalMode::Uninstall {
                return Ok(Some(SkipReason::Kept));
            }
            match undo_write(env, path, backup.as_deref(), |p| env.remove_file(p)) {
                Ok(()) => Ok(None),
                Err(e) if e.is_not_found() => Ok(Some(SkipReason::Missing)),
                Err(e) => Err(e),
            }
        }
        Reversal::RemoveShortcut {
            path,
            backup,
            created_dirs,
        } => {
            let res = undo_write(env, path, backup.as_deref(), |p| env.remove_shortcut(p));
            finish_placed(env, res, created_dirs)
        }
        Reversal::EraseRecord {
            path,
            backup,
            created_dirs,
        } => {
            let res = undo_write(env, path, backup.as_deref(), |p| env.remove_uninstall_record(p));
            finish_placed(env, res, created_dirs)
        }
    }
}

fn finish_placed(
    env: &dyn TargetEnv,
    res: Result<()>,
    created_dirs: &[PathBuf],
) -> Result<Option<SkipReason>> {
    let missing = match res {
        Ok(()) => false,
        Err(e) if e.is_not_found() => true,
        Err(e) => return Err(e),
    };
    remove_created_dirs(env, created_dirs)?;
    Ok(missing.then_some(SkipReason::Missing))
}

/// Reverse `log` entries from the newest down to index `from`, then cut the
/// log: back to `from` when everything was reversed, or to the entries still
/// applied when the pass halted.
pub(crate) fn reverse_tail<E: FactsEmitter, A: AuditSink>(
    api: &Installer<E, A>,
    log: &mut UninstallLog,
    from: usize,
    mode: ReversalMode,
    slog: &StageLogger<'_>,
) -> Pass {
    let mut pass = Pass::default();
    let mut keep = from;
    let entries = log.entries().to_vec();
    for (i, entry) in entries.iter().enumerate().skip(from).rev() {
        let path = entry.reversal.path().to_path_buf();
        let ev = || match mode {
            ReversalMode::Rollback => slog.rollback(),
            ReversalMode::Uninstall => slog.uninstall(),
        };
        if mode == ReversalMode::Uninstall && api.cancel.is_cancelled() {
            keep = i + 1;
            pass.failure = Some(ReversalFailure {
                seq: entry.seq,
                path: path.clone(),
                kind: ErrorKind::Cancelled,
                msg: "uninstall cancelled".to_string(),
            });
            pass.failure_cause = Some(Error::new(ErrorKind::Cancelled, "uninstall cancelled"));
            break;
        }
        match reverse_one(api.env(), &entry.reversal, mode) {
            Ok(None) => {
                pass.reversed += 1;
                ev().step(entry.step_id.clone())
                    .path(path.display().to_string())
                    .field("seq", json!(entry.seq))
                    .field("kind", json!(entry.step.kind().as_str()))
                    .emit_success();
            }
            Ok(Some(reason)) => {
                ev().step(entry.step_id.clone())
                    .path(path.display().to_string())
                    .field("seq", json!(entry.seq))
                    .field("skipped", json!(reason))
                    .emit_warn();
                pass.skipped.push(SkippedEntry {
                    seq: entry.seq,
                    path,
                    reason,
                });
            }
            Err(e) => {
                let id = match mode {
                    ReversalMode::Rollback => ErrorId::E_ROLLBACK,
                    ReversalMode::Uninstall => ErrorId::E_UNINSTALL,
                };
                ev().step(entry.step_id.clone())
                    .path(path.display().to_string())
                    .field("seq", json!(entry.seq))
                    .field("error_id", json!(id_str(id)))
                    .field("exit_code", json!(exit_code_for(id)))
                    .field("error", json!(e.to_string()))
                    .emit_failure();
                api.audit.log(
                    Level::Error,
                    &format!("reverse: entry {} ({}) failed: {e}", entry.seq, path.display()),
                );
                keep = i + 1;
                pass.failure = Some(ReversalFailure {
                    seq: entry.seq,
                    path,
                    kind: e.kind,
                    msg: e.msg.clone(),
                });
                pass.failure_cause = Some(e);
                break;
            }
        }
    }
    let cut = if keep == 0 { log.discard() } else { log.truncate(keep) };
    match cut {
        Ok(()) if keep == 0 => release_state_dir(api.env(), log.path()),
        Ok(()) => {}
        Err(e) => api.audit.log(
            Level::Warn,
            &format!("reverse: could not update log {}: {e}", log.path().display()),
        ),
    }
    pass
}

/// Drop the installer state directory once the last log in it is gone.
fn release_state_dir(env: &dyn TargetEnv, log_path: &Path) {
    let state = env.resolve_state_dir();
    if log_path.parent() != Some(state.as_path()) {
        return;
    }
    if let Err(e) = env.remove_dir_if_empty(&state) {
        if !e.is_not_found() {
            log::warn!("reverse: could not remove {}: {e}", state.display());
        }
    }
}

pub(super) fn run<E: FactsEmitter, A: AuditSink>(
    api: &Installer<E, A>,
    log: &mut UninstallLog,
) -> std::result::Result<UninstallReport, UninstallError> {
    let t0 = Instant::now();
    let plan_id = log
        .entries()
        .last()
        .map(|e| e.plan_id.clone())
        .unwrap_or_default();
    let tctx = AuditCtx::new(
        &api.facts as &dyn FactsEmitter,
        plan_id,
        new_run_id(),
        now_iso(),
        AuditMode::default(),
    );
    let slog = StageLogger::new(&tctx);

    let lock = match super::lock::acquire(api, "uninstall") {
        Ok(l) => l,
        Err(e) => {
            slog.uninstall_summary()
                .path(log.path().display().to_string())
                .field("error_id", json!(id_str(ErrorId::E_LOCKING)))
                .field("exit_code", json!(exit_code_for(ErrorId::E_LOCKING)))
                .emit_failure();
            return Err(UninstallError {
                at_entry: 0,
                path: log.path().to_path_buf(),
                cause: e,
                reversed: 0,
                skipped: Vec::new(),
            });
        }
    };

    let total = log.entries().len();
    let pass = reverse_tail(api, log, 0, ReversalMode::Uninstall, &slog);
    let duration_ms = u64::try_from(t0.elapsed().as_millis()).unwrap_or(u64::MAX);
    drop(lock);

    let summary = slog
        .uninstall_summary()
        .path(log.path().display().to_string())
        .field("entries", json!(total))
        .field("reversed", json!(pass.reversed))
        .field("skipped", json!(pass.skipped.len()))
        .field("duration_ms", json!(duration_ms));

    match (pass.failure, pass.failure_cause) {
        (Some(f), Some(cause)) => {
            summary
                .field("error_id", json!(id_str(ErrorId::E_UNINSTALL)))
                .field("exit_code", json!(exit_code_for(ErrorId::E_UNINSTALL)))
                .field("remaining", json!(log.entries().len()))
                .emit_failure();
            Err(UninstallError {
                at_entry: f.seq,
                path: f.path,
                cause,
                reversed: pass.reversed,
                skipped: pass.skipped,
            })
        }
        _ => {
            summary.emit_success();
            api.audit.log(
                Level::Info,
                &format!(
                    "uninstall: reversed {} of {total} entries ({} skipped)",
                    pass.reversed,
                    pass.skipped.len()
                ),
            );
            Ok(UninstallReport {
                reversed: pass.reversed,
                skipped: pass.skipped,
                duration_ms,
            })
        }
    }
}
