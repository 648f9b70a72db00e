//! Transactional executor: runs plan steps in order, journaling each one.
//!
//! Side-effects:
//! - Emits `install.attempt` / `install.result` facts per step and an `install.summary`.
//! - Acquires the process lock for committing runs per the locking policy.
//! - Appends one durable uninstall-log entry after every applied step; a step
//!   whose entry cannot be written is undone on the spot.
//! - On failure (including cancellation) reverses this run's entries through
//!   the uninstall engine in rollback mode.
use std::path::PathBuf;
use std::time::Instant;

use log::Level;
use serde_json::json;

use crate::api::errors::{exit_code_for, id_str, ErrorId, InstallError};
use crate::api::uninstall::{reverse_one, reverse_tail, ReversalMode};
use crate::api::Installer;
use crate::fs::{kind_of, sha256_hex_of};
use crate::journal::{LogEntry, UninstallLog};
use crate::logging::audit::{new_run_id, AuditCtx, AuditMode};
use crate::logging::{now_iso, ts_for_mode, AuditSink, FactsEmitter, StageLogger};
use crate::types::errors::{Error, ErrorKind};
use crate::types::ids::{plan_id, step_id};
use crate::types::{ApplyMode, InstallReport, InstallStep, Plan, ReversalFailure, StepKind};

use super::lock::{self, LockInfo};

mod handlers;
mod summary;

use handlers::apply_step;
use summary::InstallSummary;

struct StepFailure {
    index: usize,
    kind: StepKind,
    path: PathBuf,
    cause: Error,
    /// Set when the failed step itself could not be undone after a log write error.
    undo_error: Option<ReversalFailure>,
}

fn elapsed_ms(t0: Instant) -> u64 {
    u64::try_from(t0.elapsed().as_millis()).unwrap_or(u64::MAX)
}

#[allow(
    clippy::too_many_lines,
    reason = "step loop keeps facts, journaling and failure capture side by side"
)]
pub(crate) fn run<E: FactsEmitter, A: AuditSink>(
    api: &Installer<E, A>,
    plan: &Plan,
    log: &mut UninstallLog,
    mode: ApplyMode,
) -> Result<InstallReport, InstallError> {
    let t0 = Instant::now();
    let dry = matches!(mode, ApplyMode::DryRun);
    let pid = plan_id(plan);
    let tctx = AuditCtx::new(
        &api.facts as &dyn FactsEmitter,
        pid.to_string(),
        new_run_id(),
        ts_for_mode(mode),
        AuditMode {
            dry_run: dry,
            redact: dry,
        },
    );
    let slog = StageLogger::new(&tctx);

    let lock = if dry {
        LockInfo {
            backend: "none",
            wait_ms: None,
            _guard: None,
        }
    } else {
        match lock::acquire(api, "install") {
            Ok(l) => l,
            Err(e) => {
                slog.install_attempt()
                    .field("lock_backend", json!(if api.lock.is_some() { "file" } else { "none" }))
                    .field("error_id", json!(id_str(ErrorId::E_LOCKING)))
                    .field("exit_code", json!(exit_code_for(ErrorId::E_LOCKING)))
                    .emit_failure();
                InstallSummary::new("none", None)
                    .error(ErrorId::E_LOCKING, &e.to_string())
                    .emit(&slog, false);
                return Err(InstallError::before_start(e));
            }
        }
    };

    if !dry {
        log.set_sync(api.policy.durability.sync_log);
    }
    let run_start = log.entries().len();
    let mut report = InstallReport {
        plan_uuid: Some(pid),
        dry_run: dry,
        ..InstallReport::default()
    };
    let mut failure: Option<StepFailure> = None;

    for (idx, step) in plan.steps.iter().enumerate() {
        let sid = step_id(&pid, step, idx).to_string();
        let path = step.path();
        let kind = step.kind();

        if api.cancel.is_cancelled() {
            api.audit
                .log(Level::Warn, &format!("install: cancelled before step {idx} ({kind})"));
            failure = Some(StepFailure {
                index: idx,
                kind,
                path,
                cause: Error::new(ErrorKind::Cancelled, "install cancelled"),
                undo_error: None,
            });
            break;
        }

        slog.install_attempt()
            .step(sid.clone())
            .path(path.display().to_string())
            .field("kind", json!(kind.as_str()))
            .field("index", json!(idx))
            .emit_success();

        if dry {
            report.executed.push(step.clone());
            report.applied_count += 1;
            slog.install_result()
                .step(sid)
                .path(path.display().to_string())
                .field("kind", json!(kind.as_str()))
                .emit_success();
            continue;
        }

        let (before_kind, before_hash) = match step {
            InstallStep::CopyFile { dest, .. } => (kind_of(dest), sha256_hex_of(dest)),
            _ => ("", None),
        };
        let applied = match apply_step(api.env(), step) {
            Ok(a) => a,
            Err(e) => {
                slog.install_result()
                    .step(sid)
                    .path(path.display().to_string())
                    .field("kind", json!(kind.as_str()))
                    .field("error_kind", json!(e.kind))
                    .field("error", json!(e.msg))
                    .field("error_id", json!(id_str(ErrorId::E_INSTALL)))
                    .field("exit_code", json!(exit_code_for(ErrorId::E_INSTALL)))
                    .emit_failure();
                api.audit
                    .log(Level::Error, &format!("install: step {idx} ({kind}) failed: {e}"));
                failure = Some(StepFailure {
                    index: idx,
                    kind,
                    path,
                    cause: e,
                    undo_error: None,
                });
                break;
            }
        };

        let entry = LogEntry::new(
            log.next_seq(),
            pid.to_string(),
            sid.clone(),
            step.clone(),
            applied.reversal.clone(),
            now_iso(),
        );
        if let Err(e) = log.append(entry) {
            api.audit.log(
                Level::Error,
                &format!("install: could not journal step {idx} ({kind}): {e}; undoing it"),
            );
            let undo_error = reverse_one(api.env(), &applied.reversal, ReversalMode::Rollback)
                .err()
                .map(|ue| ReversalFailure {
                    seq: 0,
                    path: applied.reversal.path().to_path_buf(),
                    kind: ue.kind,
                    msg: ue.msg,
                });
            slog.install_result()
                .step(sid)
                .path(path.display().to_string())
                .field("kind", json!(kind.as_str()))
                .field("error", json!(format!("journal write failed: {e}")))
                .field("error_id", json!(id_str(ErrorId::E_INSTALL)))
                .emit_failure();
            failure = Some(StepFailure {
                index: idx,
                kind,
                path,
                cause: e,
                undo_error,
            });
            break;
        }

        match applied.outcome {
            "copied" => report.files_changed += 1,
            "skipped" => report.files_skipped += 1,
            _ => {}
        }
        let mut ev = slog
            .install_result()
            .step(sid)
            .path(path.display().to_string())
            .field("kind", json!(kind.as_str()))
            .field("outcome", json!(applied.outcome));
        if let InstallStep::CopyFile { dest, .. } = step {
            ev = ev
                .field("before_kind", json!(before_kind))
                .field("hash_alg", json!("sha256"))
                .field("before_hash", json!(before_hash))
                .field("after_hash", json!(sha256_hex_of(dest)));
        }
        ev.emit_success();
        report.executed.push(step.clone());
        report.applied_count += 1;
    }

    let Some(fail) = failure else {
        report.duration_ms = elapsed_ms(t0);
        InstallSummary::new(lock.backend, lock.wait_ms)
            .counts(&report)
            .emit(&slog, true);
        api.audit.log(
            Level::Info,
            &format!(
                "install: {} {} applied {} steps ({} files changed, {} unchanged){}",
                plan.app.name,
                plan.app.version,
                report.applied_count,
                report.files_changed,
                report.files_skipped,
                if dry { " [dry-run]" } else { "" }
            ),
        );
        return Ok(report);
    };

    let mut rollback_errors = Vec::new();
    let mut rolled_back = 0;
    if !dry {
        let pass = reverse_tail(api, log, run_start, ReversalMode::Rollback, &slog);
        rolled_back = pass.reversed;
        rollback_errors.extend(fail.undo_error);
        rollback_errors.extend(pass.failure);
        slog.rollback_summary()
            .field("reversed", json!(pass.reversed))
            .field("skipped", json!(pass.skipped.len()))
            .field("failed", json!(rollback_errors.len()))
            .emit(if rollback_errors.is_empty() {
                crate::logging::Decision::Success
            } else {
                crate::logging::Decision::Failure
            });
    }

    let err = InstallError {
        at_step: Some(fail.kind),
        step_index: Some(fail.index),
        path: Some(fail.path),
        cause: fail.cause,
        rolled_back,
        rollback_errors,
    };
    report.duration_ms = elapsed_ms(t0);
    InstallSummary::new(lock.backend, lock.wait_ms)
        .counts(&report)
        .rollback(err.rolled_back, err.rollback_errors.len())
        .error(err.error_id(), &err.to_string())
        .emit(&slog, false);
    api.audit.log(Level::Error, &err.to_string());
    Err(err)
}
