//! Post-install runner: fire-and-forget launch of a run action.
//!
//! Launching happens only after a successful committed install, when policy
//! allows it, when silent mode does not suppress the entry, and, for
//! `postinstall` entries in interactive mode, when the user consented. The
//! engine never waits on the spawned process and a launch failure never
//! changes the install result.
use log::Level;
use serde::Serialize;
use serde_json::json;

use crate::api::errors::{InstallError, RunnerWarning};
use crate::api::Installer;
use crate::logging::audit::{new_run_id, AuditCtx, AuditMode};
use crate::logging::{now_iso, AuditSink, FactsEmitter, StageLogger};
use crate::types::{InstallReport, RunAction};

/// How the installer was invoked, as far as launching is concerned.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RunFlags {
    pub silent: bool,
    /// The user agreed to launch (interactive `postinstall` entries).
    pub consent: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipRun {
    InstallFailed,
    DryRun,
    Disabled,
    Silent,
    NotSilent,
    NoConsent,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RunOutcome {
    Launched { pid: u32 },
    Skipped(SkipRun),
    Failed(RunnerWarning),
}

fn skip_reason<E: FactsEmitter, A: AuditSink>(
    api: &Installer<E, A>,
    run: &RunAction,
    install: &Result<InstallReport, InstallError>,
    flags: &RunFlags,
) -> Option<SkipRun> {
    let report = match install {
        Ok(r) => r,
        Err(_) => return Some(SkipRun::InstallFailed),
    };
    if report.dry_run {
        return Some(SkipRun::DryRun);
    }
    if !api.policy.launch.enabled {
        return Some(SkipRun::Disabled);
    }
    if flags.silent && run.flags.skip_if_silent {
        return Some(SkipRun::Silent);
    }
    if !flags.silent && run.flags.skip_if_not_silent {
        return Some(SkipRun::NotSilent);
    }
    if run.flags.postinstall && !flags.silent && !flags.consent {
        return Some(SkipRun::NoConsent);
    }
    None
}

pub(super) fn maybe_run<E: FactsEmitter, A: AuditSink>(
    api: &Installer<E, A>,
    run: &RunAction,
    install: &Result<InstallReport, InstallError>,
    flags: &RunFlags,
) -> RunOutcome {
    let plan_id = install
        .as_ref()
        .ok()
        .and_then(|r| r.plan_uuid)
        .map(|u| u.to_string())
        .unwrap_or_default();
    let tctx = AuditCtx::new(
        &api.facts as &dyn FactsEmitter,
        plan_id,
        new_run_id(),
        now_iso(),
        AuditMode::default(),
    );
    let slog = StageLogger::new(&tctx);
    let program = run.program.display().to_string();

    if let Some(reason) = skip_reason(api, run, install, flags) {
        log::debug!("run: not launching {program}: {reason:?}");
        slog.run()
            .path(program)
            .field("skipped", json!(reason))
            .emit_success();
        return RunOutcome::Skipped(reason);
    }

    if !run.flags.nowait {
        log::debug!("run: {program} is started detached; completion is not awaited");
    }
    match api
        .launcher
        .launch(&run.program, &run.args, run.working_dir.as_deref())
    {
        Ok(pid) => {
            api.audit
                .log(Level::Info, &format!("run: launched {program} (pid {pid})"));
            slog.run()
                .path(program)
                .field("description", json!(run.description))
                .field("pid", json!(pid))
                .emit_success();
            RunOutcome::Launched { pid }
        }
        Err(e) => {
            let warning = RunnerWarning {
                program: run.program.clone(),
                msg: e.to_string(),
            };
            api.audit.log(Level::Warn, &warning.to_string());
            slog.run()
                .path(program)
                .field("error", json!(warning.msg))
                .emit_warn();
            RunOutcome::Failed(warning)
        }
    }
}
