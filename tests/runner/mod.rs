use std::path::PathBuf;

use setupkit::api::errors::InstallError;
use setupkit::manifest::RunEntryFlags;
use setupkit::policy::Policy;
use setupkit::types::errors::{Error, ErrorKind};
use setupkit::types::{InstallReport, RunAction};
use setupkit::{RunFlags, RunOutcome, SkipRun};

use crate::helpers::{harness, Harness, TestRoot};

fn action(flags: RunEntryFlags) -> RunAction {
    RunAction {
        program: PathBuf::from("/opt/demo/demo"),
        description: "Launch Demo".to_string(),
        args: vec!["--welcome".to_string()],
        working_dir: Some(PathBuf::from("/opt/demo")),
        flags,
    }
}

fn postinstall() -> RunEntryFlags {
    RunEntryFlags {
        postinstall: true,
        nowait: true,
        ..RunEntryFlags::default()
    }
}

fn ok() -> Result<InstallReport, InstallError> {
    Ok(InstallReport::default())
}

fn setup(policy: Policy) -> (TestRoot, Harness) {
    let tr = TestRoot::new();
    let h = harness(Box::new(tr.env()), policy);
    (tr, h)
}

const INTERACTIVE: RunFlags = RunFlags {
    silent: false,
    consent: false,
};
const CONSENTED: RunFlags = RunFlags {
    silent: false,
    consent: true,
};
const SILENT: RunFlags = RunFlags {
    silent: true,
    consent: false,
};

#[test]
fn consented_postinstall_entry_is_launched_with_its_arguments() {
    let (_tr, h) = setup(Policy::default());
    let out = h.api.maybe_run(&action(postinstall()), &ok(), &CONSENTED);
    assert_eq!(out, RunOutcome::Launched { pid: 4001 });
    let launches = h.launcher.launches.lock().unwrap();
    assert_eq!(launches.len(), 1);
    assert_eq!(launches[0].program, PathBuf::from("/opt/demo/demo"));
    assert_eq!(launches[0].args, vec!["--welcome".to_string()]);
    assert_eq!(launches[0].working_dir, Some(PathBuf::from("/opt/demo")));
    let facts = h.facts.named("run");
    assert_eq!(facts[0].1["pid"], 4001);
}

#[test]
fn postinstall_entry_needs_consent_when_interactive() {
    let (_tr, h) = setup(Policy::default());
    let out = h.api.maybe_run(&action(postinstall()), &ok(), &INTERACTIVE);
    assert_eq!(out, RunOutcome::Skipped(SkipRun::NoConsent));
    assert_eq!(h.launcher.count(), 0);
}

#[test]
fn plain_entry_launches_without_consent() {
    let (_tr, h) = setup(Policy::default());
    let out = h.api.maybe_run(&action(RunEntryFlags::default()), &ok(), &INTERACTIVE);
    assert!(matches!(out, RunOutcome::Launched { .. }));
}

#[test]
fn silent_mode_honors_skip_flags() {
    let (_tr, h) = setup(Policy::default());
    let quiet = RunEntryFlags {
        skip_if_silent: true,
        ..postinstall()
    };
    assert_eq!(
        h.api.maybe_run(&action(quiet), &ok(), &SILENT),
        RunOutcome::Skipped(SkipRun::Silent)
    );
    let loud = RunEntryFlags {
        skip_if_not_silent: true,
        ..RunEntryFlags::default()
    };
    assert_eq!(
        h.api.maybe_run(&action(loud), &ok(), &CONSENTED),
        RunOutcome::Skipped(SkipRun::NotSilent)
    );
    // A silent install needs no consent.
    assert!(matches!(
        h.api.maybe_run(&action(postinstall()), &ok(), &SILENT),
        RunOutcome::Launched { .. }
    ));
}

#[test]
fn disabled_policy_dry_run_and_failed_install_never_launch() {
    let mut policy = Policy::default();
    policy.launch.enabled = false;
    let (_tr, h) = setup(policy);
    assert_eq!(
        h.api.maybe_run(&action(postinstall()), &ok(), &CONSENTED),
        RunOutcome::Skipped(SkipRun::Disabled)
    );

    let (_tr, h) = setup(Policy::default());
    let dry = Ok(InstallReport {
        dry_run: true,
        ..InstallReport::default()
    });
    assert_eq!(
        h.api.maybe_run(&action(postinstall()), &dry, &CONSENTED),
        RunOutcome::Skipped(SkipRun::DryRun)
    );
    let failed = Err(InstallError {
        at_step: None,
        step_index: None,
        path: None,
        cause: Error::new(ErrorKind::DiskFull, "no space"),
        rolled_back: 0,
        rollback_errors: Vec::new(),
    });
    assert_eq!(
        h.api.maybe_run(&action(postinstall()), &failed, &CONSENTED),
        RunOutcome::Skipped(SkipRun::InstallFailed)
    );
    assert_eq!(h.launcher.count(), 0);
}

#[test]
fn launch_failure_is_a_warning_not_an_error() {
    let (_tr, h) = setup(Policy::default());
    h.launcher.set_failing();
    let out = h.api.maybe_run(&action(postinstall()), &ok(), &CONSENTED);
    let RunOutcome::Failed(w) = out else {
        panic!("expected a warning, got {out:?}");
    };
    assert_eq!(w.program, PathBuf::from("/opt/demo/demo"));
    assert!(w.to_string().contains("could not launch"));
    let facts = h.facts.named("run");
    assert_eq!(facts[0].0, "warn");
}
