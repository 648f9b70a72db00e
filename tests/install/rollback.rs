use setupkit::api::errors::exit_code_for;
use setupkit::journal::UninstallLog;
use setupkit::policy::Policy;
use setupkit::types::errors::ErrorKind;
use setupkit::types::{ApplyMode, StepKind};
use setupkit::{RunFlags, RunOutcome, SkipRun};

use crate::helpers::{
    demo_manifest, harness, plan_and_log, FaultyEnv, Op, TestRoot, DEMO, EXE,
};

#[test]
fn disk_full_on_copy_rolls_back_to_prior_state() {
    let tr = TestRoot::new();
    let m = demo_manifest(&tr, DEMO);
    let before = tr.snapshot();
    let (env, faults) = FaultyEnv::new(tr.env());
    faults.fail(Op::Copy, ErrorKind::DiskFull);
    let h = harness(Box::new(env), Policy::default());
    let (plan, mut log) = plan_and_log(&h.api, &m);

    let res = h.api.execute(&plan, &mut log, ApplyMode::Commit);
    let err = res.as_ref().expect_err("copy fails");
    assert_eq!(err.at_step, Some(StepKind::CopyFile));
    assert_eq!(err.step_index, Some(1));
    assert_eq!(err.cause.kind, ErrorKind::DiskFull);
    assert_eq!(err.rolled_back, 1);
    assert!(!err.rollback_incomplete());
    assert_eq!(exit_code_for(err.error_id()), 20);

    assert_eq!(tr.snapshot(), before);
    assert!(log.entries().is_empty());
    assert!(!plan.app.log_path.exists());
    assert!(!tr.installed(".setupkit").exists());

    let summary = h.facts.named("rollback.summary");
    assert_eq!(summary.len(), 1);
    assert_eq!(summary[0].0, "success");
    assert_eq!(summary[0].1["reversed"], 1);

    let out = h.api.maybe_run(
        &plan.runs[0],
        &res,
        &RunFlags {
            silent: false,
            consent: true,
        },
    );
    assert_eq!(out, RunOutcome::Skipped(SkipRun::InstallFailed));
    assert_eq!(h.launcher.count(), 0);
}

#[test]
fn shortcut_failure_removes_copied_file_and_directories() {
    let tr = TestRoot::new();
    let m = demo_manifest(&tr, DEMO);
    let before = tr.snapshot();
    let (env, faults) = FaultyEnv::new(tr.env());
    faults.fail(Op::Shortcut, ErrorKind::PermissionDenied);
    let h = harness(Box::new(env), Policy::default());
    let (plan, mut log) = plan_and_log(&h.api, &m);

    let err = h
        .api
        .execute(&plan, &mut log, ApplyMode::Commit)
        .expect_err("shortcut fails");
    assert_eq!(err.at_step, Some(StepKind::WriteShortcut));
    assert_eq!(err.step_index, Some(2));
    assert_eq!(err.rolled_back, 2);
    assert!(!tr.installed(EXE).exists());
    assert_eq!(tr.snapshot(), before);
    assert_eq!(h.facts.named("rollback").len(), 2);
}

#[test]
fn failed_rollback_keeps_unreversed_entries_for_a_later_uninstall() {
    let tr = TestRoot::new();
    let m = demo_manifest(&tr, DEMO);
    let before = tr.snapshot();
    let (env, faults) = FaultyEnv::new(tr.env());
    faults.fail(Op::Shortcut, ErrorKind::DiskFull);
    faults.fail(Op::RemoveFile, ErrorKind::PermissionDenied);
    let h = harness(Box::new(env), Policy::default());
    let (plan, mut log) = plan_and_log(&h.api, &m);

    let err = h
        .api
        .execute(&plan, &mut log, ApplyMode::Commit)
        .expect_err("shortcut fails");
    assert!(err.rollback_incomplete());
    assert_eq!(err.rollback_errors.len(), 1);
    assert_eq!(err.rollback_errors[0].kind, ErrorKind::PermissionDenied);
    assert_eq!(exit_code_for(err.error_id()), 21);
    assert!(err.to_string().contains("rollback incomplete"), "{err}");
    assert!(tr.installed(EXE).exists());

    let on_disk = UninstallLog::open(&plan.app.log_path).unwrap();
    assert_eq!(on_disk.entries().len(), 2);
    let summary = h.facts.named("rollback.summary");
    assert_eq!(summary[0].0, "failure");

    faults.clear();
    let mut log = UninstallLog::open(&plan.app.log_path).unwrap();
    let report = h.api.uninstall(&mut log).expect("retry succeeds");
    assert_eq!(report.reversed, 2);
    assert_eq!(tr.snapshot(), before);
}

#[test]
fn failed_reinstall_rolls_back_only_its_own_entries() {
    let tr = TestRoot::new();
    let m = demo_manifest(&tr, DEMO);
    let (env, faults) = FaultyEnv::new(tr.env());
    let h = harness(Box::new(env), Policy::default());

    let (plan, mut log) = plan_and_log(&h.api, &m);
    h.api.execute(&plan, &mut log, ApplyMode::Commit).unwrap();
    let installed = tr.snapshot();

    faults.fail(Op::Record, ErrorKind::DiskFull);
    let (plan, mut log) = plan_and_log(&h.api, &m);
    let err = h
        .api
        .execute(&plan, &mut log, ApplyMode::Commit)
        .expect_err("record write fails");
    assert_eq!(err.at_step, Some(StepKind::WriteUninstallRecord));
    assert_eq!(err.rolled_back, 4);
    assert_eq!(log.entries().len(), 5);
    assert_eq!(tr.snapshot(), installed);
}
