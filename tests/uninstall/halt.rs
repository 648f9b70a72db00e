use setupkit::api::errors::exit_code_for;
use setupkit::journal::UninstallLog;
use setupkit::policy::Policy;
use setupkit::types::errors::ErrorKind;
use setupkit::types::ApplyMode;

use crate::helpers::{
    demo_manifest, harness, plan_and_log, FaultyEnv, Op, TestRoot, DEMO, DESKTOP_LINK, RECORD,
};

#[test]
fn permission_denied_halts_and_a_retry_finishes_the_job() {
    let tr = TestRoot::new();
    let m = demo_manifest(&tr, DEMO);
    let before = tr.snapshot();
    let (env, faults) = FaultyEnv::new(tr.env());
    let h = harness(Box::new(env), Policy::default());
    let (plan, mut log) = plan_and_log(&h.api, &m);
    h.api.execute(&plan, &mut log, ApplyMode::Commit).unwrap();

    faults.fail(Op::RemoveShortcut, ErrorKind::PermissionDenied);
    let mut log = UninstallLog::open(&plan.app.log_path).unwrap();
    let err = h.api.uninstall(&mut log).expect_err("shortcut removal denied");
    assert_eq!(err.at_entry, 4);
    assert_eq!(err.path, tr.installed(DESKTOP_LINK));
    assert_eq!(err.cause.kind, ErrorKind::PermissionDenied);
    assert_eq!(err.reversed, 1);
    assert_eq!(exit_code_for(err.error_id()), 30);
    assert!(!tr.installed(RECORD).exists());
    assert!(tr.installed(DESKTOP_LINK).exists());

    let remaining = UninstallLog::open(&plan.app.log_path).unwrap();
    assert_eq!(remaining.entries().len(), 4);
    let summary = h.facts.named("uninstall.summary");
    assert_eq!(summary[0].0, "failure");
    assert_eq!(summary[0].1["remaining"], 4);

    faults.clear();
    let mut log = UninstallLog::open(&plan.app.log_path).unwrap();
    let report = h.api.uninstall(&mut log).expect("retry");
    assert_eq!(report.reversed, 4);
    assert_eq!(tr.snapshot(), before);
    assert!(!plan.app.log_path.exists());
}

#[test]
fn cancelled_uninstall_keeps_the_whole_log() {
    let tr = TestRoot::new();
    let m = demo_manifest(&tr, DEMO);
    let h = harness(Box::new(tr.env()), Policy::default());
    let (plan, mut log) = plan_and_log(&h.api, &m);
    h.api.execute(&plan, &mut log, ApplyMode::Commit).unwrap();

    h.api.cancel_token().cancel();
    let mut log = UninstallLog::open(&plan.app.log_path).unwrap();
    let err = h.api.uninstall(&mut log).expect_err("cancelled");
    assert_eq!(err.cause.kind, ErrorKind::Cancelled);
    assert_eq!(err.reversed, 0);
    assert_eq!(UninstallLog::open(&plan.app.log_path).unwrap().entries().len(), 5);
    assert!(tr.installed(RECORD).exists());
}

#[test]
fn uninstall_requires_the_lock_when_policy_does() {
    let tr = TestRoot::new();
    let m = demo_manifest(&tr, DEMO);
    let h = harness(Box::new(tr.env()), Policy::default());
    let (plan, mut log) = plan_and_log(&h.api, &m);
    h.api.execute(&plan, &mut log, ApplyMode::Commit).unwrap();

    let strict = harness(Box::new(tr.env()), Policy::production_preset());
    let mut log = UninstallLog::open(&plan.app.log_path).unwrap();
    let err = strict.api.uninstall(&mut log).expect_err("no lock manager");
    assert_eq!(err.cause.kind, ErrorKind::Locking);
    assert_eq!(exit_code_for(err.error_id()), 40);
    assert_eq!(log.entries().len(), 5);
}
