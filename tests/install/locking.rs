use setupkit::adapters::FileLockManager;
use setupkit::api::errors::exit_code_for;
use setupkit::policy::Policy;
use setupkit::types::errors::ErrorKind;
use setupkit::types::ApplyMode;

use crate::helpers::{demo_manifest, harness, plan_and_log, rival_lock_holder, TestRoot, DEMO};

#[test]
fn required_locking_without_manager_fails_before_first_step() {
    let tr = TestRoot::new();
    let m = demo_manifest(&tr, DEMO);
    let before = tr.snapshot();
    let h = harness(Box::new(tr.env()), Policy::production_preset());
    let (plan, mut log) = plan_and_log(&h.api, &m);

    let err = h
        .api
        .execute(&plan, &mut log, ApplyMode::Commit)
        .expect_err("no lock manager");
    assert_eq!(err.cause.kind, ErrorKind::Locking);
    assert_eq!(err.at_step, None);
    assert_eq!(exit_code_for(err.error_id()), 40);
    assert_eq!(tr.snapshot(), before);
    assert!(!plan.app.log_path.exists());

    let attempt = h.facts.named("install.attempt");
    assert_eq!(attempt.len(), 1);
    assert_eq!(attempt[0].1["error_id"], "E_LOCKING");
    assert_eq!(attempt[0].1["exit_code"], 40);
}

#[test]
fn held_lock_times_out_then_succeeds_once_released() {
    let tr = TestRoot::new();
    let m = demo_manifest(&tr, DEMO);
    let lock_path = tr.path().join("locks").join("setupkit.lock");
    let mut h = harness(Box::new(tr.env()), Policy::production_preset());
    h.api = h
        .api
        .with_lock_manager(Box::new(FileLockManager::new(lock_path.clone())))
        .with_lock_timeout_ms(100);
    let (plan, mut log) = plan_and_log(&h.api, &m);

    let rival = rival_lock_holder::hold(&lock_path);
    let err = h
        .api
        .execute(&plan, &mut log, ApplyMode::Commit)
        .expect_err("lock is held");
    assert_eq!(exit_code_for(err.error_id()), 40);
    assert!(!tr.installed("Program Files/System Monitor").exists());

    drop(rival);
    let report = h
        .api
        .execute(&plan, &mut log, ApplyMode::Commit)
        .expect("lock is free");
    assert_eq!(report.applied_count, 5);
    let summary = h.facts.named("install.summary");
    assert_eq!(summary.last().unwrap().1["lock_backend"], "file");
}
