use setupkit::api::errors::exit_code_for;
use setupkit::policy::Policy;
use setupkit::types::errors::ErrorKind;
use setupkit::types::{ApplyMode, StepKind};

use crate::helpers::{demo_manifest, harness, plan_and_log, FaultyEnv, Op, TestRoot, DEMO};

#[test]
fn cancelled_before_start_applies_nothing() {
    let tr = TestRoot::new();
    let m = demo_manifest(&tr, DEMO);
    let before = tr.snapshot();
    let h = harness(Box::new(tr.env()), Policy::default());
    let (plan, mut log) = plan_and_log(&h.api, &m);
    h.api.cancel_token().cancel();

    let err = h
        .api
        .execute(&plan, &mut log, ApplyMode::Commit)
        .expect_err("cancelled");
    assert_eq!(err.cause.kind, ErrorKind::Cancelled);
    assert_eq!(err.step_index, Some(0));
    assert_eq!(err.rolled_back, 0);
    assert_eq!(exit_code_for(err.error_id()), 20);
    assert_eq!(tr.snapshot(), before);
    assert!(h.facts.named("install.attempt").is_empty());
}

#[test]
fn cancel_between_steps_rolls_back_completed_steps() {
    let tr = TestRoot::new();
    let m = demo_manifest(&tr, DEMO);
    let before = tr.snapshot();
    let (env, faults) = FaultyEnv::new(tr.env());
    let h = harness(Box::new(env), Policy::default());
    faults.cancel_after(Op::Copy, h.api.cancel_token());
    let (plan, mut log) = plan_and_log(&h.api, &m);

    let err = h
        .api
        .execute(&plan, &mut log, ApplyMode::Commit)
        .expect_err("cancelled");
    assert_eq!(err.cause.kind, ErrorKind::Cancelled);
    assert_eq!(err.at_step, Some(StepKind::WriteShortcut));
    assert_eq!(err.step_index, Some(2));
    assert_eq!(err.rolled_back, 2);
    assert_eq!(faults.calls(Op::Shortcut), 0);
    assert_eq!(tr.snapshot(), before);
    assert!(!plan.app.log_path.exists());
}
