use setupkit::journal::UninstallLog;
use setupkit::policy::Policy;
use setupkit::types::{ApplyMode, SkipReason};

use crate::helpers::{
    demo_manifest, harness, plan_and_log, TestRoot, DEMO, DESKTOP_LINK, EXE, RECORD,
};

#[test]
fn uninstall_restores_the_pre_install_tree() {
    let tr = TestRoot::new();
    let m = demo_manifest(&tr, DEMO);
    std::fs::create_dir_all(tr.installed("Program Files/Other App")).unwrap();
    std::fs::write(tr.installed("Program Files/Other App/readme.txt"), b"keep me").unwrap();
    let before = tr.snapshot();
    let h = harness(Box::new(tr.env()), Policy::default());
    let (plan, mut log) = plan_and_log(&h.api, &m);
    h.api.execute(&plan, &mut log, ApplyMode::Commit).unwrap();
    assert_ne!(tr.snapshot(), before);

    let mut log = UninstallLog::open(&plan.app.log_path).unwrap();
    let report = h.api.uninstall(&mut log).expect("uninstall");
    assert_eq!(report.reversed, 5);
    assert!(report.skipped.is_empty());
    assert_eq!(tr.snapshot(), before);
    assert!(!plan.app.log_path.exists());
    assert!(!tr.installed(RECORD).exists());

    let facts = h.facts.named("uninstall");
    let seqs: Vec<u64> = facts.iter().map(|(_, f)| f["seq"].as_u64().unwrap()).collect();
    assert_eq!(seqs, vec![5, 4, 3, 2, 1]);
    let summary = h.facts.named("uninstall.summary");
    assert_eq!(summary[0].0, "success");
    assert_eq!(summary[0].1["reversed"], 5);
}

#[test]
fn missing_targets_are_skipped_and_the_pass_continues() {
    let tr = TestRoot::new();
    let m = demo_manifest(&tr, DEMO);
    let before = tr.snapshot();
    let h = harness(Box::new(tr.env()), Policy::default());
    let (plan, mut log) = plan_and_log(&h.api, &m);
    h.api.execute(&plan, &mut log, ApplyMode::Commit).unwrap();

    std::fs::remove_file(tr.installed(EXE)).unwrap();
    std::fs::remove_file(tr.installed(DESKTOP_LINK)).unwrap();

    let mut log = UninstallLog::open(&plan.app.log_path).unwrap();
    let report = h.api.uninstall(&mut log).expect("uninstall tolerates missing files");
    assert_eq!(report.reversed, 3);
    let skipped: Vec<_> = report.skipped.iter().map(|s| (s.seq, s.reason)).collect();
    assert_eq!(
        skipped,
        vec![(4, SkipReason::Missing), (2, SkipReason::Missing)]
    );
    assert_eq!(tr.snapshot(), before);
}

#[test]
fn kept_files_survive_uninstall_with_their_directory() {
    let tr = TestRoot::new();
    let text = DEMO.replace("Flags: ignoreversion", "Flags: ignoreversion uninsneveruninstall");
    let m = demo_manifest(&tr, &text);
    let h = harness(Box::new(tr.env()), Policy::default());
    let (plan, mut log) = plan_and_log(&h.api, &m);
    h.api.execute(&plan, &mut log, ApplyMode::Commit).unwrap();

    let mut log = UninstallLog::open(&plan.app.log_path).unwrap();
    let report = h.api.uninstall(&mut log).expect("uninstall");
    let reasons: Vec<SkipReason> = report.skipped.iter().map(|s| s.reason).collect();
    assert_eq!(reasons, vec![SkipReason::Kept, SkipReason::NotEmpty]);
    assert_eq!(std::fs::read(tr.installed(EXE)).unwrap(), b"MZ system monitor 1.0");
    assert!(!tr.installed(DESKTOP_LINK).exists());
    assert!(!plan.app.log_path.exists());
}

#[test]
fn overwritten_file_gets_its_original_content_back() {
    let tr = TestRoot::new();
    let m = demo_manifest(&tr, DEMO);
    std::fs::create_dir_all(tr.installed("Program Files/System Monitor")).unwrap();
    std::fs::write(tr.installed(EXE), b"MZ system monitor 0.9").unwrap();
    let before = tr.snapshot();
    let h = harness(Box::new(tr.env()), Policy::default());
    let (plan, mut log) = plan_and_log(&h.api, &m);

    let report = h.api.execute(&plan, &mut log, ApplyMode::Commit).unwrap();
    assert_eq!(report.files_changed, 1);
    assert_eq!(std::fs::read(tr.installed(EXE)).unwrap(), b"MZ system monitor 1.0");

    let mut log = UninstallLog::open(&plan.app.log_path).unwrap();
    h.api.uninstall(&mut log).expect("uninstall");
    assert_eq!(tr.snapshot(), before);
}
