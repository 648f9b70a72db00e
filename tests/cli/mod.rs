use std::path::Path;
use std::process::{Command, Output, Stdio};

use crate::helpers::{TestRoot, DEMO, EXE, RECORD};

fn setupkit(root: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_setupkit"))
        .arg("--root")
        .arg(root)
        .args(args)
        .stdin(Stdio::null())
        .output()
        .expect("run setupkit")
}

fn manifest_arg(tr: &TestRoot) -> String {
    tr.manifest_path().display().to_string()
}

/// The process lock file is the only thing the CLI leaves in the target.
fn assert_only_lock_left(tr: &TestRoot) {
    let left: Vec<String> = tr.snapshot().into_keys().collect();
    assert_eq!(left, vec![".setupkit", ".setupkit/setupkit.lock"]);
}

#[test]
fn validate_rejects_bad_manifest_with_validation_exit_code() {
    let tr = TestRoot::new();
    std::fs::create_dir_all(tr.build_dir()).unwrap();
    std::fs::write(tr.manifest_path(), "[Setup]\nAppVersion=1\n").unwrap();
    let out = setupkit(&tr.target(), &["validate", &manifest_arg(&tr)]);
    assert_eq!(out.status.code(), Some(10));
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("AppName"), "{stderr}");
}

#[test]
fn plan_prints_steps_as_json() {
    let tr = TestRoot::new();
    tr.payload("dist/SystemMonitor.exe", b"MZ");
    tr.manifest(DEMO);
    let out = setupkit(&tr.target(), &["plan", &manifest_arg(&tr)]);
    assert_eq!(out.status.code(), Some(0));
    let plan: serde_json::Value = serde_json::from_slice(&out.stdout).expect("json plan");
    assert_eq!(plan["steps"].as_array().map(Vec::len), Some(5));
    assert_eq!(plan["steps"][0]["kind"], "make_dir");
    assert!(tr.snapshot().is_empty());
}

#[test]
fn silent_install_then_uninstall_by_app_name() {
    let tr = TestRoot::new();
    tr.payload("dist/SystemMonitor.exe", b"MZ system monitor 1.0");
    tr.manifest(DEMO);
    let facts = tr.path().join("facts.jsonl");

    let out = Command::new(env!("CARGO_BIN_EXE_setupkit"))
        .arg("--root")
        .arg(tr.target())
        .arg("--facts")
        .arg(&facts)
        .args(["install", "--silent", &manifest_arg(&tr)])
        .stdin(Stdio::null())
        .output()
        .unwrap();
    assert_eq!(
        out.status.code(),
        Some(0),
        "{}",
        String::from_utf8_lossy(&out.stderr)
    );
    assert!(tr.installed(EXE).is_file());
    assert!(tr.installed(RECORD).is_file());
    let lines = std::fs::read_to_string(&facts).unwrap();
    assert!(lines
        .lines()
        .filter_map(|l| serde_json::from_str::<serde_json::Value>(l).ok())
        .any(|v| v["event"] == "install.summary" && v["decision"] == "success"));

    let out = setupkit(
        &tr.target(),
        &["uninstall", "--app", "System Monitor", "--silent"],
    );
    assert_eq!(
        out.status.code(),
        Some(0),
        "{}",
        String::from_utf8_lossy(&out.stderr)
    );
    assert_only_lock_left(&tr);
}

#[test]
fn missing_source_fails_install_and_leaves_nothing_behind() {
    let tr = TestRoot::new();
    tr.manifest(DEMO);
    let out = setupkit(&tr.target(), &["install", "--silent", &manifest_arg(&tr)]);
    assert_eq!(out.status.code(), Some(20));
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("copy_file"), "{stderr}");
    assert_only_lock_left(&tr);
}
