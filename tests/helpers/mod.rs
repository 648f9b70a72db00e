//! Shared helpers for the setupkit integration tests.

pub mod testroot;

use log::Level;
use serde_json::Value;
use std::sync::{Arc, Mutex};

use setupkit::adapters::TargetEnv;
use setupkit::logging::{AuditSink, FactsEmitter};
use setupkit::policy::Policy;
use setupkit::Installer;

pub use faulty_env::{FaultHandle, FaultyEnv, Op};
pub use launcher::RecordingLauncher;
pub use testroot::TestRoot;

/// A simple in-memory emitter to capture facts during tests.
#[derive(Clone, Default, Debug)]
pub struct TestEmitter {
    pub events: Arc<Mutex<Vec<(String, String, String, Value)>>>,
}

impl FactsEmitter for TestEmitter {
    fn emit(&self, subsystem: &str, event: &str, decision: &str, fields: Value) {
        self.events
            .lock()
            .unwrap()
            .push((subsystem.into(), event.into(), decision.into(), fields));
    }
}

impl TestEmitter {
    /// Events with the given name, in emission order.
    pub fn named(&self, event: &str) -> Vec<(String, Value)> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, e, _, _)| e == event)
            .map(|(_, _, d, f)| (d.clone(), f.clone()))
            .collect()
    }
}

/// A no-op audit sink for tests.
#[derive(Clone, Default)]
pub struct TestAudit;

impl AuditSink for TestAudit {
    fn log(&self, _level: Level, _msg: &str) {}
}

pub struct Harness {
    pub api: Installer<TestEmitter, TestAudit>,
    pub facts: TestEmitter,
    pub launcher: RecordingLauncher,
}

pub fn harness(env: Box<dyn TargetEnv>, policy: Policy) -> Harness {
    let facts = TestEmitter::default();
    let launcher = RecordingLauncher::default();
    let api = Installer::new(facts.clone(), TestAudit, policy, env)
        .with_launcher(Box::new(launcher.clone()));
    Harness {
        api,
        facts,
        launcher,
    }
}

/// The manifest used throughout: one program, two shortcuts, one post-install launch.
pub const DEMO: &str = r#"
; System Monitor installer
[Setup]
AppName=System Monitor
AppVersion=1.0
AppPublisher=Example Corp
DefaultDirName={autopf}\System Monitor
DefaultGroupName=System Monitor

[Files]
Source: "dist\SystemMonitor.exe"; DestDir: "{app}"; Flags: ignoreversion

[Icons]
Name: "{group}\System Monitor"; Filename: "{app}\SystemMonitor.exe"
Name: "{autodesktop}\System Monitor"; Filename: "{app}\SystemMonitor.exe"

[Run]
Filename: "{app}\SystemMonitor.exe"; Description: "Launch System Monitor"; Flags: nowait postinstall skipifsilent
"#;

/// Stage the demo payload and load the demo manifest (or a variant of it).
pub fn demo_manifest(tr: &TestRoot, text: &str) -> setupkit::manifest::Manifest {
    tr.payload("dist/SystemMonitor.exe", b"MZ system monitor 1.0");
    tr.manifest(text)
}

/// Plan `manifest` and open its uninstall log for appending.
pub fn plan_and_log(
    api: &Installer<TestEmitter, TestAudit>,
    manifest: &setupkit::manifest::Manifest,
) -> (setupkit::types::Plan, setupkit::journal::UninstallLog) {
    let plan = api.plan(manifest).expect("plan");
    let log = setupkit::journal::UninstallLog::open_append(&plan.app.log_path).expect("log");
    (plan, log)
}

pub const EXE: &str = "Program Files/System Monitor/SystemMonitor.exe";
pub const GROUP_LINK: &str = "Start Menu/Programs/System Monitor/System Monitor.desktop";
pub const DESKTOP_LINK: &str = "Desktop/System Monitor.desktop";
pub const RECORD: &str = ".setupkit/records/System_Monitor.json";
pub const LOG: &str = ".setupkit/System_Monitor.uninstall.jsonl";
