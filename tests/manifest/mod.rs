use std::path::Path;

use setupkit::manifest::{Manifest, Rule};
use setupkit::types::Placement;

use crate::helpers::{TestRoot, DEMO};

#[test]
fn relative_sources_resolve_against_the_manifest_directory() {
    let tr = TestRoot::new();
    let m = tr.manifest(DEMO);
    assert_eq!(
        m.files()[0].source,
        tr.build_dir().join("dist").join("SystemMonitor.exe")
    );
    assert_eq!(m.base_dir(), tr.build_dir());
    assert_eq!(m.app().publisher.as_deref(), Some("Example Corp"));
    assert_eq!(m.shortcuts()[1].placement, Placement::Desktop);
}

#[test]
fn missing_app_name_names_the_key() {
    let text = "[Setup]\nAppVersion=1.0\nDefaultDirName={autopf}\\X\n";
    let err = Manifest::parse(text, Path::new("/b")).unwrap_err();
    assert_eq!(err.rule, Rule::MissingKey("AppName"));
    assert!(err.to_string().contains("AppName"), "{err}");
}

#[test]
fn shortcut_to_an_undeclared_file_is_rejected_with_its_line() {
    let text = DEMO.replace(
        "Filename: \"{app}\\SystemMonitor.exe\"\nName: \"{autodesktop}",
        "Filename: \"{app}\\Missing.exe\"\nName: \"{autodesktop}",
    );
    let err = Manifest::parse(&text, Path::new("/b")).unwrap_err();
    assert!(matches!(err.rule, Rule::DanglingTarget(_)), "{err}");
    assert_eq!(err.entry.section, "Icons");
    assert_eq!(err.entry.line, Some(14));
    let shown = err.to_string();
    assert!(shown.contains("line 14"), "{shown}");
}

#[test]
fn unknown_flag_is_rejected() {
    let text = DEMO.replace("Flags: ignoreversion", "Flags: ignoreversion sharedfile");
    let err = Manifest::parse(&text, Path::new("/b")).unwrap_err();
    assert_eq!(err.rule, Rule::UnknownFlag("sharedfile".to_string()));
}

#[test]
fn manifest_is_rejected_before_any_side_effect() {
    let tr = TestRoot::new();
    std::fs::create_dir_all(tr.build_dir()).unwrap();
    std::fs::write(tr.manifest_path(), "[Setup]\nAppName=X\n").unwrap();
    assert!(Manifest::load(&tr.manifest_path()).is_err());
    assert!(tr.snapshot().is_empty());
}
