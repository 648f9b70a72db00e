use std::collections::BTreeSet;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use proptest::prelude::*;

use setupkit::adapters::LocalEnv;
use setupkit::manifest::Manifest;
use setupkit::policy::Policy;
use setupkit::types::InstallStep;

use crate::helpers::harness;

fn dest_dir(outer: u8, inner: u8) -> String {
    match (outer, inner) {
        (0, _) => "{app}".to_string(),
        (o, 0) => format!("{{app}}\\d{o}"),
        (o, i) => format!("{{app}}\\d{o}\\e{i}"),
    }
}

fn manifest_text(layout: &[(u8, u8, bool)]) -> String {
    let mut s = String::from(
        "[Setup]\nAppName=Layout\nAppVersion=1.0\nDefaultDirName={autopf}\\Layout\n[Files]\n",
    );
    for (i, (o, n, _)) in layout.iter().enumerate() {
        let _ = writeln!(s, "Source: \"f{i}.bin\"; DestDir: \"{}\"", dest_dir(*o, *n));
    }
    s.push_str("[Icons]\n");
    for (i, (o, n, link)) in layout.iter().enumerate() {
        if *link {
            let at = if i % 2 == 0 { "{group}" } else { "{autodesktop}" };
            let _ = writeln!(
                s,
                "Name: \"{at}\\s{i}\"; Filename: \"{}\\f{i}.bin\"",
                dest_dir(*o, *n)
            );
        }
    }
    s
}

fn position(steps: &[InstallStep], pred: impl Fn(&InstallStep) -> bool) -> usize {
    steps.iter().position(pred).expect("step present")
}

proptest! {
    #[test]
    fn planned_steps_follow_their_dependencies(
        layout in prop::collection::vec((0u8..3, 0u8..3, any::<bool>()), 1..8)
    ) {
        let m = Manifest::parse(&manifest_text(&layout), Path::new("/build")).unwrap();
        let h = harness(Box::new(LocalEnv::rooted(Path::new("/sandbox"))), Policy::default());
        let plan = h.api.plan(&m).unwrap();
        let steps = &plan.steps;

        prop_assert!(
            matches!(steps.last(), Some(InstallStep::WriteUninstallRecord { .. })),
            "record is not the last step: {:?}",
            steps.last()
        );

        let mut dirs = BTreeSet::new();
        for (i, step) in steps.iter().enumerate() {
            match step {
                InstallStep::MakeDir { path } => {
                    prop_assert!(dirs.insert(path.clone()), "duplicate MakeDir {}", path.display());
                    for (j, other) in steps.iter().enumerate() {
                        if let InstallStep::MakeDir { path: p } = other {
                            if p != path && path.starts_with(p) {
                                prop_assert!(j < i, "{} before its parent", path.display());
                            }
                        }
                    }
                }
                InstallStep::CopyFile { dest, .. } => {
                    let parent: PathBuf = dest.parent().unwrap().to_path_buf();
                    let mk = position(steps, |s| {
                        matches!(s, InstallStep::MakeDir { path } if *path == parent)
                    });
                    prop_assert!(mk < i, "{} copied before its directory", dest.display());
                }
                InstallStep::WriteShortcut { target, .. } => {
                    let cp = position(steps, |s| {
                        matches!(s, InstallStep::CopyFile { dest, .. } if dest == target)
                    });
                    prop_assert!(cp < i, "shortcut to {} before its copy", target.display());
                }
                InstallStep::WriteUninstallRecord { .. } => prop_assert_eq!(i, steps.len() - 1),
            }
        }

        let expected: BTreeSet<PathBuf> = steps
            .iter()
            .filter_map(|s| match s {
                InstallStep::CopyFile { dest, .. } => dest.parent().map(Path::to_path_buf),
                _ => None,
            })
            .collect();
        prop_assert_eq!(dirs, expected);
    }
}
