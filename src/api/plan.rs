//! Staging planner: manifest entries become an ordered list of resolved install steps.
//!
//! Placeholders are resolved exactly once, here, against the target
//! environment. Ordering comes from an explicit dependency pass (stable
//! topological sort, ties broken by declaration order) so the order of the
//! manifest's sections is never relied upon.
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use log::Level;
use serde_json::json;

use crate::api::errors::PlanError;
use crate::api::Installer;
use crate::constants::UNINSTALL_LOG_EXT;
use crate::fs::{file_stem_for, is_safe_path};
use crate::logging::audit::{AuditCtx, AuditMode};
use crate::logging::{AuditSink, FactsEmitter, StageLogger, TS_ZERO};
use crate::manifest::{Anchors, Manifest};
use crate::types::ids::{plan_id, step_id};
use crate::types::{InstallStep, Plan, PlanApp, RunAction, ShortcutLocation, UninstallRecord};

fn checked(what: &'static str, path: PathBuf) -> Result<PathBuf, PlanError> {
    if path.is_absolute() && is_safe_path(&path) {
        Ok(path)
    } else {
        Err(PlanError::UnsafePath { what, path })
    }
}

/// Case-insensitive identity of a resolved path, matching manifest semantics.
fn path_key(p: &Path) -> String {
    p.to_string_lossy().to_ascii_lowercase()
}

pub(super) fn build<E: FactsEmitter, A: AuditSink>(
    api: &Installer<E, A>,
    manifest: &Manifest,
) -> Result<Plan, PlanError> {
    let env = api.env();
    let root = env.resolve_install_root();
    if !root.is_absolute() {
        return Err(PlanError::RelativeRoot(root));
    }
    let root = checked("install root", root)?;
    let group = checked(
        "start menu group",
        env.resolve_group_path(&manifest.app().default_group),
    )?;
    let desktop = checked("desktop", env.resolve_desktop_path())?;
    let state_dir = checked("state directory", env.resolve_state_dir())?;

    let mut anchors = Anchors {
        install_root: root.clone(),
        app: root,
        group,
        desktop,
    };
    anchors.app = manifest.app().default_dir.resolve(&anchors);

    let app = manifest.app();
    let defaults = manifest.defaults();

    let mut dirs: Vec<PathBuf> = Vec::new();
    let mut copies: Vec<InstallStep> = Vec::new();
    for f in manifest.files() {
        let dest = f.destination().resolve(&anchors);
        if let Some(dir) = dest.parent() {
            if !dirs.iter().any(|d| d == dir) {
                dirs.push(dir.to_path_buf());
            }
        }
        let opts = f.overrides.merge(defaults);
        copies.push(InstallStep::CopyFile {
            source: f.source.clone(),
            dest,
            overwrite: opts.overwrite,
            keep_on_uninstall: opts.keep_on_uninstall,
        });
    }

    // Targets match `[Files]` destinations case-insensitively; use the file's spelling.
    let declared: HashMap<String, PathBuf> = copies
        .iter()
        .filter_map(|c| match c {
            InstallStep::CopyFile { dest, .. } => Some((path_key(dest), dest.clone())),
            _ => None,
        })
        .collect();
    let as_declared = |p: PathBuf| declared.get(&path_key(&p)).cloned().unwrap_or(p);

    let shortcuts: Vec<InstallStep> = manifest
        .shortcuts()
        .iter()
        .map(|s| InstallStep::WriteShortcut {
            name: s.name.clone(),
            target: as_declared(s.target.resolve(&anchors)),
            location: ShortcutLocation {
                placement: s.placement,
                dir: s.location.parent().resolve(&anchors),
            },
            args: s.args.clone(),
            comment: s.comment.clone(),
        })
        .collect();

    let mut nodes: Vec<InstallStep> = dirs
        .into_iter()
        .map(|path| InstallStep::MakeDir { path })
        .collect();
    nodes.extend(copies);
    nodes.extend(shortcuts);
    let mut steps = order(nodes);

    let log_path = state_dir.join(format!("{}.{UNINSTALL_LOG_EXT}", file_stem_for(&app.name)));
    steps.push(InstallStep::WriteUninstallRecord {
        record: UninstallRecord {
            app_name: app.name.clone(),
            app_version: app.version.clone(),
            publisher: app.publisher.clone(),
            install_dir: anchors.app.clone(),
            log_path: log_path.clone(),
        },
    });

    let runs = manifest
        .runs()
        .iter()
        .map(|r| RunAction {
            program: as_declared(r.target.resolve(&anchors)),
            description: r.description.clone(),
            args: r.args.clone(),
            working_dir: r.working_dir.as_ref().map(|w| w.resolve(&anchors)),
            flags: r.flags,
        })
        .collect();

    let plan = Plan {
        app: PlanApp {
            name: app.name.clone(),
            version: app.version.clone(),
            install_dir: anchors.app,
            log_path,
        },
        steps,
        runs,
    };

    emit_plan_facts(api, &plan);
    Ok(plan)
}

/// Does `before` have to run ahead of `after`?
fn depends(
    before: &InstallStep,
    after: &InstallStep,
    copy_dests: &HashMap<usize, String>,
    idx_before: usize,
) -> bool {
    match (before, after) {
        (InstallStep::MakeDir { path: a }, InstallStep::MakeDir { path: b }) => {
            a != b && b.starts_with(a)
        }
        (InstallStep::MakeDir { path: d }, InstallStep::CopyFile { dest, .. }) => {
            dest.starts_with(d)
        }
        (InstallStep::MakeDir { path: d }, InstallStep::WriteShortcut { location, .. }) => {
            location.dir.starts_with(d)
        }
        (InstallStep::CopyFile { .. }, InstallStep::WriteShortcut { target, .. }) => {
            copy_dests.get(&idx_before) == Some(&path_key(target))
        }
        _ => false,
    }
}

/// Stable topological sort: among ready steps, the earliest declared goes first.
fn order(nodes: Vec<InstallStep>) -> Vec<InstallStep> {
    let n = nodes.len();
    let copy_dests: HashMap<usize, String> = nodes
        .iter()
        .enumerate()
        .filter_map(|(i, s)| match s {
            InstallStep::CopyFile { dest, .. } => Some((i, path_key(dest))),
            _ => None,
        })
        .collect();
    let mut indegree = vec![0usize; n];
    let mut edges: Vec<Vec<usize>> = vec![Vec::new(); n];
    for i in 0..n {
        for j in 0..n {
            if i != j && depends(&nodes[i], &nodes[j], &copy_dests, i) {
                edges[i].push(j);
                indegree[j] += 1;
            }
        }
    }
    let mut done = vec![false; n];
    let mut out_idx = Vec::with_capacity(n);
    while out_idx.len() < n {
        let next = (0..n).find(|&i| !done[i] && indegree[i] == 0);
        let Some(i) = next else {
            // Unreachable for planner-built steps; keep whatever is left in declaration order.
            out_idx.extend((0..n).filter(|&i| !done[i]));
            break;
        };
        done[i] = true;
        out_idx.push(i);
        for &j in &edges[i] {
            indegree[j] -= 1;
        }
    }
    let mut slots: Vec<Option<InstallStep>> = nodes.into_iter().map(Some).collect();
    out_idx
        .into_iter()
        .filter_map(|i| slots[i].take())
        .collect()
}

fn emit_plan_facts<E: FactsEmitter, A: AuditSink>(api: &Installer<E, A>, plan: &Plan) {
    let pid_uuid = plan_id(plan);
    let tctx = AuditCtx::new(
        &api.facts as &dyn FactsEmitter,
        pid_uuid.to_string(),
        String::new(),
        TS_ZERO.to_string(),
        AuditMode {
            dry_run: true,
            redact: true,
        },
    );
    let slog = StageLogger::new(&tctx);
    for (idx, step) in plan.steps.iter().enumerate() {
        slog.plan()
            .step(step_id(&pid_uuid, step, idx).to_string())
            .path(step.path().display().to_string())
            .field("kind", json!(step.kind().as_str()))
            .field("index", json!(idx))
            .emit_success();
    }
    api.audit.log(
        Level::Info,
        &format!(
            "plan: {} {} -> {} steps into {}",
            plan.app.name,
            plan.app.version,
            plan.steps.len(),
            plan.app.install_dir.display()
        ),
    );
}
