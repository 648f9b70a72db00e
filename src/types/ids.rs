//! Deterministic UUIDv5 identifiers for plans and steps.
//!
//! The UUID namespace is derived from a stable tag (`NS_TAG`) so that
//! `plan_id` and `step_id` are reproducible across runs for the same
//! serialized step sequence.
use std::fmt::Write;
use uuid::Uuid;

use super::plan::{InstallStep, Plan};
use crate::constants::NS_TAG;

fn namespace() -> Uuid {
    Uuid::new_v5(&Uuid::NAMESPACE_URL, NS_TAG.as_bytes())
}

/// Serialize a step into a stable, human-readable string used for UUIDv5 input.
fn serialize_step(s: &InstallStep) -> String {
    match s {
        InstallStep::MakeDir { path } => format!("D:{}", path.display()),
        InstallStep::CopyFile {
            source,
            dest,
            overwrite,
            ..
        } => format!(
            "C:{}->{}:{}",
            source.display(),
            dest.display(),
            overwrite.as_str()
        ),
        InstallStep::WriteShortcut {
            name,
            target,
            location,
            ..
        } => format!(
            "S:{}/{}->{}",
            location.dir.display(),
            name,
            target.display()
        ),
        InstallStep::WriteUninstallRecord { record } => {
            format!("U:{}@{}", record.app_name, record.app_version)
        }
    }
}

/// Compute a deterministic UUIDv5 for a plan by serializing steps in order.
///
/// Two plans with identical step sequences (including ordering) will have the
/// same `plan_id`.
#[must_use]
pub fn plan_id(plan: &Plan) -> Uuid {
    let ns = namespace();
    let mut s = format!("{}@{}\n", plan.app.name, plan.app.version);
    for step in &plan.steps {
        s.push_str(&serialize_step(step));
        s.push('\n');
    }
    Uuid::new_v5(&ns, s.as_bytes())
}

/// Compute a deterministic UUIDv5 for a step as a function of the plan ID and
/// the step's serialized form, including the stable position index.
#[must_use]
pub fn step_id(plan_id: &Uuid, step: &InstallStep, idx: usize) -> Uuid {
    let mut s = serialize_step(step);
    let _ = write!(s, "#{idx}");
    Uuid::new_v5(plan_id, s.as_bytes())
}
