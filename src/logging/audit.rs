// Audit helpers that emit structured facts across the install lifecycle.
//
// Side-effects:
// - Emits JSON facts via `FactsEmitter` for the stages `plan`, `install.attempt`,
//   `install.result` (per step), `install.summary`, `rollback`, `rollback.summary`,
//   `uninstall`, `uninstall.summary` and `run`.
// - Ensures a minimal envelope is present on every fact: `schema_version`, `ts`,
//   `plan_id`, `path`, `dry_run`.
// - Applies redaction in dry-run to zero timestamps and drop volatile fields.
use crate::logging::redact_event;
use serde_json::{json, Value};
use uuid::Uuid;

pub(crate) const SCHEMA_VERSION: i64 = 1;
const SUBSYSTEM: &str = "setupkit";

#[derive(Clone, Debug, Default)]
pub(crate) struct AuditMode {
    pub dry_run: bool,
    pub redact: bool,
}

pub(crate) struct AuditCtx<'a> {
    pub facts: &'a dyn crate::logging::FactsEmitter,
    pub plan_id: String,
    pub run_id: String,
    pub ts: String,
    pub mode: AuditMode,
}

impl<'a> AuditCtx<'a> {
    pub(crate) fn new(
        facts: &'a dyn crate::logging::FactsEmitter,
        plan_id: String,
        run_id: String,
        ts: String,
        mode: AuditMode,
    ) -> Self {
        Self {
            facts,
            plan_id,
            run_id,
            ts,
            mode,
        }
    }
}

pub(crate) fn new_run_id() -> String {
    Uuid::new_v4().to_string()
}

/// Stage for typed audit emission.
#[derive(Clone, Copy, Debug)]
pub enum Stage {
    Plan,
    InstallAttempt,
    InstallResult,
    InstallSummary,
    Rollback,
    RollbackSummary,
    Uninstall,
    UninstallSummary,
    Run,
}

impl Stage {
    fn as_event(self) -> &'static str {
        match self {
            Stage::Plan => "plan",
            Stage::InstallAttempt => "install.attempt",
            Stage::InstallResult => "install.result",
            Stage::InstallSummary => "install.summary",
            Stage::Rollback => "rollback",
            Stage::RollbackSummary => "rollback.summary",
            Stage::Uninstall => "uninstall",
            Stage::UninstallSummary => "uninstall.summary",
            Stage::Run => "run",
        }
    }
}

/// Decision severity for audit events.
#[derive(Clone, Copy, Debug)]
pub enum Decision {
    Success,
    Failure,
    Warn,
}

impl Decision {
    fn as_str(self) -> &'static str {
        match self {
            Decision::Success => "success",
            Decision::Failure => "failure",
            Decision::Warn => "warn",
        }
    }
}

/// Builder facade over audit emission with centralized envelope+redaction.
pub struct StageLogger<'a> {
    ctx: &'a AuditCtx<'a>,
}

impl<'a> StageLogger<'a> {
    pub(crate) fn new(ctx: &'a AuditCtx<'a>) -> Self {
        Self { ctx }
    }

    pub fn plan(&'a self) -> EventBuilder<'a> {
        EventBuilder::new(self.ctx, Stage::Plan)
    }

    pub fn install_attempt(&'a self) -> EventBuilder<'a> {
        EventBuilder::new(self.ctx, Stage::InstallAttempt)
    }

    pub fn install_result(&'a self) -> EventBuilder<'a> {
        EventBuilder::new(self.ctx, Stage::InstallResult)
    }

    pub fn install_summary(&'a self) -> EventBuilder<'a> {
        EventBuilder::new(self.ctx, Stage::InstallSummary)
    }

    pub fn rollback(&'a self) -> EventBuilder<'a> {
        EventBuilder::new(self.ctx, Stage::Rollback)
    }

    pub fn rollback_summary(&'a self) -> EventBuilder<'a> {
        EventBuilder::new(self.ctx, Stage::RollbackSummary)
    }

    pub fn uninstall(&'a self) -> EventBuilder<'a> {
        EventBuilder::new(self.ctx, Stage::Uninstall)
    }

    pub fn uninstall_summary(&'a self) -> EventBuilder<'a> {
        EventBuilder::new(self.ctx, Stage::UninstallSummary)
    }

    pub fn run(&'a self) -> EventBuilder<'a> {
        EventBuilder::new(self.ctx, Stage::Run)
    }
}

pub struct EventBuilder<'a> {
    ctx: &'a AuditCtx<'a>,
    stage: Stage,
    fields: serde_json::Map<String, Value>,
}

impl<'a> EventBuilder<'a> {
    fn new(ctx: &'a AuditCtx<'a>, stage: Stage) -> Self {
        let mut fields = serde_json::Map::new();
        fields.insert("stage".to_string(), json!(stage.as_event()));
        Self { ctx, stage, fields }
    }

    pub fn step(mut self, step_id: impl Into<String>) -> Self {
        self.fields.insert("step_id".into(), json!(step_id.into()));
        self
    }

    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.fields.insert("path".into(), json!(path.into()));
        self
    }

    pub fn field(mut self, key: &str, value: Value) -> Self {
        self.fields.insert(key.to_string(), value);
        self
    }

    pub fn merge(mut self, extra: Value) -> Self {
        if let Some(obj) = extra.as_object() {
            for (k, v) in obj {
                self.fields.insert(k.clone(), v.clone());
            }
        }
        self
    }

    pub fn emit(self, decision: Decision) {
        let mut fields = Value::Object(self.fields);
        if let Some(obj) = fields.as_object_mut() {
            obj.entry("decision").or_insert(json!(decision.as_str()));
        }
        redact_and_emit(self.ctx, self.stage.as_event(), decision.as_str(), fields);
    }

    pub fn emit_success(self) { self.emit(Decision::Success) }
    pub fn emit_failure(self) { self.emit(Decision::Failure) }
    pub fn emit_warn(self) { self.emit(Decision::Warn) }
}

fn redact_and_emit(ctx: &AuditCtx, event: &str, decision: &str, mut fields: Value) {
    if let Some(obj) = fields.as_object_mut() {
        obj.entry("schema_version").or_insert(json!(SCHEMA_VERSION));
        obj.entry("ts").or_insert(json!(ctx.ts));
        obj.entry("plan_id").or_insert(json!(ctx.plan_id));
        obj.entry("run_id").or_insert(json!(ctx.run_id));
        obj.entry("path").or_insert(json!(""));
        obj.entry("dry_run").or_insert(json!(ctx.mode.dry_run));
    }
    let out = if ctx.mode.redact {
        redact_event(fields)
    } else {
        fields
    };
    ctx.facts.emit(SUBSYSTEM, event, decision, out);
}
