use serde_json::{json, Value};

use crate::api::errors::{exit_code_for, id_str, ErrorId};
use crate::logging::StageLogger;
use crate::types::InstallReport;

/// Fields of the final `install.summary` fact, built up as the run ends.
pub(super) struct InstallSummary {
    fields: Value,
}

impl InstallSummary {
    pub(super) fn new(lock_backend: &str, lock_wait_ms: Option<u64>) -> Self {
        Self {
            fields: json!({
                "lock_backend": lock_backend,
                "lock_wait_ms": lock_wait_ms,
            }),
        }
    }

    fn insert(&mut self, key: &str, value: Value) {
        if let Some(obj) = self.fields.as_object_mut() {
            obj.insert(key.to_string(), value);
        }
    }

    pub(super) fn counts(mut self, report: &InstallReport) -> Self {
        self.insert("applied_count", json!(report.applied_count));
        self.insert("files_changed", json!(report.files_changed));
        self.insert("files_skipped", json!(report.files_skipped));
        self.insert("duration_ms", json!(report.duration_ms));
        self
    }

    pub(super) fn error(mut self, id: ErrorId, msg: &str) -> Self {
        self.insert("error_id", json!(id_str(id)));
        self.insert("exit_code", json!(exit_code_for(id)));
        self.insert("error", json!(msg));
        self
    }

    pub(super) fn rollback(mut self, reversed: usize, failed: usize) -> Self {
        self.insert("rolled_back", json!(reversed));
        self.insert("rollback_failed", json!(failed));
        self
    }

    pub(super) fn emit(self, slog: &StageLogger<'_>, success: bool) {
        let ev = slog.install_summary().merge(self.fields);
        if success {
            ev.emit_success();
        } else {
            ev.emit_failure();
        }
    }
}
