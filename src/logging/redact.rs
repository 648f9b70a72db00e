//! Timestamps for facts and the redaction applied to dry-run facts.
use serde_json::Value;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use crate::types::plan::ApplyMode;

pub const TS_ZERO: &str = "1970-01-01T00:00:00Z";

/// Fields whose values differ between two otherwise identical runs.
const VOLATILE: &[&str] = &[
    "duration_ms",
    "lock_wait_ms",
    "run_id",
    "pid",
    "hash_alg",
    "before_hash",
    "after_hash",
];

pub fn now_iso() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_else(|_| TS_ZERO.to_string())
}

/// Dry runs stamp every fact with [`TS_ZERO`]; commits use the wall clock.
pub fn ts_for_mode(mode: ApplyMode) -> String {
    if mode == ApplyMode::DryRun {
        return TS_ZERO.to_string();
    }
    now_iso()
}

/// Zero the timestamp and drop [`VOLATILE`] fields so facts compare equal across runs.
pub fn redact_event(mut v: Value) -> Value {
    if let Value::Object(obj) = &mut v {
        obj.insert("ts".to_string(), Value::from(TS_ZERO));
        obj.retain(|k, _| !VOLATILE.contains(&k.as_str()));
    }
    v
}
