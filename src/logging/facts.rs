use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

use log::Level;
use serde_json::{json, Value};

pub trait FactsEmitter {
    fn emit(&self, subsystem: &str, event: &str, decision: &str, fields: Value);
}

pub trait AuditSink {
    fn log(&self, level: Level, msg: &str);
}

/// Facts as JSON lines appended to a file; audit lines go to the `log` facade.
///
/// `JsonlSink::default()` has no file and drops facts, which is what tests
/// and library callers that only want `log` output use.
#[derive(Default)]
pub struct JsonlSink {
    out: Option<Mutex<File>>,
}

impl JsonlSink {
    /// Append facts to `path`, creating it if needed.
    ///
    /// # Errors
    ///
    /// Returns an IO error if the file cannot be opened for appending.
    pub fn to_file(path: &Path) -> std::io::Result<Self> {
        let f = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            out: Some(Mutex::new(f)),
        })
    }
}

impl FactsEmitter for JsonlSink {
    fn emit(&self, subsystem: &str, event: &str, decision: &str, fields: Value) {
        let Some(out) = &self.out else { return };
        let line = json!({
            "subsystem": subsystem,
            "event": event,
            "decision": decision,
            "fields": fields,
        });
        if let Ok(mut f) = out.lock() {
            if let Err(e) = writeln!(f, "{line}") {
                log::warn!("facts: dropping {event} fact: {e}");
            }
        }
    }
}

impl AuditSink for JsonlSink {
    fn log(&self, level: Level, msg: &str) {
        log::log!(target: "setupkit::audit", level, "{msg}");
    }
}
