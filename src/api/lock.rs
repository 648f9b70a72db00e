use std::time::Instant;

use log::Level;

use crate::adapters::LockGuard;
use crate::api::Installer;
use crate::logging::{AuditSink, FactsEmitter};
use crate::policy::LockingPolicy;
use crate::types::errors::{Error, ErrorKind};

pub(super) struct LockInfo {
    pub backend: &'static str,
    pub wait_ms: Option<u64>,
    pub _guard: Option<Box<dyn LockGuard>>,
}

/// Take the process lock for a mutating run, honoring the locking policy.
pub(super) fn acquire<E: FactsEmitter, A: AuditSink>(
    api: &Installer<E, A>,
    stage: &str,
) -> Result<LockInfo, Error> {
    if let Some(mgr) = &api.lock {
        let t0 = Instant::now();
        let guard = mgr.acquire_process_lock(api.lock_timeout_ms).map_err(|e| {
            api.audit
                .log(Level::Error, &format!("{stage}: lock acquisition failed: {e}"));
            if e.kind == ErrorKind::Locking {
                e
            } else {
                Error::new(ErrorKind::Locking, e.msg)
            }
        })?;
        let wait_ms = u64::try_from(t0.elapsed().as_millis()).unwrap_or(u64::MAX);
        return Ok(LockInfo {
            backend: "file",
            wait_ms: Some(wait_ms),
            _guard: Some(guard),
        });
    }
    if api.policy.governance.locking == LockingPolicy::Required {
        api.audit.log(
            Level::Error,
            &format!("{stage}: locking required but no lock manager configured"),
        );
        return Err(Error::new(
            ErrorKind::Locking,
            "lock manager required by policy",
        ));
    }
    api.audit.log(
        Level::Warn,
        &format!("{stage}: no lock manager configured; proceeding unlocked"),
    );
    Ok(LockInfo {
        backend: "none",
        wait_ms: None,
        _guard: None,
    })
}
