use crate::adapters::{Launcher, LockManager, TargetEnv};
use crate::logging::{AuditSink, FactsEmitter};
use crate::policy::Policy;

use super::{CancelToken, Installer};

/// Builder for constructing an [`Installer`] with optional collaborators.
/// Mirrors `Installer::new(...).with_*` for call sites that assemble pieces conditionally.
pub struct InstallerBuilder<E: FactsEmitter, A: AuditSink> {
    facts: E,
    audit: A,
    policy: Policy,
    env: Box<dyn TargetEnv>,
    launcher: Option<Box<dyn Launcher>>,
    lock: Option<Box<dyn LockManager>>,
    lock_timeout_ms: Option<u64>,
    cancel: Option<CancelToken>,
}

impl<E: FactsEmitter, A: AuditSink> InstallerBuilder<E, A> {
    pub fn new(facts: E, audit: A, policy: Policy, env: Box<dyn TargetEnv>) -> Self {
        Self {
            facts,
            audit,
            policy,
            env,
            launcher: None,
            lock: None,
            lock_timeout_ms: None,
            cancel: None,
        }
    }

    #[must_use]
    pub fn launcher(mut self, launcher: Box<dyn Launcher>) -> Self {
        self.launcher = Some(launcher);
        self
    }

    #[must_use]
    pub fn lock_manager(mut self, lock: Option<Box<dyn LockManager>>) -> Self {
        self.lock = lock;
        self
    }

    #[must_use]
    pub fn lock_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.lock_timeout_ms = Some(timeout_ms);
        self
    }

    #[must_use]
    pub fn cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub fn build(self) -> Installer<E, A> {
        let mut api = Installer::new(self.facts, self.audit, self.policy, self.env);
        if let Some(l) = self.launcher {
            api = api.with_launcher(l);
        }
        if let Some(m) = self.lock {
            api = api.with_lock_manager(m);
        }
        if let Some(t) = self.lock_timeout_ms {
            api = api.with_lock_timeout_ms(t);
        }
        if let Some(c) = self.cancel {
            api = api.with_cancel_token(c);
        }
        api
    }
}
