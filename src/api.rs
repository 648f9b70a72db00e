// Facade for the installer engine; delegates to submodules under src/api/

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::adapters::{Launcher, LockManager, ProcessLauncher, TargetEnv};
use crate::constants::DEFAULT_LOCK_TIMEOUT_MS;
use crate::journal::UninstallLog;
use crate::logging::{AuditSink, FactsEmitter};
use crate::manifest::Manifest;
use crate::policy::Policy;
use crate::types::{ApplyMode, InstallReport, Plan, RunAction, UninstallReport};

pub mod builder;
pub mod errors;
mod execute;
mod lock;
mod plan;
pub mod runner;
mod uninstall;

pub use builder::InstallerBuilder;
pub use errors::{InstallError, PlanError, RunnerWarning, UninstallError};
pub use runner::{RunFlags, RunOutcome, SkipRun};

/// Shared flag checked between install steps. Clones observe the same flag.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

pub struct Installer<E: FactsEmitter, A: AuditSink> {
    facts: E,
    audit: A,
    policy: Policy,
    env: Box<dyn TargetEnv>,
    launcher: Box<dyn Launcher>,
    lock: Option<Box<dyn LockManager>>, // None in dev/test; required by the production preset
    lock_timeout_ms: u64,
    cancel: CancelToken,
}

impl<E: FactsEmitter, A: AuditSink> Installer<E, A> {
    pub fn new(facts: E, audit: A, policy: Policy, env: Box<dyn TargetEnv>) -> Self {
        Self {
            facts,
            audit,
            policy,
            env,
            launcher: Box::new(ProcessLauncher),
            lock: None,
            lock_timeout_ms: DEFAULT_LOCK_TIMEOUT_MS,
            cancel: CancelToken::default(),
        }
    }

    #[must_use]
    pub fn with_launcher(mut self, launcher: Box<dyn Launcher>) -> Self {
        self.launcher = launcher;
        self
    }

    #[must_use]
    pub fn with_lock_manager(mut self, lock: Box<dyn LockManager>) -> Self {
        self.lock = Some(lock);
        self
    }

    #[must_use]
    pub fn with_lock_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.lock_timeout_ms = timeout_ms;
        self
    }

    #[must_use]
    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Token that aborts a running `execute` at the next step boundary.
    #[must_use]
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    #[must_use]
    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    #[must_use]
    pub fn env(&self) -> &dyn TargetEnv {
        self.env.as_ref()
    }

    /// Turn a validated manifest into an ordered step list. Never touches the filesystem.
    ///
    /// # Errors
    ///
    /// Returns `PlanError` when the environment resolves an unusable location.
    pub fn plan(&self, manifest: &Manifest) -> Result<Plan, PlanError> {
        plan::build(self, manifest)
    }

    /// Run `plan`, recording each applied step in `log`. Rolls back on failure.
    ///
    /// # Errors
    ///
    /// Returns `InstallError` naming the failed step once rollback has finished.
    pub fn execute(
        &self,
        plan: &Plan,
        log: &mut UninstallLog,
        mode: ApplyMode,
    ) -> Result<InstallReport, InstallError> {
        execute::run(self, plan, log, mode)
    }

    /// Reverse every entry of `log`, newest first, and discard it on success.
    ///
    /// # Errors
    ///
    /// Returns `UninstallError` at the first reversal that fails for a reason
    /// other than a missing target; `log` then holds the entries not reversed.
    pub fn uninstall(&self, log: &mut UninstallLog) -> Result<UninstallReport, UninstallError> {
        uninstall::run(self, log)
    }

    /// Launch `run` if the install succeeded and the flags allow it.
    pub fn maybe_run(
        &self,
        run: &RunAction,
        install: &Result<InstallReport, InstallError>,
        flags: &RunFlags,
    ) -> RunOutcome {
        runner::maybe_run(self, run, install, flags)
    }

    /// `maybe_run` over every run action of `plan`, in declaration order.
    pub fn run_post_install(
        &self,
        plan: &Plan,
        install: &Result<InstallReport, InstallError>,
        flags: &RunFlags,
    ) -> Vec<RunOutcome> {
        plan.runs
            .iter()
            .map(|r| runner::maybe_run(self, r, install, flags))
            .collect()
    }
}
