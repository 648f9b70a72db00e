use crate::constants::DEFAULT_BACKUP_TAG;

use super::types::{Backup, Durability, Governance, LaunchPolicy, LockingPolicy};

/// Policy governs durability, locking, backups and post-install launching.
///
/// Grouped fields provide clearer ownership and ergonomics.
#[derive(Clone, Debug)]
pub struct Policy {
    pub durability: Durability,
    pub governance: Governance,
    pub backup: Backup,
    pub launch: LaunchPolicy,
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            durability: Durability::default(),
            governance: Governance::default(),
            backup: Backup { tag: DEFAULT_BACKUP_TAG.to_string() },
            launch: LaunchPolicy::default(),
        }
    }
}

impl Policy {
    /// Construct a Policy configured with recommended **production defaults**.
    ///
    /// Enables:
    /// - `governance.locking = Required`: a commit without a `LockManager` fails
    ///   before its first step with `error_id=E_LOCKING` (`exit_code=40`).
    /// - `durability.sync_log = true`
    ///
    /// # Example
    /// ```rust
    /// use setupkit::policy::Policy;
    /// use setupkit::adapters::{FileLockManager, LocalEnv};
    /// use setupkit::{Installer, logging::JsonlSink};
    ///
    /// let policy = Policy::production_preset();
    /// let env = LocalEnv::rooted(std::path::Path::new("/tmp/sandbox"));
    /// let lock = FileLockManager::new(std::path::PathBuf::from("/tmp/lock"));
    /// let api = Installer::new(JsonlSink::default(), JsonlSink::default(), policy, Box::new(env))
    ///     .with_lock_manager(Box::new(lock));
    /// # let _ = api;
    /// ```
    #[must_use]
    pub fn production_preset() -> Self {
        let mut p = Self::default();
        p.apply_production_preset();
        p
    }

    /// Mutate this Policy to apply the recommended **production defaults**.
    pub fn apply_production_preset(&mut self) -> &mut Self {
        self.governance.locking = LockingPolicy::Required;
        self.durability.sync_log = true;
        self
    }
}
