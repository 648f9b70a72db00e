#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LockingPolicy {
    Required,
    #[default]
    Optional,
}

#[derive(Clone, Debug)]
pub struct Durability {
    /// fsync the uninstall log after every appended entry.
    pub sync_log: bool,
}

impl Default for Durability {
    fn default() -> Self {
        Self { sync_log: true }
    }
}

#[derive(Clone, Debug, Default)]
pub struct Governance {
    pub locking: LockingPolicy,
}

#[derive(Clone, Debug)]
pub struct Backup {
    pub tag: String,
}

#[derive(Clone, Debug)]
pub struct LaunchPolicy {
    /// Master switch for the post-install runner.
    pub enabled: bool,
}

impl Default for LaunchPolicy {
    fn default() -> Self {
        Self { enabled: true }
    }
}
