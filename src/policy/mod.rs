//! Policy configuration for the installer engine.
//!
//! Consumers construct a [`Policy`](crate::policy::Policy) via `Default` or
//! `production_preset()` and then customize fields before creating an
//! [`Installer`](crate::Installer).
//!
//! Submodules:
//! - `config`: policy struct and presets
//! - `types`: grouped knobs (durability, governance, backup, launch)

pub mod config;
pub mod types;

pub use config::Policy;
pub use types::LockingPolicy;
