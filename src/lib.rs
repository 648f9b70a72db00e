#![forbid(unsafe_code)]
//! setupkit: manifest-driven install, rollback and uninstall.
//!
//! Pipeline:
//! - [`manifest::Manifest`] loads and validates a `[Setup]`/`[Files]`/`[Icons]`/`[Run]` manifest.
//! - [`Installer::plan`] resolves placeholders once and orders install steps by dependency.
//! - [`Installer::execute`] applies steps in sequence, journaling each one to a durable
//!   [`journal::UninstallLog`], and rolls back this run's steps on failure.
//! - [`Installer::uninstall`] replays a log in reverse to remove an install.
//! - [`Installer::maybe_run`] launches a post-install program without waiting on it.
//!
//! All side effects go through the [`adapters::TargetEnv`] trait; [`adapters::LocalEnv`]
//! implements it on the local filesystem.

pub mod adapters;
pub mod api;
pub mod constants;
pub mod fs;
pub mod journal;
pub mod logging;
pub mod manifest;
pub mod policy;
pub mod types;

pub use api::*;
