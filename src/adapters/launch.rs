use std::path::Path;
use std::process::{Command, Stdio};

/// Starts a post-install program. Implementations must not wait for it to exit.
pub trait Launcher: Send + Sync {
    /// Spawn `program` and return its process id.
    /// # Errors
    /// Returns the spawn failure; the caller treats it as a warning.
    fn launch(
        &self,
        program: &Path,
        args: &[String],
        working_dir: Option<&Path>,
    ) -> std::io::Result<u32>;
}

/// Spawns a detached child with null stdio and lets it run.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessLauncher;

impl Launcher for ProcessLauncher {
    fn launch(
        &self,
        program: &Path,
        args: &[String],
        working_dir: Option<&Path>,
    ) -> std::io::Result<u32> {
        let mut cmd = Command::new(program);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        if let Some(dir) = working_dir {
            cmd.current_dir(dir);
        }
        let child = cmd.spawn()?;
        Ok(child.id())
    }
}
