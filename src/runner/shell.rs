//! Runners backed by a shell.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use crate::context::Context;
use crate::error::{ApplyError, Result};
use crate::manifest::ClientSideApplyManifest;

use super::process::run_shell;
use super::{ActionRunner, RunnerOutput};

/// Runs the manifest arguments, joined by spaces, as one shell command line.
#[derive(Debug, Clone)]
pub struct ShellRunner {
    shell: PathBuf,
    mirror: bool,
}

impl ShellRunner {
    /// Creates a runner using `shell -c`.
    #[must_use]
    pub fn new(shell: impl Into<PathBuf>) -> Self {
        Self {
            shell: shell.into(),
            mirror: true,
        }
    }

    /// Enables or disables mirroring output to this process's streams.
    #[must_use]
    pub const fn with_mirror(mut self, mirror: bool) -> Self {
        self.mirror = mirror;
        self
    }

    /// Shell used to run command lines.
    #[must_use]
    pub fn shell(&self) -> &Path {
        &self.shell
    }

    async fn run_line(&self, ctx: &Context, line: &str) -> Result<RunnerOutput> {
        run_shell(ctx, &self.shell, line, self.mirror)
            .await
            .map(RunnerOutput::new)
    }
}

#[async_trait]
impl ActionRunner for ShellRunner {
    async fn execute(
        &self,
        ctx: &Context,
        manifest: &ClientSideApplyManifest,
    ) -> Result<RunnerOutput> {
        self.run_line(ctx, &manifest.spec.args.join(" ")).await
    }
}

/// Runs an executable found on the search path with the manifest arguments.
#[derive(Debug, Clone)]
pub struct ExecutableRunner {
    executable: PathBuf,
    shell: ShellRunner,
}

impl ExecutableRunner {
    /// Runs `executable` through `shell`.
    #[must_use]
    pub const fn new(executable: PathBuf, shell: ShellRunner) -> Self {
        Self { executable, shell }
    }

    /// Looks `name` up on the search path.
    ///
    /// # Errors
    ///
    /// Returns [`ApplyError::ExecutableNotFound`] if no such executable exists.
    pub fn locate(name: &str, shell: ShellRunner) -> Result<Self> {
        let executable = which::which(name).map_err(|_| ApplyError::ExecutableNotFound {
            name: name.to_string(),
        })?;
        debug!("Resolved {} to {}", name, executable.display());
        Ok(Self::new(executable, shell))
    }

    /// Resolved executable path.
    #[must_use]
    pub fn executable(&self) -> &Path {
        &self.executable
    }

    /// Command line run for `args`.
    #[must_use]
    pub fn command_line(&self, args: &[String]) -> String {
        std::iter::once(self.executable.display().to_string())
            .chain(args.iter().cloned())
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[async_trait]
impl ActionRunner for ExecutableRunner {
    async fn execute(
        &self,
        ctx: &Context,
        manifest: &ClientSideApplyManifest,
    ) -> Result<RunnerOutput> {
        self.shell
            .run_line(ctx, &self.command_line(&manifest.spec.args))
            .await
    }
}
