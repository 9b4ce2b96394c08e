//! Action runners executing `ClientSideApply` manifests.
//!
//! [`ActionRegistry`] maps each [`Action`](crate::manifest::Action) to a
//! runner. `cmd` runs its arguments as a shell command line; every other
//! action locates its executable on the search path and runs it with the
//! arguments through the same shell. In dry-run mode every action resolves
//! to the [`EchoRunner`].

mod echo;
mod process;
mod registry;
mod shell;

use std::fmt;

use async_trait::async_trait;

use crate::context::Context;
use crate::error::Result;
use crate::manifest::ClientSideApplyManifest;

pub use echo::EchoRunner;
pub use registry::{ActionRegistry, RunnerSettings};
pub use shell::{ExecutableRunner, ShellRunner};

/// Captured combined output of an action.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunnerOutput {
    output: Vec<u8>,
}

impl RunnerOutput {
    /// Wraps captured bytes.
    #[must_use]
    pub const fn new(output: Vec<u8>) -> Self {
        Self { output }
    }

    /// Raw bytes.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.output
    }

    /// Output decoded as UTF-8, replacing invalid sequences.
    #[must_use]
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.output).into_owned()
    }
}

impl fmt::Display for RunnerOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text())
    }
}

/// Executes a `ClientSideApply` manifest.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ActionRunner: Send + Sync {
    /// Runs the manifest's action, honoring cancellation carried by `ctx`.
    async fn execute(
        &self,
        ctx: &Context,
        manifest: &ClientSideApplyManifest,
    ) -> Result<RunnerOutput>;
}
