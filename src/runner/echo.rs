//! Dry-run runner printing manifests instead of executing them.

use std::fmt::Write as _;
use std::io::Write as _;

use async_trait::async_trait;

use crate::context::Context;
use crate::error::Result;
use crate::manifest::ClientSideApplyManifest;

use super::{ActionRunner, RunnerOutput};

/// Renders the manifest and optionally writes it to stdout.
#[derive(Debug, Clone, Copy)]
pub struct EchoRunner {
    print: bool,
}

impl Default for EchoRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl EchoRunner {
    /// Creates a runner that prints to stdout.
    #[must_use]
    pub const fn new() -> Self {
        Self { print: true }
    }

    /// Creates a runner that only returns the rendering.
    #[must_use]
    pub const fn silent() -> Self {
        Self { print: false }
    }

    /// Text printed for `manifest`.
    #[must_use]
    pub fn render(manifest: &ClientSideApplyManifest) -> String {
        let mut out = String::from("ClientSideApply:\n");
        let _ = writeln!(out, "  OnFailure: {}", manifest.spec.on_failure);
        let _ = writeln!(out, "  Action: {}", manifest.spec.action);
        out.push_str("  Args:\n");
        for arg in &manifest.spec.args {
            let _ = writeln!(out, "    - {arg}");
        }
        out
    }
}

#[async_trait]
impl ActionRunner for EchoRunner {
    async fn execute(
        &self,
        _ctx: &Context,
        manifest: &ClientSideApplyManifest,
    ) -> Result<RunnerOutput> {
        let text = Self::render(manifest);
        if self.print {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(text.as_bytes())?;
            stdout.flush()?;
        }
        Ok(RunnerOutput::new(text.into_bytes()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::{Action, OnFailure};

    #[tokio::test]
    async fn test_echo_renders_manifest() {
        let manifest = ClientSideApplyManifest::new(Action::Kubectl, ["apply", "-f x.yaml"])
            .with_on_failure(OnFailure::Continue);
        let out = EchoRunner::silent()
            .execute(&Context::new(), &manifest)
            .await
            .unwrap();
        assert_eq!(
            out.text(),
            "ClientSideApply:\n  OnFailure: continue\n  Action: kubectl\n  Args:\n    - apply\n    - -f x.yaml\n"
        );
    }
}
