//! Sequential bundle execution with per-bundle failure policy.

use serde::Serialize;
use sha2::{Digest, Sha256};
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::context::Context;
use crate::error::{ApplyError, CribError, Result};
use crate::manifest::{Action, ClientSideApplyManifest, ManifestBundle, OnFailure};
use crate::runner::ActionRegistry;

/// Serializes bundle application across the process.
static APPLY_GATE: Mutex<()> = Mutex::const_new(());

/// How a bundle ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BundleOutcome {
    /// The action succeeded.
    Applied,
    /// The action failed under the continue policy.
    Continued,
}

/// Record of one applied bundle.
#[derive(Debug, Clone, Serialize)]
pub struct BundleReport {
    /// Comma-joined manifest paths.
    pub bundle: String,
    /// Whether the bundle ran through a local action.
    pub local: bool,
    /// Action that ran.
    pub action: Action,
    /// Outcome.
    pub outcome: BundleOutcome,
    /// Captured output, or the error for continued failures.
    pub output: String,
}

/// Reports and continued errors of one run.
#[derive(Debug, Default)]
pub(crate) struct Execution {
    pub(crate) reports: Vec<BundleReport>,
    pub(crate) continued: Vec<CribError>,
}

/// Applies bundles in order through an [`ActionRegistry`].
#[derive(Debug)]
pub(crate) struct BundleExecutor<'a> {
    registry: &'a ActionRegistry,
    kubectl_wait: bool,
}

impl<'a> BundleExecutor<'a> {
    pub(crate) const fn new(registry: &'a ActionRegistry, kubectl_wait: bool) -> Self {
        Self {
            registry,
            kubectl_wait,
        }
    }

    /// Runs every bundle. Continue-policy failures are recorded and the
    /// run proceeds; any other failure stops it.
    pub(crate) async fn run(&self, ctx: &Context, bundles: &[ManifestBundle]) -> Result<Execution> {
        let _gate = APPLY_GATE.lock().await;
        let mut execution = Execution::default();

        for (idx, bundle) in bundles.iter().enumerate() {
            info!(
                "Applying bundle {}/{} ({}): {}",
                idx + 1,
                bundles.len(),
                if bundle.is_local() { "local" } else { "remote" },
                bundle
            );
            let (manifest, local) = match self.manifest_for(bundle) {
                Ok(found) => found,
                Err(err) => {
                    error!("{}", err);
                    return Err(err);
                }
            };
            match self.apply(ctx, bundle, &manifest).await {
                Ok(output) => execution.reports.push(BundleReport {
                    bundle: bundle.to_string(),
                    local,
                    action: manifest.spec.action,
                    outcome: BundleOutcome::Applied,
                    output,
                }),
                Err(err) if err.is_continue() => {
                    warn!("{}", err);
                    execution.reports.push(BundleReport {
                        bundle: bundle.to_string(),
                        local,
                        action: manifest.spec.action,
                        outcome: BundleOutcome::Continued,
                        output: err.to_string(),
                    });
                    execution.continued.push(err);
                }
                Err(err) => {
                    error!("{}", err);
                    return Err(err);
                }
            }
        }

        info!(
            "Applied {} bundle(s), {} continued failure(s)",
            execution.reports.len(),
            execution.continued.len()
        );
        Ok(execution)
    }

    fn manifest_for(&self, bundle: &ManifestBundle) -> Result<(ClientSideApplyManifest, bool)> {
        if !bundle.is_local() {
            return Ok((self.remote_manifest(bundle), false));
        }
        let path = bundle
            .paths()
            .into_iter()
            .next()
            .ok_or_else(|| CribError::internal("local bundle without manifest"))?;
        let manifest = ClientSideApplyManifest::load(&path)
            .map_err(|e| ApplyError::abort(bundle.to_string(), e))?;
        Ok((manifest, true))
    }

    /// One `kubectl apply` over every file of a remote bundle.
    fn remote_manifest(&self, bundle: &ManifestBundle) -> ClientSideApplyManifest {
        let mut args = vec!["apply".to_string(), "-f".to_string(), bundle.to_string()];
        if self.kubectl_wait {
            args.push("--wait".to_string());
        }
        ClientSideApplyManifest::new(Action::Kubectl, args).with_on_failure(OnFailure::Abort)
    }

    async fn apply(
        &self,
        ctx: &Context,
        bundle: &ManifestBundle,
        manifest: &ClientSideApplyManifest,
    ) -> Result<String> {
        let policy = manifest.spec.on_failure;
        let runner = self
            .registry
            .runner_for(manifest.spec.action)
            .map_err(|e| policy.wrap(bundle.to_string(), e))?;
        debug!(
            "Running {} with {} argument(s)",
            manifest.spec.action,
            manifest.spec.args.len()
        );
        let output = runner
            .execute(ctx, manifest)
            .await
            .map_err(|e| policy.wrap(bundle.to_string(), e))?;
        Ok(output.text())
    }
}

/// SHA-256 over every bundled manifest's relative path and content, in
/// apply order.
pub(crate) fn bundles_digest(bundles: &[ManifestBundle]) -> Result<String> {
    let mut hasher = Sha256::new();
    for bundle in bundles {
        for (manifest, path) in bundle.manifests().iter().zip(bundle.paths()) {
            hasher.update(manifest.path().to_string_lossy().as_bytes());
            hasher.update(std::fs::read(&path)?);
        }
    }
    Ok(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::manifest::discover;
    use crate::runner::{MockActionRunner, RunnerOutput, RunnerSettings};

    fn write_local(dir: &Path, name: &str, manifest: &ClientSideApplyManifest) {
        std::fs::write(dir.join(name), serde_yaml::to_string(manifest).unwrap()).unwrap();
    }

    fn quiet_registry() -> ActionRegistry {
        ActionRegistry::new(RunnerSettings {
            shell: "/bin/sh".into(),
            mirror_output: false,
            dry_run: false,
        })
    }

    #[tokio::test]
    async fn test_continue_then_abort_skips_the_rest() {
        let dir = tempfile::tempdir().unwrap();
        let fail_continue = ClientSideApplyManifest::new(Action::Cmd, ["exit 3"])
            .with_on_failure(OnFailure::Continue);
        write_local(dir.path(), "1.yaml", &fail_continue);
        let scratch = tempfile::tempdir().unwrap();
        let ran_second = scratch.path().join("ran-2");
        write_local(
            dir.path(),
            "2.yaml",
            &ClientSideApplyManifest::new(Action::Cmd, [format!("touch {}", ran_second.display())]),
        );
        write_local(dir.path(), "3.yaml", &ClientSideApplyManifest::new(Action::Cmd, ["exit 4"]));
        let marker = scratch.path().join("ran-4");
        write_local(
            dir.path(),
            "4.yaml",
            &ClientSideApplyManifest::new(Action::Cmd, [format!("touch {}", marker.display())]),
        );

        let bundles = discover(dir.path()).unwrap();
        assert_eq!(bundles.len(), 4);

        let registry = quiet_registry();
        let err = BundleExecutor::new(&registry, true)
            .run(&Context::new(), &bundles)
            .await
            .unwrap_err();
        assert!(err.is_abort());
        assert!(err.to_string().contains("3.yaml"));
        assert!(ran_second.exists());
        assert!(!marker.exists());
    }

    #[tokio::test]
    async fn test_continue_failures_are_reported() {
        let dir = tempfile::tempdir().unwrap();
        write_local(
            dir.path(),
            "a.yaml",
            &ClientSideApplyManifest::new(Action::Cmd, ["false"]).with_on_failure(OnFailure::Continue),
        );
        write_local(dir.path(), "b.yaml", &ClientSideApplyManifest::new(Action::Cmd, ["printf ok"]));

        let bundles = discover(dir.path()).unwrap();
        let registry = quiet_registry();
        let execution = BundleExecutor::new(&registry, true)
            .run(&Context::new(), &bundles)
            .await
            .unwrap();

        assert_eq!(execution.continued.len(), 1);
        assert!(execution.continued[0].is_continue());
        let outcomes: Vec<_> = execution.reports.iter().map(|r| r.outcome).collect();
        assert_eq!(outcomes, [BundleOutcome::Continued, BundleOutcome::Applied]);
        assert_eq!(execution.reports[1].output, "ok");
    }

    #[tokio::test]
    async fn test_remote_bundle_runs_one_kubectl_apply() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.yaml"), "apiVersion: v1\nkind: ConfigMap\n").unwrap();
        std::fs::write(dir.path().join("b.yaml"), "apiVersion: v1\nkind: Secret\n").unwrap();
        let bundles = discover(dir.path()).unwrap();
        let expected = bundles[0].to_string();

        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);
        let mut mock = MockActionRunner::new();
        mock.expect_execute().returning(move |_, manifest| {
            seen.fetch_add(1, Ordering::SeqCst);
            assert_eq!(manifest.spec.args[..3], ["apply", "-f", expected.as_str()]);
            assert_eq!(manifest.spec.args.last().map(String::as_str), Some("--wait"));
            Ok(RunnerOutput::new(b"applied".to_vec()))
        });
        let registry = quiet_registry().with_runner(Action::Kubectl, Arc::new(mock));

        let execution = BundleExecutor::new(&registry, true)
            .run(&Context::new(), &bundles)
            .await
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(!execution.reports[0].local);
        assert_eq!(execution.reports[0].action, Action::Kubectl);
    }

    #[tokio::test]
    async fn test_remote_failure_aborts() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.yaml"), "apiVersion: v1\nkind: ConfigMap\n").unwrap();
        let bundles = discover(dir.path()).unwrap();

        let mut mock = MockActionRunner::new();
        mock.expect_execute()
            .returning(|_, _| Err(CribError::internal("cluster unreachable")));
        let registry = quiet_registry().with_runner(Action::Kubectl, Arc::new(mock));

        let err = BundleExecutor::new(&registry, false)
            .run(&Context::new(), &bundles)
            .await
            .unwrap_err();
        assert!(err.is_abort());
    }

    #[test]
    fn test_digest_tracks_content() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.yaml"), "kind: A\n").unwrap();
        let first = tokio_test::assert_ok!(bundles_digest(&discover(dir.path()).unwrap()));
        assert_eq!(first, bundles_digest(&discover(dir.path()).unwrap()).unwrap());

        std::fs::write(dir.path().join("a.yaml"), "kind: B\n").unwrap();
        let second = bundles_digest(&discover(dir.path()).unwrap()).unwrap();
        assert_ne!(first, second);
        assert_eq!(second.len(), 64);
    }
}
