//! Plan component declaring a `ClientSideApply` manifest.

use async_trait::async_trait;
use validator::Validate;

use crate::context::Context;
use crate::error::{ManifestError, Result};
use crate::identity::resource_id;
use crate::planner::PlanComponent;
use crate::results::Unit;

use super::types::ClientSideApplyManifest;

/// Declares a command to run on the client when the plan is applied.
///
/// The manifest gets its own chart, so it lands in its own synthesized
/// directory and becomes a local bundle between the cluster bundles of the
/// surrounding charts.
#[derive(Debug, Clone)]
pub struct ClientSideApply {
    manifest: ClientSideApplyManifest,
}

impl ClientSideApply {
    /// Wraps `manifest` as a plan component.
    #[must_use]
    pub const fn new(manifest: ClientSideApplyManifest) -> Self {
        Self { manifest }
    }

    /// The manifest this component declares.
    #[must_use]
    pub const fn manifest(&self) -> &ClientSideApplyManifest {
        &self.manifest
    }
}

#[async_trait]
impl PlanComponent for ClientSideApply {
    async fn run(&self, ctx: &Context) -> Result<Unit> {
        self.manifest
            .validate()
            .map_err(|e| ManifestError::Invalid {
                path: "<component>".into(),
                message: e.to_string(),
            })?;

        let chart = ctx
            .chart(&resource_id("sdk.ClientSideApply", &self.manifest.spec))
            .await?;
        chart
            .add_resource(self.manifest.spec.action.as_str(), &self.manifest)
            .await?;

        let mut args = vec![self.manifest.spec.action.to_string()];
        args.extend(self.manifest.spec.args.iter().cloned());
        Ok(chart.into_unit_with(args))
    }

    fn name(&self) -> String {
        format!("ClientSideApply({})", self.manifest.spec.action)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::Action;
    use crate::results::ConstructNode;
    use crate::synth::{SynthesisHandle, YamlSynthesizer};

    #[tokio::test]
    async fn test_declares_manifest_in_own_chart() {
        let synth = SynthesisHandle::spawn(YamlSynthesizer::new());
        let ctx = Context::new().with_scope(synth.clone(), ConstructNode::root());
        let component = ClientSideApply::new(ClientSideApplyManifest::new(
            Action::Kubectl,
            ["get", "pods"],
        ));

        let unit = component.run(&ctx).await.unwrap();
        assert!(unit.node().id().starts_with("sdk.ClientSideApply-"));
        assert_eq!(
            unit.state::<Vec<String>>().unwrap(),
            &vec!["kubectl".to_string(), "get".to_string(), "pods".to_string()]
        );
        assert_eq!(component.name(), "ClientSideApply(kubectl)");

        let out = tempfile::tempdir().unwrap();
        let files = synth
            .synthesize(out.path().to_path_buf(), Vec::new())
            .await
            .unwrap();
        assert_eq!(files.len(), 1);
        let written = std::fs::read_to_string(&files[0]).unwrap();
        assert!(written.contains("kind: ClientSideApply"));
    }

    #[tokio::test]
    async fn test_rejects_empty_args() {
        let component = ClientSideApply::new(ClientSideApplyManifest::new(
            Action::Cmd,
            Vec::<String>::new(),
        ));
        assert!(component.run(&Context::new()).await.is_err());
    }
}
