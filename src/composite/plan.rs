//! Running a composite as a plan component.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::context::Context;
use crate::error::Result;
use crate::identity::resource_id;
use crate::planner::PlanComponent;
use crate::results::Unit;

use super::builder::CompositeBuilder;

static NEXT_KEY: AtomicUsize = AtomicUsize::new(0);

/// Plan component wrapping a composite registration.
///
/// The registration is rebuilt on every run, so the same plan can be
/// previewed and applied more than once.
pub struct CompositeComponent<F> {
    build: F,
    key: String,
}

/// Wraps a composite registration into a plan component.
///
/// On run the composite gets its own chart, whose id is derived from the
/// wrapper's key and the registration names, and its components create
/// charts below it. The key defaults to the wrapper's creation sequence
/// number, so two composites of the same component types get distinct
/// charts. The returned unit carries the composite's
/// [`Outputs`](super::Outputs).
#[must_use]
pub fn composite<F>(build: F) -> CompositeComponent<F>
where
    F: Fn() -> CompositeBuilder + Send + Sync,
{
    let seq = NEXT_KEY.fetch_add(1, Ordering::Relaxed);
    CompositeComponent {
        build,
        key: seq.to_string(),
    }
}

impl<F> CompositeComponent<F> {
    /// Replaces the sequence key with a caller-chosen one, keeping the
    /// chart id stable across processes.
    #[must_use]
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    /// Identity key mixed into the chart id.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }
}

#[async_trait]
impl<F> PlanComponent for CompositeComponent<F>
where
    F: Fn() -> CompositeBuilder + Send + Sync,
{
    async fn run(&self, ctx: &Context) -> Result<Unit> {
        let composite = (self.build)().build()?;
        let chart = ctx
            .chart(&resource_id("sdk.composite", &(&self.key, composite.names())))
            .await?;
        let outputs = composite.apply(&chart.scope(ctx)).await?;
        Ok(chart.into_unit_with(outputs))
    }

    fn name(&self) -> String {
        "composite".to_string()
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use serde_json::json;

    use super::*;
    use crate::composite::{ChartFactory, Component, Composite, Dependency, Inputs, Outputs};
    use crate::identity::extract_resource;
    use crate::results::ConstructNode;
    use crate::synth::{SynthesisHandle, YamlSynthesizer};

    struct ConfigMap;

    #[async_trait]
    impl Component for ConfigMap {
        type Output = String;

        fn consumes(&self) -> Vec<Dependency> {
            vec![Dependency::capability::<dyn ChartFactory>()]
        }

        async fn apply(&mut self, inputs: &Inputs) -> Result<String> {
            let factory = inputs.capability::<dyn ChartFactory>()?;
            let chart = factory.create_chart("settings").await?;
            chart
                .add_resource("cm", &json!({"kind": "ConfigMap", "metadata": {"name": "settings"}}))
                .await?;
            Ok(chart.node().path().to_string())
        }
    }

    #[tokio::test]
    async fn test_composite_charts_nest_under_composite_chart() {
        let synth = SynthesisHandle::spawn(YamlSynthesizer::new());
        let ctx = Context::new().with_scope(synth, ConstructNode::root());
        let component = composite(|| Composite::builder().register(|| ConfigMap));

        let unit = component.run(&ctx).await.unwrap();
        assert_eq!(extract_resource(unit.node().id()), "sdk.composite");

        let outputs = unit.state::<Outputs>().unwrap();
        let path = outputs.one::<String>().unwrap();
        assert_eq!(path.as_str(), format!("{}/settings", unit.node().id()));
        assert_eq!(component.name(), "composite");
    }

    struct Redis(&'static str);

    #[async_trait]
    impl Component for Redis {
        type Output = String;

        async fn apply(&mut self, _inputs: &Inputs) -> Result<String> {
            Ok(self.0.to_string())
        }
    }

    #[tokio::test]
    async fn test_repeated_composites_get_distinct_charts() {
        let synth = SynthesisHandle::spawn(YamlSynthesizer::new());
        let ctx = Context::new().with_scope(synth, ConstructNode::root());
        let cache = composite(|| Composite::builder().register(|| Redis("cache")));
        let sessions = composite(|| Composite::builder().register(|| Redis("sessions")));
        assert_ne!(cache.key(), sessions.key());

        let first = cache.run(&ctx).await.unwrap();
        let second = sessions.run(&ctx).await.unwrap();
        assert_ne!(first.node().id(), second.node().id());
        assert_eq!(extract_resource(second.node().id()), "sdk.composite");
    }

    #[tokio::test]
    async fn test_explicit_key_is_stable() {
        let synth = SynthesisHandle::spawn(YamlSynthesizer::new());
        let ctx = Context::new().with_scope(synth, ConstructNode::root());
        let build = || Composite::builder().register(|| Redis("cache"));
        let first = composite(build).with_key("cache");
        let second = composite(build).with_key("cache");
        let id = first.run(&ctx).await.unwrap().node().id().to_string();

        let other_synth = SynthesisHandle::spawn(YamlSynthesizer::new());
        let other_ctx = Context::new().with_scope(other_synth, ConstructNode::root());
        let again = second.run(&other_ctx).await.unwrap();
        assert_eq!(again.node().id(), id);
    }

    #[tokio::test]
    async fn test_composite_requires_scope() {
        let component = composite(Composite::builder);
        assert!(component.run(&Context::new()).await.is_err());
    }
}
