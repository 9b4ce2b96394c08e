//! End-to-end plan → synthesize → discover → apply runs.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::json;

use crib_sdk::composite::{ChartFactory, Component, Composite, Dependency, Inputs, Outputs, composite};
use crib_sdk::error::{ApplyError, PlanError};
use crib_sdk::manifest::{Action, ClientSideApply, ClientSideApplyManifest, OnFailure};
use crib_sdk::runner::{ActionRegistry, ActionRunner, RunnerOutput, RunnerSettings};
use crib_sdk::{Context, CribError, Plan, PlanService, Result, SdkConfig};

#[derive(Default)]
struct Recorder {
    calls: Mutex<Vec<Vec<String>>>,
}

#[async_trait]
impl ActionRunner for Recorder {
    async fn execute(&self, _ctx: &Context, manifest: &ClientSideApplyManifest) -> Result<RunnerOutput> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(manifest.spec.args.clone());
        }
        Ok(RunnerOutput::new(b"configured".to_vec()))
    }
}

struct Namespace;

#[async_trait]
impl Component for Namespace {
    type Output = String;

    async fn apply(&mut self, _inputs: &Inputs) -> Result<String> {
        Ok("observability".to_string())
    }
}

struct Dashboards;

#[async_trait]
impl Component for Dashboards {
    type Output = ();

    fn consumes(&self) -> Vec<Dependency> {
        vec![
            Dependency::one::<String>(),
            Dependency::capability::<dyn ChartFactory>(),
        ]
    }

    async fn apply(&mut self, inputs: &Inputs) -> Result<()> {
        let namespace = inputs.one::<String>()?;
        let factory = inputs.capability::<dyn ChartFactory>()?;
        let chart = factory.create_chart("dashboards").await?;
        chart
            .add_resource(
                "cm",
                &json!({
                    "apiVersion": "v1",
                    "kind": "ConfigMap",
                    "metadata": {"name": "Grafana_Dashboards", "namespace": namespace.as_str()},
                }),
            )
            .await?;
        Ok(())
    }
}

fn service(registry: ActionRegistry, dir: &std::path::Path) -> PlanService {
    let config = SdkConfig::default()
        .with_shell("/bin/sh")
        .with_mirror_output(false)
        .with_manifest_dir(dir);
    PlanService::new(config).with_registry(registry)
}

fn quiet_registry() -> ActionRegistry {
    ActionRegistry::new(RunnerSettings {
        shell: "/bin/sh".into(),
        mirror_output: false,
        dry_run: false,
    })
}

#[tokio::test]
async fn test_plan_runs_local_actions_then_remote_bundle() {
    let out = tempfile::tempdir().unwrap();
    let scratch = tempfile::tempdir().unwrap();
    let marker = scratch.path().join("bootstrapped");
    let touch = format!("touch {}", marker.display());

    let plan = Plan::new("platform")
        .with_namespace("dev")
        .with_component(composite(|| {
            Composite::builder()
                .register(|| Dashboards)
                .register(|| Namespace)
        }))
        .with_child(move || {
            Plan::new("bootstrap").with_component(ClientSideApply::new(
                ClientSideApplyManifest::new(Action::Cmd, [touch.clone()]),
            ))
        });

    let recorder = Arc::new(Recorder::default());
    let registry = quiet_registry().with_runner(Action::Kubectl, Arc::clone(&recorder) as Arc<dyn ActionRunner>);
    let state = service(registry, out.path())
        .apply(&Context::new(), plan)
        .await
        .unwrap();

    assert!(marker.exists());
    assert!(state.is_clean());
    assert_eq!(state.bundles().len(), 2);
    assert!(state.bundles()[0].local);
    assert!(!state.bundles()[1].local);

    let calls = recorder.calls.lock().unwrap();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0][..2], ["apply", "-f"]);
    assert!(calls[0][2].ends_with(".yaml"));

    let ids: Vec<String> = state.component_ids().collect();
    assert_eq!(ids, ["sdk.ClientSideApply", "sdk.composite"]);
    let outputs = state.states::<Outputs>("sdk.composite");
    assert_eq!(outputs.len(), 1);
    assert_eq!(
        outputs[0].one::<String>().map(|s| s.to_string()),
        Some("observability".to_string())
    );

    let applied = std::fs::read_to_string(calls[0][2].split(',').next().unwrap()).unwrap();
    assert!(applied.contains("grafana-dashboards"));
}

#[tokio::test]
async fn test_continue_policy_keeps_going() {
    let out = tempfile::tempdir().unwrap();
    let plan = Plan::new("jobs")
        .with_component(ClientSideApply::new(
            ClientSideApplyManifest::new(Action::Cmd, ["exit", "1"])
                .with_on_failure(OnFailure::Continue),
        ))
        .with_component(ClientSideApply::new(ClientSideApplyManifest::new(
            Action::Cmd,
            ["printf", "done"],
        )));

    let state = service(quiet_registry(), out.path())
        .apply(&Context::new(), plan)
        .await
        .unwrap();

    assert_eq!(state.continued_errors().len(), 1);
    assert!(state.continued_errors()[0].is_continue());
    assert_eq!(state.bundles()[1].output, "done");
}

#[tokio::test]
async fn test_abort_policy_stops_the_apply() {
    let out = tempfile::tempdir().unwrap();
    let scratch = tempfile::tempdir().unwrap();
    let marker = scratch.path().join("never");

    let plan = Plan::new("jobs")
        .with_component(ClientSideApply::new(ClientSideApplyManifest::new(
            Action::Cmd,
            ["exit", "2"],
        )))
        .with_component(ClientSideApply::new(ClientSideApplyManifest::new(
            Action::Cmd,
            ["touch".to_string(), marker.display().to_string()],
        )));

    let err = service(quiet_registry(), out.path())
        .apply(&Context::new(), plan)
        .await
        .unwrap_err();

    assert!(matches!(err, CribError::Apply(ApplyError::Abort { .. })));
    assert!(!marker.exists());
}

fn ring_a() -> Plan {
    Plan::new("a").with_child(ring_b)
}

fn ring_b() -> Plan {
    Plan::new("b").with_child(ring_c)
}

fn ring_c() -> Plan {
    Plan::new("c").with_child(ring_a)
}

#[tokio::test]
async fn test_plan_cycle_fails_before_any_action() {
    let out = tempfile::tempdir().unwrap();
    let err = service(quiet_registry(), out.path())
        .apply(&Context::new(), ring_a())
        .await
        .unwrap_err();

    match err {
        CribError::Plan(PlanError::Cycle { chain }) => {
            assert_eq!(chain, ["a", "b", "c", "a"]);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(std::fs::read_dir(out.path()).unwrap().count(), 0);
}
