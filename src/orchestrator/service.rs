//! Plan service: runs plan components, synthesizes and applies manifests.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use tempfile::TempDir;
use tracing::{debug, error, info};

use crate::config::SdkConfig;
use crate::context::Context;
use crate::error::{ApplyError, ComposeError, CribError, Result};
use crate::identity::resource_id;
use crate::manifest::{ManifestBundle, discover};
use crate::planner::Plan;
use crate::results::{ConstructNode, ResultIndex};
use crate::runner::{ActionRegistry, RunnerSettings};
use crate::synth::{ManifestResolver, NameResolver, SynthesisHandle, YamlSynthesizer, sort_resolvers};

use super::apply::{BundleExecutor, bundles_digest};
use super::state::PlanState;

/// Fallback prefix for scratch manifest directories.
pub const DEFAULT_TEMP_PREFIX: &str = "crib-sdk";

const MAX_TEMP_PREFIX: usize = 64;

/// Entry point for turning plans into applied manifests.
#[derive(Debug, Clone)]
pub struct PlanService {
    config: SdkConfig,
    registry: ActionRegistry,
}

/// A plan whose components ran and whose manifests were synthesized.
///
/// Dropping it removes the scratch manifest directory, if one was created.
#[derive(Debug)]
pub struct AppPlan {
    pub(super) plan: Plan,
    pub(super) synth: SynthesisHandle,
    pub(super) records: Vec<ComponentRecord>,
    index: Arc<ResultIndex>,
    manifest_dir: PathBuf,
    registry: ActionRegistry,
    kubectl_wait: bool,
    _scratch: Option<TempDir>,
}

/// Which plan a recorded unit came from.
#[derive(Debug, Clone)]
pub(super) struct ComponentRecord {
    pub(super) plan: String,
    pub(super) component: String,
    pub(super) node: ConstructNode,
}

impl PlanService {
    /// Creates a service whose runners follow `config`.
    #[must_use]
    pub fn new(config: SdkConfig) -> Self {
        let registry = ActionRegistry::new(RunnerSettings::from(&config));
        Self { config, registry }
    }

    /// Dispatches actions through `registry`.
    #[must_use]
    pub fn with_registry(mut self, registry: ActionRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &SdkConfig {
        &self.config
    }

    /// Action dispatch table.
    #[must_use]
    pub const fn registry(&self) -> &ActionRegistry {
        &self.registry
    }

    /// Resolves `plan`, runs every component and synthesizes the declared
    /// resources.
    ///
    /// Components run in plan order: child plans depth-first, then the
    /// plan's own. Every component runs even after a failure; if any
    /// failed, all failures are returned together and nothing is written.
    ///
    /// # Errors
    ///
    /// Returns a plan resolution error, [`ApplyError::Construction`] with
    /// every component failure, or a synthesis error.
    pub async fn create_plan(&self, ctx: &Context, mut plan: Plan) -> Result<AppPlan> {
        plan.build()?;
        info!("Creating plan {}.{}", plan.name(), plan.namespace());

        let synth = SynthesisHandle::spawn(YamlSynthesizer::new());
        let root = ctx
            .with_scope(synth.clone(), ConstructNode::root())
            .chart(&resource_id(&format!("{}.{}", plan.name(), plan.namespace()), &()))
            .await?;
        let scoped = root.scope(ctx);

        let index = ResultIndex::new();
        let mut records = Vec::new();
        let mut failures = Vec::new();
        for (plan_name, component) in plan.ordered_components() {
            let name = component.name();
            debug!("Running component {} of plan {}", name, plan_name);
            match component.run(&scoped).await {
                Ok(unit) => {
                    records.push(ComponentRecord {
                        plan: plan_name.to_string(),
                        component: name,
                        node: unit.node().clone(),
                    });
                    index.add(unit);
                }
                Err(err) => {
                    error!("Component {} of plan {} failed: {}", name, plan_name, err);
                    failures.push(CribError::from(ComposeError::component_failed(name, err)));
                }
            }
        }
        if !failures.is_empty() {
            return Err(ApplyError::Construction(failures).into());
        }

        let (manifest_dir, scratch) = match &self.config.manifest_dir {
            Some(dir) => (dir.clone(), None),
            None => {
                let scratch = tempfile::Builder::new()
                    .prefix(&format!("{}-", temp_dir_prefix(plan.name())))
                    .tempdir()?;
                (scratch.path().to_path_buf(), Some(scratch))
            }
        };

        let mut resolvers = plan.resolvers();
        resolvers.push(Arc::new(NameResolver) as Arc<dyn ManifestResolver>);
        sort_resolvers(&mut resolvers);
        let files = synth.synthesize(manifest_dir.clone(), resolvers).await?;
        info!(
            "Synthesized {} manifest(s) for {} component(s) into {}",
            files.len(),
            records.len(),
            manifest_dir.display()
        );

        Ok(AppPlan {
            plan,
            synth,
            records,
            index: Arc::new(index),
            manifest_dir,
            registry: self.registry.clone(),
            kubectl_wait: self.config.kubectl_wait,
            _scratch: scratch,
        })
    }

    /// Creates and applies `plan` in one step.
    ///
    /// # Errors
    ///
    /// Returns any error of [`Self::create_plan`] or [`AppPlan::apply`].
    pub async fn apply(&self, ctx: &Context, plan: Plan) -> Result<PlanState> {
        self.create_plan(ctx, plan).await?.apply(ctx).await
    }

    /// Discovers and applies an already synthesized manifest directory.
    ///
    /// # Errors
    ///
    /// Returns a discovery error or the first abort-policy failure.
    pub async fn apply_dir(&self, ctx: &Context, dir: &Path) -> Result<PlanState> {
        apply_bundles(
            ctx,
            dir,
            &self.registry,
            self.config.kubectl_wait,
            Arc::new(ResultIndex::new()),
        )
        .await
    }
}

impl AppPlan {
    /// The resolved plan.
    #[must_use]
    pub const fn plan(&self) -> &Plan {
        &self.plan
    }

    /// Directory the manifests were synthesized into.
    #[must_use]
    pub fn manifest_dir(&self) -> &Path {
        &self.manifest_dir
    }

    /// Units recorded by the plan components.
    #[must_use]
    pub fn index(&self) -> &ResultIndex {
        &self.index
    }

    /// Bundles the synthesized manifests form.
    ///
    /// # Errors
    ///
    /// Returns an error if the manifest directory cannot be read.
    pub fn bundles(&self) -> Result<Vec<ManifestBundle>> {
        Ok(discover(&self.manifest_dir)?)
    }

    /// Applies the synthesized manifests bundle by bundle.
    ///
    /// # Errors
    ///
    /// Returns a discovery error or the first abort-policy failure.
    /// Continue-policy failures are reported on the returned state.
    pub async fn apply(&self, ctx: &Context) -> Result<PlanState> {
        info!("Applying plan {}.{}", self.plan.name(), self.plan.namespace());
        apply_bundles(
            ctx,
            &self.manifest_dir,
            &self.registry,
            self.kubectl_wait,
            Arc::clone(&self.index),
        )
        .await
    }
}

async fn apply_bundles(
    ctx: &Context,
    dir: &Path,
    registry: &ActionRegistry,
    kubectl_wait: bool,
    index: Arc<ResultIndex>,
) -> Result<PlanState> {
    let started_at = Utc::now();
    let bundles = discover(dir)?;
    info!("Discovered {} bundle(s) in {}", bundles.len(), dir.display());
    let digest = bundles_digest(&bundles)?;
    let execution = BundleExecutor::new(registry, kubectl_wait)
        .run(ctx, &bundles)
        .await?;
    Ok(PlanState::new(started_at, dir, digest, execution, index))
}

/// Turns a plan name into a safe temporary directory prefix.
///
/// Leading and trailing `.`, `_`, `-` and whitespace are trimmed, path
/// separators, reserved and non-printable characters become `_`, and the
/// result is capped at 64 characters. Falls back to
/// [`DEFAULT_TEMP_PREFIX`] when nothing is left.
#[must_use]
pub fn temp_dir_prefix(name: &str) -> String {
    let trimmed = name
        .trim()
        .trim_matches(|c| matches!(c, '.' | '_' | '-'))
        .trim();
    let prefix: String = trimmed
        .chars()
        .map(|c| if is_invalid_prefix_char(c) { '_' } else { c })
        .take(MAX_TEMP_PREFIX)
        .collect();
    if prefix.is_empty() {
        DEFAULT_TEMP_PREFIX.to_string()
    } else {
        prefix
    }
}

fn is_invalid_prefix_char(c: char) -> bool {
    if c.is_ascii() {
        return c.is_ascii_control()
            || matches!(
                c,
                ' ' | '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' | '@' | '+' | '$'
                    | '^' | '`' | '~' | '='
            );
    }
    !c.is_alphanumeric()
}
