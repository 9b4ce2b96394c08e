//! Plan declaration.
//!
//! A [`Plan`] names a set of components, the child plans that must be
//! applied before it and the manifest resolvers used at synthesis time.
//! Child plans are declared lazily through constructor functions and only
//! expanded by [`Plan::build`].

use std::fmt;
use std::sync::Arc;

use crate::error::PlanError;
use crate::synth::{ImagePullSecrets, ManifestResolver, sort_resolvers};

use super::component::PlanComponent;

/// Namespace used when a plan does not declare one.
pub const DEFAULT_NAMESPACE: &str = "default";

/// Lazily evaluated reference to a child plan.
pub type PlanRef = Arc<dyn Fn() -> Plan + Send + Sync>;

/// A named, ordered collection of components and child plans.
pub struct Plan {
    pub(super) name: String,
    pub(super) namespace: Option<String>,
    pub(super) components: Vec<Arc<dyn PlanComponent>>,
    pub(super) children: Vec<Arc<Plan>>,
    pub(super) pending: Vec<PlanRef>,
    pub(super) resolvers: Vec<Arc<dyn ManifestResolver>>,
    pub(super) option_errors: Vec<PlanError>,
}

impl Plan {
    /// Starts a plan named `name`.
    ///
    /// The name must be unique among all plans reachable from a root plan.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: None,
            components: Vec::new(),
            children: Vec::new(),
            pending: Vec::new(),
            resolvers: Vec::new(),
            option_errors: Vec::new(),
        }
    }

    /// Sets the target namespace. May be declared once; a second declaration
    /// is reported by [`Plan::build`].
    #[must_use]
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        let requested = namespace.into();
        if let Some(current) = self.namespace.clone() {
            self.option_errors.push(PlanError::NamespaceAlreadySet {
                plan: self.name.clone(),
                current,
                requested,
            });
        } else {
            self.namespace = Some(requested);
        }
        self
    }

    /// Appends a component.
    #[must_use]
    pub fn with_component<C: PlanComponent + 'static>(mut self, component: C) -> Self {
        self.components.push(Arc::new(component));
        self
    }

    /// Appends already shared components in order.
    #[must_use]
    pub fn with_components<I>(mut self, components: I) -> Self
    where
        I: IntoIterator<Item = Arc<dyn PlanComponent>>,
    {
        self.components.extend(components);
        self
    }

    /// Declares a child plan through its constructor.
    #[must_use]
    pub fn with_child<F>(mut self, plan: F) -> Self
    where
        F: Fn() -> Self + Send + Sync + 'static,
    {
        self.pending.push(Arc::new(plan));
        self
    }

    /// Adds `imagePullSecrets` to every pod-bearing manifest of this plan.
    #[must_use]
    pub fn with_image_pull_secrets<I, S>(self, secrets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.with_resolver(ImagePullSecrets::new(secrets))
    }

    /// Adds a manifest resolver.
    #[must_use]
    pub fn with_resolver<R: ManifestResolver + 'static>(mut self, resolver: R) -> Self {
        self.resolvers.push(Arc::new(resolver));
        self
    }

    /// Plan name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Target namespace, [`DEFAULT_NAMESPACE`] unless declared.
    #[must_use]
    pub fn namespace(&self) -> &str {
        self.namespace.as_deref().unwrap_or(DEFAULT_NAMESPACE)
    }

    /// Components declared directly on this plan.
    #[must_use]
    pub fn components(&self) -> &[Arc<dyn PlanComponent>] {
        &self.components
    }

    /// Resolved child plans, in declaration order.
    ///
    /// Empty until [`Plan::build`] ran.
    #[must_use]
    pub fn child_plans(&self) -> &[Arc<Self>] {
        &self.children
    }

    /// Number of child references still waiting for resolution.
    #[must_use]
    pub fn pending_children(&self) -> usize {
        self.pending.len()
    }

    /// Resolvers of this plan ordered by descending priority.
    #[must_use]
    pub fn resolvers(&self) -> Vec<Arc<dyn ManifestResolver>> {
        let mut resolvers = self.resolvers.clone();
        sort_resolvers(&mut resolvers);
        resolvers
    }
}

impl fmt::Debug for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Plan")
            .field("name", &self.name)
            .field("namespace", &self.namespace())
            .field("components", &self.components.len())
            .field("children", &self.children)
            .field("pending", &self.pending.len())
            .field("resolvers", &self.resolvers)
            .finish()
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.namespace())
    }
}
