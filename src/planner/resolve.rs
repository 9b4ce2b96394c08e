//! Child plan resolution with cycle detection.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::{debug, info};

use crate::error::PlanError;

use super::component::PlanComponent;
use super::plan::{Plan, PlanRef};

/// Depth-first resolver state.
///
/// `on_stack` holds the plans currently being expanded, `frames` the same
/// names in visiting order for rendering a cycle, and `resolved` every plan
/// already expanded so repeated references share one instance.
#[derive(Default)]
struct Resolver {
    on_stack: HashSet<String>,
    frames: Vec<String>,
    resolved: HashMap<String, Arc<Plan>>,
}

impl Resolver {
    fn expand(&mut self, plan: &mut Plan) -> Result<(), PlanError> {
        if let Some(err) = plan.option_errors.first() {
            return Err(err.clone());
        }
        if plan.name.is_empty() {
            return Err(PlanError::EmptyName);
        }

        debug!("Resolving plan {}", plan.name);
        self.on_stack.insert(plan.name.clone());
        self.frames.push(plan.name.clone());

        for child_ref in std::mem::take(&mut plan.pending) {
            let child = self.resolve_ref(&child_ref)?;
            plan.children.push(child);
        }

        self.frames.pop();
        self.on_stack.remove(&plan.name);
        Ok(())
    }

    fn resolve_ref(&mut self, child_ref: &PlanRef) -> Result<Arc<Plan>, PlanError> {
        let mut child = child_ref();
        if self.on_stack.contains(&child.name) {
            let mut chain = self.frames.clone();
            chain.push(child.name.clone());
            return Err(PlanError::Cycle { chain });
        }
        if let Some(done) = self.resolved.get(&child.name) {
            debug!("Reusing resolved plan {}", child.name);
            return Ok(Arc::clone(done));
        }

        self.expand(&mut child)?;
        let child = Arc::new(child);
        self.resolved.insert(child.name.clone(), Arc::clone(&child));
        Ok(child)
    }
}

impl Plan {
    /// Expands every child reference into a resolved child plan.
    ///
    /// Resolution is depth-first and memoized by plan name, so a plan
    /// referenced from several parents is expanded once and shared. Calling
    /// `build` again on a resolved plan is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError::Cycle`] with the chain of plan names if a plan
    /// lists itself as a descendant, or the first invalid plan option.
    pub fn build(&mut self) -> Result<(), PlanError> {
        Resolver::default().expand(self)?;
        info!(
            "Resolved plan {} with {} child plan(s)",
            self.name,
            self.children.len()
        );
        Ok(())
    }

    /// Every component in application order: child plans depth-first in
    /// declaration order, then this plan's own components.
    ///
    /// Each plan contributes its components once, even when it is reachable
    /// through several parents.
    #[must_use]
    pub fn ordered_components(&self) -> Vec<(&str, &Arc<dyn PlanComponent>)> {
        let mut seen = HashSet::from([self.name.as_str()]);
        let mut ordered = Vec::new();
        collect_components(self, &mut seen, &mut ordered);
        ordered
    }
}

fn collect_components<'a>(
    plan: &'a Plan,
    seen: &mut HashSet<&'a str>,
    ordered: &mut Vec<(&'a str, &'a Arc<dyn PlanComponent>)>,
) {
    for child in &plan.children {
        if seen.insert(child.name.as_str()) {
            collect_components(child, seen, ordered);
        }
    }
    ordered.extend(plan.components.iter().map(|c| (plan.name.as_str(), c)));
}
