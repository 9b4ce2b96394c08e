//! The component contract and its type-erased adapter.

use std::any::Any;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;
use crate::planner::short_type_name;

use super::execute::Inputs;
use super::tag::{Dependency, Provide, TypeTag};

/// A unit of composable work.
///
/// The output type is what the component produces for later consumers;
/// use `()` for components that only have side effects. Dependencies are
/// listed by [`Component::consumes`] and read back from [`Inputs`] inside
/// [`Component::apply`].
#[async_trait]
pub trait Component: Send + Sync + 'static {
    /// Value made available to consumers. `()` produces nothing.
    type Output: Send + Sync + 'static;

    /// Name used in registration names and errors.
    fn name(&self) -> String {
        short_type_name(std::any::type_name::<Self>())
    }

    /// Dependencies that must be satisfied before `apply` runs.
    fn consumes(&self) -> Vec<Dependency> {
        Vec::new()
    }

    /// Capabilities the output offers besides its concrete type.
    fn provides(&self) -> Vec<Provide<Self::Output>> {
        Vec::new()
    }

    /// Runs the component.
    async fn apply(&mut self, inputs: &Inputs) -> Result<Self::Output>;
}

/// A produced value plus its capability views.
pub(super) struct Produced {
    pub(super) value: Option<Arc<dyn Any + Send + Sync>>,
    pub(super) views: Vec<(TypeTag, Arc<dyn Any + Send + Sync>)>,
}

#[async_trait]
pub(super) trait ErasedComponent: Send + Sync {
    async fn run(&mut self, inputs: &Inputs) -> Result<Produced>;
}

pub(super) struct Erased<C: Component> {
    inner: C,
    provides: Vec<Provide<C::Output>>,
}

impl<C: Component> Erased<C> {
    pub(super) fn new(inner: C) -> Self {
        let provides = inner.provides();
        Self { inner, provides }
    }

    pub(super) fn produces(&self) -> Option<TypeTag> {
        let tag = TypeTag::of::<C::Output>();
        (!tag.is_unit()).then_some(tag)
    }

    pub(super) fn capabilities(&self) -> Vec<TypeTag> {
        self.provides.iter().map(Provide::tag).collect()
    }

    pub(super) fn inner(&self) -> &C {
        &self.inner
    }
}

#[async_trait]
impl<C: Component> ErasedComponent for Erased<C> {
    async fn run(&mut self, inputs: &Inputs) -> Result<Produced> {
        let output = Arc::new(self.inner.apply(inputs).await?);
        let views = self
            .provides
            .iter()
            .map(|p| (p.tag(), p.view(Arc::clone(&output))))
            .collect();
        let value = if TypeTag::of::<C::Output>().is_unit() {
            None
        } else {
            Some(output as Arc<dyn Any + Send + Sync>)
        };
        Ok(Produced { value, views })
    }
}
