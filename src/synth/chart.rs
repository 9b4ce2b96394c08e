//! Chart handles used by components to declare resources.

use std::any::Any;

use serde::Serialize;

use crate::context::Context;
use crate::error::{Result, SynthError};
use crate::results::{ConstructNode, Unit};

use super::worker::SynthesisHandle;

/// A chart in the synthesis tree.
#[derive(Debug, Clone)]
pub struct Chart {
    node: ConstructNode,
    synth: SynthesisHandle,
}

impl Chart {
    pub(crate) async fn create(
        synth: SynthesisHandle,
        parent: &ConstructNode,
        id: &str,
    ) -> Result<Self> {
        let node = synth.add_chart(parent, id).await?;
        Ok(Self { node, synth })
    }

    /// Construct node of this chart.
    #[must_use]
    pub const fn node(&self) -> &ConstructNode {
        &self.node
    }

    /// Chart id.
    #[must_use]
    pub fn id(&self) -> &str {
        self.node.id()
    }

    /// Creates a nested chart.
    ///
    /// # Errors
    ///
    /// Returns an error if the id is already taken in this chart.
    pub async fn chart(&self, id: &str) -> Result<Self> {
        Self::create(self.synth.clone(), &self.node, id).await
    }

    /// Declares a resource in this chart.
    ///
    /// # Errors
    ///
    /// Returns an error if the resource cannot be serialized or the id is taken.
    pub async fn add_resource<T: Serialize + ?Sized>(
        &self,
        id: &str,
        resource: &T,
    ) -> Result<ConstructNode> {
        let manifest = serde_yaml::to_value(resource).map_err(|e| SynthError::Serialize {
            id: id.to_string(),
            message: e.to_string(),
        })?;
        self.synth.add_resource(&self.node, id, manifest).await
    }

    /// Returns a context whose scope is this chart.
    #[must_use]
    pub fn scope(&self, ctx: &Context) -> Context {
        ctx.with_scope(self.synth.clone(), self.node.clone())
    }

    /// Converts the chart into a unit without payload.
    #[must_use]
    pub fn into_unit(self) -> Unit {
        Unit::from_node(self.node)
    }

    /// Converts the chart into a unit carrying `payload`.
    #[must_use]
    pub fn into_unit_with<T: Any + Send + Sync>(self, payload: T) -> Unit {
        Unit::new(self.node, payload)
    }
}
