//! Producers registered ahead of every user component.

use std::sync::Arc;

use async_trait::async_trait;

use crate::context::Context;
use crate::error::Result;
use crate::synth::Chart;

use super::component::Component;
use super::execute::Inputs;
use super::tag::{Dependency, Provide};

/// Creates charts below the composite's chart.
#[async_trait]
pub trait ChartFactory: Send + Sync {
    /// Creates a chart named `id`. Pair with
    /// [`resource_id`](crate::identity::resource_id) for property-derived ids.
    async fn create_chart(&self, id: &str) -> Result<Chart>;
}

/// The built-in [`ChartFactory`], bound to the composite's context.
#[derive(Debug, Clone)]
pub struct ChartFactoryHandle {
    ctx: Context,
}

impl ChartFactoryHandle {
    /// Context charts are created in.
    #[must_use]
    pub const fn context(&self) -> &Context {
        &self.ctx
    }
}

#[async_trait]
impl ChartFactory for ChartFactoryHandle {
    async fn create_chart(&self, id: &str) -> Result<Chart> {
        self.ctx.chart(id).await
    }
}

pub(super) struct ContextProvider;

#[async_trait]
impl Component for ContextProvider {
    type Output = Context;

    fn name(&self) -> String {
        "context".to_string()
    }

    async fn apply(&mut self, inputs: &Inputs) -> Result<Context> {
        Ok(inputs.context().clone())
    }
}

pub(super) struct ChartFactoryProvider;

#[async_trait]
impl Component for ChartFactoryProvider {
    type Output = ChartFactoryHandle;

    fn name(&self) -> String {
        "chart-factory".to_string()
    }

    fn consumes(&self) -> Vec<Dependency> {
        vec![Dependency::one::<Context>()]
    }

    fn provides(&self) -> Vec<Provide<ChartFactoryHandle>> {
        vec![Provide::capability::<dyn ChartFactory>(
            |handle: Arc<ChartFactoryHandle>| -> Arc<dyn ChartFactory> { handle },
        )]
    }

    async fn apply(&mut self, inputs: &Inputs) -> Result<ChartFactoryHandle> {
        let ctx = inputs.one::<Context>()?;
        Ok(ChartFactoryHandle {
            ctx: ctx.as_ref().clone(),
        })
    }
}
