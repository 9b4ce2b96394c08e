//! Plan components: the units of work a plan runs before synthesis.

use std::future::Future;

use async_trait::async_trait;

use crate::context::Context;
use crate::error::Result;
use crate::results::Unit;

/// A unit of work attached to a plan.
///
/// Components typically create a chart through [`Context::chart`], declare
/// resources in it and return the chart as a [`Unit`]. Any async closure
/// `Fn(Context) -> impl Future<Output = Result<Unit>>` is a component.
#[async_trait]
pub trait PlanComponent: Send + Sync {
    /// Runs the component in the scope carried by `ctx`.
    async fn run(&self, ctx: &Context) -> Result<Unit>;

    /// Name used in logs and previews.
    fn name(&self) -> String {
        short_type_name(std::any::type_name::<Self>())
    }
}

#[async_trait]
impl<F, Fut> PlanComponent for F
where
    F: Fn(Context) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Unit>> + Send,
{
    async fn run(&self, ctx: &Context) -> Result<Unit> {
        (self)(ctx.clone()).await
    }
}

/// Strips module paths from a type name, keeping generic arguments readable.
pub(crate) fn short_type_name(full: &str) -> String {
    let mut out = String::with_capacity(full.len());
    let mut segment = String::new();
    for c in full.chars() {
        match c {
            ':' => segment.clear(),
            '<' | '>' | ',' | ' ' | '&' | '(' | ')' | '[' | ']' => {
                out.push_str(&segment);
                segment.clear();
                out.push(c);
            }
            _ => segment.push(c),
        }
    }
    out.push_str(&segment);
    out
}
