//! Invocation context threaded through components and action runners.

use tokio_util::sync::CancellationToken;

use crate::error::{Result, SynthError};
use crate::results::ConstructNode;
use crate::synth::{Chart, SynthesisHandle};

/// Cancellation plus the construct scope new charts attach to.
///
/// Cloning is cheap and clones observe the same cancellation.
#[derive(Debug, Clone, Default)]
pub struct Context {
    cancel: CancellationToken,
    scope: Option<Scope>,
}

/// The synthesis tree position a context writes into.
#[derive(Debug, Clone)]
pub struct Scope {
    synth: SynthesisHandle,
    construct: ConstructNode,
}

impl Scope {
    /// Handle to the synthesis worker.
    #[must_use]
    pub const fn synth(&self) -> &SynthesisHandle {
        &self.synth
    }

    /// Construct new children are created under.
    #[must_use]
    pub const fn construct(&self) -> &ConstructNode {
        &self.construct
    }
}

impl Context {
    /// Creates a context with a fresh cancellation token and no scope.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses `token` for cancellation.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Returns a copy of this context scoped to `construct`.
    #[must_use]
    pub fn with_scope(&self, synth: SynthesisHandle, construct: ConstructNode) -> Self {
        Self {
            cancel: self.cancel.clone(),
            scope: Some(Scope { synth, construct }),
        }
    }

    /// Returns a child context cancelled together with this one.
    #[must_use]
    pub fn child(&self) -> Self {
        Self {
            cancel: self.cancel.child_token(),
            scope: self.scope.clone(),
        }
    }

    /// Token used to cancel running actions.
    #[must_use]
    pub const fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Returns true once cancellation was requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Requests cancellation.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// The current construct scope, if any.
    #[must_use]
    pub const fn scope(&self) -> Option<&Scope> {
        self.scope.as_ref()
    }

    /// Creates a chart named `id` under the current scope.
    ///
    /// # Errors
    ///
    /// Returns an error if the context has no scope or the id is already taken.
    pub async fn chart(&self, id: &str) -> Result<Chart> {
        let scope = self.scope.as_ref().ok_or(SynthError::NoScope)?;
        Chart::create(scope.synth.clone(), &scope.construct, id).await
    }
}
