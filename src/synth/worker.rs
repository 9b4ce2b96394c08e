//! Single-writer worker owning a synthesis engine.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use serde_yaml::Value;
use tokio::sync::{mpsc, oneshot};
use tracing::debug;

use crate::error::{Result, SynthError};
use crate::results::ConstructNode;

use super::engine::SynthesisEngine;
use super::resolver::ManifestResolver;

type Reply<T> = oneshot::Sender<Result<T>>;

enum Request {
    AddChart {
        parent: ConstructNode,
        id: String,
        reply: Reply<ConstructNode>,
    },
    AddResource {
        parent: ConstructNode,
        id: String,
        manifest: Value,
        reply: Reply<ConstructNode>,
    },
    Children {
        node: ConstructNode,
        reply: Reply<Vec<ConstructNode>>,
    },
    Synthesize {
        out_dir: PathBuf,
        resolvers: Vec<Arc<dyn ManifestResolver>>,
        reply: Reply<Vec<PathBuf>>,
    },
}

/// Cloneable handle to the worker that owns a [`SynthesisEngine`].
///
/// Requests are processed one at a time in arrival order. The worker stops
/// once every handle is dropped.
#[derive(Clone)]
pub struct SynthesisHandle {
    tx: mpsc::UnboundedSender<Request>,
}

impl SynthesisHandle {
    /// Moves `engine` onto a blocking worker and returns a handle to it.
    ///
    /// Must be called from within a Tokio runtime.
    #[must_use]
    pub fn spawn<E: SynthesisEngine>(engine: E) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::task::spawn_blocking(move || serve(engine, rx));
        Self { tx }
    }

    /// Adds a chart under `parent`.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine rejects the chart or the worker stopped.
    pub async fn add_chart(&self, parent: &ConstructNode, id: &str) -> Result<ConstructNode> {
        self.call(|reply| Request::AddChart {
            parent: parent.clone(),
            id: id.to_string(),
            reply,
        })
        .await
    }

    /// Adds a resource document under the chart `parent`.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine rejects the resource or the worker stopped.
    pub async fn add_resource(
        &self,
        parent: &ConstructNode,
        id: &str,
        manifest: Value,
    ) -> Result<ConstructNode> {
        self.call(|reply| Request::AddResource {
            parent: parent.clone(),
            id: id.to_string(),
            manifest,
            reply,
        })
        .await
    }

    /// Direct children of `node`, in creation order.
    ///
    /// # Errors
    ///
    /// Returns an error if the worker stopped.
    pub async fn children(&self, node: &ConstructNode) -> Result<Vec<ConstructNode>> {
        self.call(|reply| Request::Children {
            node: node.clone(),
            reply,
        })
        .await
    }

    /// Serializes the construct tree into `out_dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails or the worker stopped.
    pub async fn synthesize(
        &self,
        out_dir: PathBuf,
        resolvers: Vec<Arc<dyn ManifestResolver>>,
    ) -> Result<Vec<PathBuf>> {
        self.call(|reply| Request::Synthesize {
            out_dir,
            resolvers,
            reply,
        })
        .await
    }

    async fn call<T>(&self, request: impl FnOnce(Reply<T>) -> Request) -> Result<T> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(request(reply))
            .map_err(|_| SynthError::WorkerGone)?;
        rx.await.map_err(|_| SynthError::WorkerGone)?
    }
}

impl fmt::Debug for SynthesisHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SynthesisHandle")
            .field("closed", &self.tx.is_closed())
            .finish()
    }
}

fn serve<E: SynthesisEngine>(mut engine: E, mut rx: mpsc::UnboundedReceiver<Request>) {
    debug!("Synthesis worker started");
    while let Some(request) = rx.blocking_recv() {
        match request {
            Request::AddChart { parent, id, reply } => {
                let _ = reply.send(engine.add_chart(&parent, &id));
            }
            Request::AddResource {
                parent,
                id,
                manifest,
                reply,
            } => {
                let _ = reply.send(engine.add_resource(&parent, &id, manifest));
            }
            Request::Children { node, reply } => {
                let _ = reply.send(Ok(engine.children(&node)));
            }
            Request::Synthesize {
                out_dir,
                resolvers,
                reply,
            } => {
                let _ = reply.send(engine.synthesize(&out_dir, &resolvers));
            }
        }
    }
    debug!("Synthesis worker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synth::YamlSynthesizer;

    #[tokio::test]
    async fn test_handle_round_trips_requests() {
        let handle = SynthesisHandle::spawn(YamlSynthesizer::new());
        let chart = handle.add_chart(&ConstructNode::root(), "app").await.unwrap();
        let res = handle
            .add_resource(&chart, "cm", serde_yaml::from_str("kind: ConfigMap").unwrap())
            .await
            .unwrap();
        assert_eq!(res.path(), "app/cm");

        let dir = tempfile::tempdir().unwrap();
        let files = handle
            .synthesize(dir.path().to_path_buf(), Vec::new())
            .await
            .unwrap();
        assert_eq!(files.len(), 1);
    }

    #[tokio::test]
    async fn test_children_lists_direct_constructs() {
        let handle = SynthesisHandle::spawn(YamlSynthesizer::new());
        let app = handle.add_chart(&ConstructNode::root(), "app").await.unwrap();
        let nested = handle.add_chart(&app, "nested").await.unwrap();
        handle
            .add_resource(&nested, "cm", serde_yaml::from_str("kind: ConfigMap").unwrap())
            .await
            .unwrap();
        handle
            .add_resource(&app, "svc", serde_yaml::from_str("kind: Service").unwrap())
            .await
            .unwrap();

        let ids: Vec<String> = handle
            .children(&app)
            .await
            .unwrap()
            .iter()
            .map(|n| n.id().to_string())
            .collect();
        assert_eq!(ids, ["nested", "svc"]);
    }

    #[tokio::test]
    async fn test_engine_errors_are_returned() {
        let handle = SynthesisHandle::spawn(YamlSynthesizer::new());
        handle.add_chart(&ConstructNode::root(), "app").await.unwrap();
        let err = handle.add_chart(&ConstructNode::root(), "app").await.unwrap_err();
        assert!(err.to_string().contains("already a construct"));
    }

    #[tokio::test]
    async fn test_clones_share_one_engine() {
        let handle = SynthesisHandle::spawn(YamlSynthesizer::new());
        let other = handle.clone();
        handle.add_chart(&ConstructNode::root(), "a").await.unwrap();
        assert!(other.add_chart(&ConstructNode::root(), "a").await.is_err());
    }
}
