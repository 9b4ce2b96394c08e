//! Synthesis engine interface and the bundled YAML engine.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_yaml::Value;
use tracing::{debug, info};

use crate::error::{Result, SynthError};
use crate::identity::to_dns_label;
use crate::results::ConstructNode;

use super::resolver::ManifestResolver;

/// Owns a construct tree of charts and resources.
///
/// Implementations are driven from a single worker thread and never shared.
pub trait SynthesisEngine: Send + 'static {
    /// Adds a chart under `parent`, which must be the root or another chart.
    ///
    /// # Errors
    ///
    /// Returns an error if the parent is unknown or the id is taken.
    fn add_chart(&mut self, parent: &ConstructNode, id: &str) -> Result<ConstructNode>;

    /// Adds a resource document under the chart `parent`.
    ///
    /// # Errors
    ///
    /// Returns an error if the parent is not a chart or the id is taken.
    fn add_resource(&mut self, parent: &ConstructNode, id: &str, manifest: Value)
    -> Result<ConstructNode>;

    /// Direct children of `node`, in creation order.
    fn children(&self, node: &ConstructNode) -> Vec<ConstructNode>;

    /// Writes every resource below `out_dir`, running `resolvers` on each
    /// document first. Returns the written files in write order.
    ///
    /// # Errors
    ///
    /// Returns an error if a document cannot be serialized or written.
    fn synthesize(
        &mut self,
        out_dir: &Path,
        resolvers: &[Arc<dyn ManifestResolver>],
    ) -> Result<Vec<PathBuf>>;
}

#[derive(Debug)]
enum Construct {
    Chart(ConstructNode),
    Resource {
        node: ConstructNode,
        chart: ConstructNode,
        manifest: Value,
    },
}

/// Writes one folder per chart and one file per resource.
///
/// Folder and file names carry a zero-padded creation index, so the
/// lexicographic order of the output matches declaration order.
#[derive(Debug, Default)]
pub struct YamlSynthesizer {
    constructs: Vec<Construct>,
    paths: HashSet<String>,
    charts: HashSet<String>,
}

impl YamlSynthesizer {
    /// Creates an empty engine.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn claim(&mut self, parent: &ConstructNode, id: &str) -> Result<ConstructNode> {
        if id.is_empty() {
            return Err(SynthError::EmptyId {
                scope: parent.to_string(),
            }
            .into());
        }
        let node = parent.child(id);
        if !self.paths.insert(node.path().to_string()) {
            return Err(SynthError::DuplicateConstruct {
                scope: parent.to_string(),
                id: id.to_string(),
            }
            .into());
        }
        Ok(node)
    }

    fn is_chart(&self, node: &ConstructNode) -> bool {
        self.charts.contains(node.path())
    }
}

impl SynthesisEngine for YamlSynthesizer {
    fn add_chart(&mut self, parent: &ConstructNode, id: &str) -> Result<ConstructNode> {
        if !parent.is_root() && !self.is_chart(parent) {
            return Err(SynthError::UnknownChart {
                id: parent.path().to_string(),
            }
            .into());
        }
        let node = self.claim(parent, id)?;
        debug!("Adding chart {}", node);
        self.charts.insert(node.path().to_string());
        self.constructs.push(Construct::Chart(node.clone()));
        Ok(node)
    }

    fn add_resource(
        &mut self,
        parent: &ConstructNode,
        id: &str,
        manifest: Value,
    ) -> Result<ConstructNode> {
        if !self.is_chart(parent) {
            return Err(SynthError::UnknownChart {
                id: parent.path().to_string(),
            }
            .into());
        }
        let node = self.claim(parent, id)?;
        debug!("Adding resource {}", node);
        self.constructs.push(Construct::Resource {
            node: node.clone(),
            chart: parent.clone(),
            manifest,
        });
        Ok(node)
    }

    fn children(&self, node: &ConstructNode) -> Vec<ConstructNode> {
        self.constructs
            .iter()
            .map(|c| match c {
                Construct::Chart(n) | Construct::Resource { node: n, .. } => n,
            })
            .filter(|n| node.child(n.id()) == **n)
            .cloned()
            .collect()
    }

    fn synthesize(
        &mut self,
        out_dir: &Path,
        resolvers: &[Arc<dyn ManifestResolver>],
    ) -> Result<Vec<PathBuf>> {
        std::fs::create_dir_all(out_dir)?;
        let charts: Vec<&ConstructNode> = self
            .constructs
            .iter()
            .filter_map(|c| match c {
                Construct::Chart(node) => Some(node),
                Construct::Resource { .. } => None,
            })
            .collect();

        let mut written = Vec::new();
        for (chart_idx, chart) in charts.iter().enumerate() {
            let resources = self.constructs.iter().filter_map(|c| match c {
                Construct::Resource {
                    node,
                    chart: owner,
                    manifest,
                } if owner == *chart => Some((node, manifest)),
                _ => None,
            });

            let chart_dir = out_dir.join(format!("{chart_idx:04}-{}", to_dns_label(chart.id())));
            for (res_idx, (node, manifest)) in resources.enumerate() {
                let mut document = manifest.clone();
                for resolver in resolvers {
                    resolver.resolve(&mut document);
                }
                let yaml = serde_yaml::to_string(&document).map_err(|e| SynthError::Serialize {
                    id: node.path().to_string(),
                    message: e.to_string(),
                })?;

                if res_idx == 0 {
                    std::fs::create_dir_all(&chart_dir)?;
                }
                let file = chart_dir.join(format!("{res_idx:04}-{}.yaml", to_dns_label(node.id())));
                std::fs::write(&file, yaml)?;
                written.push(file);
            }
        }

        info!(
            "Synthesized {} manifest(s) into {}",
            written.len(),
            out_dir.display()
        );
        Ok(written)
    }
}
