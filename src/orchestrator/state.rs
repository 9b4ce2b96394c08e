//! Outcome of an apply run.

use std::any::Any;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::error::CribError;
use crate::results::{ResultIndex, ResultNode};

use super::apply::{BundleReport, Execution};

/// What an apply recorded: the units produced by every plan component and
/// the bundles that ran.
///
/// Iteration preserves execution order.
#[derive(Debug)]
pub struct PlanState {
    run_id: Uuid,
    started_at: DateTime<Utc>,
    finished_at: DateTime<Utc>,
    manifest_dir: PathBuf,
    digest: String,
    bundles: Vec<BundleReport>,
    continued: Vec<CribError>,
    index: Arc<ResultIndex>,
}

/// Serializable view of a [`PlanState`].
#[derive(Debug, Clone, Serialize)]
pub struct PlanSummary {
    /// Run identifier.
    pub run_id: String,
    /// When the apply started.
    pub started_at: DateTime<Utc>,
    /// When the apply finished.
    pub finished_at: DateTime<Utc>,
    /// Manifest directory that was applied.
    pub manifest_dir: PathBuf,
    /// SHA-256 of the applied manifests.
    pub digest: String,
    /// Resource names of the recorded units.
    pub components: Vec<String>,
    /// Per-bundle reports.
    pub bundles: Vec<BundleReport>,
    /// Failures recorded under the continue policy.
    pub continued_errors: Vec<String>,
}

impl PlanState {
    pub(crate) fn new(
        started_at: DateTime<Utc>,
        manifest_dir: &Path,
        digest: String,
        execution: Execution,
        index: Arc<ResultIndex>,
    ) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at,
            finished_at: Utc::now(),
            manifest_dir: manifest_dir.to_path_buf(),
            digest,
            bundles: execution.reports,
            continued: execution.continued,
            index,
        }
    }

    /// Unique id of this run.
    #[must_use]
    pub const fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Directory the bundles were discovered in.
    #[must_use]
    pub fn manifest_dir(&self) -> &Path {
        &self.manifest_dir
    }

    /// SHA-256 over the applied manifests.
    #[must_use]
    pub fn digest(&self) -> &str {
        &self.digest
    }

    /// Every unit recorded under `id`.
    pub fn component_by_name(&self, id: &str) -> impl Iterator<Item = Arc<ResultNode>> + use<> {
        self.index.get(id)
    }

    /// Every recorded unit.
    pub fn components(&self) -> impl Iterator<Item = Arc<ResultNode>> + use<> {
        self.index.components()
    }

    /// Resource names of every recorded unit.
    pub fn component_ids(&self) -> impl Iterator<Item = String> + use<> {
        self.index.ids()
    }

    /// Payloads of type `T` recorded under `id`; units carrying another
    /// type are skipped.
    #[must_use]
    pub fn states<T: Any + Clone>(&self, id: &str) -> Vec<T> {
        self.index
            .get(id)
            .filter_map(|node| node.state::<T>().cloned())
            .collect()
    }

    /// The underlying result index.
    #[must_use]
    pub fn index(&self) -> &ResultIndex {
        &self.index
    }

    /// Reports of the bundles that ran.
    #[must_use]
    pub fn bundles(&self) -> &[BundleReport] {
        &self.bundles
    }

    /// Failures recorded under the continue policy.
    #[must_use]
    pub fn continued_errors(&self) -> &[CribError] {
        &self.continued
    }

    /// Returns true if no bundle failed.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.continued.is_empty()
    }

    /// Serializable summary.
    #[must_use]
    pub fn summary(&self) -> PlanSummary {
        PlanSummary {
            run_id: self.run_id.to_string(),
            started_at: self.started_at,
            finished_at: self.finished_at,
            manifest_dir: self.manifest_dir.clone(),
            digest: self.digest.clone(),
            components: self.component_ids().collect(),
            bundles: self.bundles.clone(),
            continued_errors: self.continued.iter().map(ToString::to_string).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::results::{ConstructNode, Unit};

    fn state_with(units: Vec<Unit>) -> PlanState {
        let index = ResultIndex::new();
        for unit in units {
            index.add(unit);
        }
        PlanState::new(
            Utc::now(),
            Path::new("/tmp/out"),
            String::from("digest"),
            Execution::default(),
            Arc::new(index),
        )
    }

    #[test]
    fn test_typed_extraction_skips_other_payloads() {
        let chart = ConstructNode::root().child("app.default-1a2b3c4d");
        let state = state_with(vec![
            Unit::new(chart.child("db-0011aabb"), String::from("postgres")),
            Unit::new(chart.child("db-0011aabb"), 5432_u16),
            Unit::new(chart.child("cache-99ff0011"), String::from("redis")),
        ]);

        assert_eq!(state.states::<String>("db"), ["postgres"]);
        assert_eq!(state.states::<u16>("db"), [5432]);
        assert_eq!(state.component_by_name("db").count(), 2);
        assert_eq!(
            state.component_ids().collect::<Vec<_>>(),
            ["db", "db", "cache"]
        );
    }

    #[test]
    fn test_summary_serializes() {
        let state = state_with(vec![Unit::from_node(
            ConstructNode::root().child("web-0a0b0c0d"),
        )]);
        let json = serde_json::to_value(state.summary()).unwrap();
        assert_eq!(json["components"], serde_json::json!(["web"]));
        assert_eq!(json["digest"], "digest");
        assert!(state.is_clean());
    }
}
