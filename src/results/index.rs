//! Insertion-ordered, hierarchically queryable store of applied units.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard};

use tracing::debug;

use crate::identity::extract_resource;

use super::node::Unit;

/// A unit recorded in the index.
#[derive(Debug)]
pub struct ResultNode {
    id: String,
    parent_id: String,
    unit: Unit,
}

impl ResultNode {
    /// Resource name of the unit, with any hash suffix stripped.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Resource name of the parent construct; empty for top-level units.
    #[must_use]
    pub fn parent_id(&self) -> &str {
        &self.parent_id
    }

    /// The recorded unit.
    #[must_use]
    pub const fn unit(&self) -> &Unit {
        &self.unit
    }

    /// Returns the unit's payload if it is a `T`.
    #[must_use]
    pub fn state<T: std::any::Any>(&self) -> Option<&T> {
        self.unit.state::<T>()
    }
}

#[derive(Debug, Default)]
struct Entries {
    by_id: HashMap<String, Vec<Arc<ResultNode>>>,
    ordered: Vec<Arc<ResultNode>>,
}

/// Thread-safe index of applied units.
///
/// Readers receive snapshots, so iterating never holds the lock.
#[derive(Debug, Default)]
pub struct ResultIndex {
    entries: RwLock<Entries>,
}

impl ResultIndex {
    /// Creates an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a unit under its resource name.
    pub fn add(&self, unit: Unit) {
        let node = unit.node();
        let id = extract_resource(node.id()).to_string();
        let parent_id = node
            .parent_id()
            .map(|p| extract_resource(p).to_string())
            .unwrap_or_default();
        debug!("Recording unit {} (parent: {:?})", id, parent_id);

        let entry = Arc::new(ResultNode {
            id,
            parent_id,
            unit,
        });
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries
            .by_id
            .entry(entry.id.clone())
            .or_default()
            .push(Arc::clone(&entry));
        entries.ordered.push(entry);
    }

    /// Every unit recorded under `id`, in insertion order.
    pub fn get(&self, id: &str) -> impl Iterator<Item = Arc<ResultNode>> + use<> {
        let snapshot = self.read().by_id.get(id).cloned().unwrap_or_default();
        snapshot.into_iter()
    }

    /// Every recorded unit, in insertion order.
    pub fn components(&self) -> impl Iterator<Item = Arc<ResultNode>> + use<> {
        self.read().ordered.clone().into_iter()
    }

    /// Resource names of every recorded unit, in insertion order.
    pub fn ids(&self) -> impl Iterator<Item = String> + use<> {
        self.components().map(|n| n.id.clone())
    }

    /// Units whose parent is `parent`.
    #[must_use]
    pub fn children(&self, parent: &ResultNode) -> Vec<Arc<ResultNode>> {
        self.read()
            .ordered
            .iter()
            .filter(|n| n.parent_id == parent.id)
            .cloned()
            .collect()
    }

    /// Units without a parent.
    #[must_use]
    pub fn root_nodes(&self) -> Vec<Arc<ResultNode>> {
        self.read()
            .ordered
            .iter()
            .filter(|n| n.parent_id.is_empty())
            .cloned()
            .collect()
    }

    /// Number of recorded units.
    #[must_use]
    pub fn len(&self) -> usize {
        self.read().ordered.len()
    }

    /// Returns true if nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read(&self) -> RwLockReadGuard<'_, Entries> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::results::ConstructNode;

    fn unit(path: &[&str]) -> Unit {
        let node = path
            .iter()
            .fold(ConstructNode::root(), |node, id| node.child(id));
        Unit::new(node, path.len())
    }

    #[test]
    fn test_add_and_get_strip_hash() {
        let index = ResultIndex::new();
        index.add(unit(&["app-0a1b2c3d", "redis-11111111"]));
        index.add(unit(&["app-0a1b2c3d", "redis-22222222"]));
        index.add(unit(&["app-0a1b2c3d", "postgres-33333333"]));

        let redis: Vec<_> = index.get("redis").collect();
        assert_eq!(redis.len(), 2);
        assert_eq!(redis[0].unit().node().id(), "redis-11111111");
        assert_eq!(redis[1].unit().node().id(), "redis-22222222");
        assert_eq!(index.get("missing").count(), 0);
    }

    #[test]
    fn test_components_preserve_insertion_order() {
        let index = ResultIndex::new();
        for id in ["c-aaaaaaaa", "a-bbbbbbbb", "b-cccccccc"] {
            index.add(unit(&[id]));
        }
        let ids: Vec<_> = index.ids().collect();
        assert_eq!(ids, vec!["c", "a", "b"]);
        assert_eq!(index.len(), 3);
    }

    #[test]
    fn test_children_and_roots() {
        let index = ResultIndex::new();
        index.add(unit(&["app-0a1b2c3d"]));
        index.add(unit(&["app-0a1b2c3d", "db-11111111"]));
        index.add(unit(&["app-0a1b2c3d", "db-11111111", "svc-22222222"]));
        index.add(unit(&["other"]));

        let roots = index.root_nodes();
        assert_eq!(roots.len(), 2);
        assert_eq!(roots[0].id(), "app");
        assert_eq!(roots[1].id(), "other");

        let app_children = index.children(&roots[0]);
        assert_eq!(app_children.len(), 1);
        assert_eq!(app_children[0].id(), "db");
        assert_eq!(app_children[0].parent_id(), "app");
        assert_eq!(index.children(&app_children[0])[0].id(), "svc");
    }

    #[test]
    fn test_snapshot_is_detached_from_later_adds() {
        let index = ResultIndex::new();
        index.add(unit(&["a"]));
        let snapshot = index.components();
        index.add(unit(&["b"]));
        assert_eq!(snapshot.count(), 1);
        assert_eq!(index.components().count(), 2);
        assert_eq!(index.get("a").next().and_then(|n| n.state::<usize>().copied()), Some(1));
    }
}
