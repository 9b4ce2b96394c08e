//! Construct nodes and applied units.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Separator between construct ids in a path.
pub const PATH_SEPARATOR: char = '/';

/// Position of a construct in the synthesis tree.
///
/// The root of the tree has an empty id and path. Every other node's path is
/// its ancestors' ids followed by its own id, joined by `/`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct ConstructNode {
    id: String,
    path: String,
}

impl ConstructNode {
    /// Returns the root node.
    #[must_use]
    pub fn root() -> Self {
        Self::default()
    }

    /// Returns the node for a child `id` of this node.
    #[must_use]
    pub fn child(&self, id: &str) -> Self {
        let path = if self.path.is_empty() {
            id.to_string()
        } else {
            format!("{}{PATH_SEPARATOR}{id}", self.path)
        };
        Self {
            id: id.to_string(),
            path,
        }
    }

    /// Construct id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Full construct path.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns true for the root node.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.path.is_empty()
    }

    /// Id of the closest ancestor, found by walking the path up to this node's id.
    #[must_use]
    pub fn parent_id(&self) -> Option<&str> {
        let mut parent = None;
        for segment in self.path.split(PATH_SEPARATOR).filter(|s| !s.is_empty()) {
            if segment == self.id {
                break;
            }
            parent = Some(segment);
        }
        parent
    }
}

impl fmt::Display for ConstructNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_root() {
            write!(f, "<root>")
        } else {
            write!(f, "{}", self.path)
        }
    }
}

/// The outcome of running one plan component.
#[derive(Clone)]
pub struct Unit {
    node: ConstructNode,
    payload: Arc<dyn Any + Send + Sync>,
}

impl Unit {
    /// Creates a unit carrying a typed payload.
    #[must_use]
    pub fn new<T: Any + Send + Sync>(node: ConstructNode, payload: T) -> Self {
        Self {
            node,
            payload: Arc::new(payload),
        }
    }

    /// Creates a unit for a construct without payload.
    #[must_use]
    pub fn from_node(node: ConstructNode) -> Self {
        Self::new(node, ())
    }

    /// Construct the unit is attached to.
    #[must_use]
    pub const fn node(&self) -> &ConstructNode {
        &self.node
    }

    /// Returns the payload if it is a `T`.
    #[must_use]
    pub fn state<T: Any>(&self) -> Option<&T> {
        self.payload.downcast_ref::<T>()
    }
}

impl fmt::Debug for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Unit").field("node", &self.node).finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_child_paths() {
        let chart = ConstructNode::root().child("app-0a1b2c3d");
        let pod = chart.child("pod-11111111");
        assert_eq!(chart.path(), "app-0a1b2c3d");
        assert_eq!(pod.path(), "app-0a1b2c3d/pod-11111111");
        assert_eq!(pod.id(), "pod-11111111");
    }

    #[test]
    fn test_parent_id() {
        let chart = ConstructNode::root().child("app");
        assert_eq!(ConstructNode::root().parent_id(), None);
        assert_eq!(chart.parent_id(), None);
        assert_eq!(chart.child("db").parent_id(), Some("app"));
        assert_eq!(chart.child("db").child("svc").parent_id(), Some("db"));
    }

    #[test]
    fn test_unit_state_downcast() {
        #[derive(Debug, PartialEq)]
        struct Endpoint(&'static str);

        let unit = Unit::new(ConstructNode::root().child("svc"), Endpoint("http://svc"));
        assert_eq!(unit.state::<Endpoint>(), Some(&Endpoint("http://svc")));
        assert!(unit.state::<String>().is_none());
        assert!(Unit::from_node(ConstructNode::root()).state::<()>().is_some());
    }
}
