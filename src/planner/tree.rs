//! Text tree rendering for plan previews.

use std::fmt::{self, Write};

use super::plan::Plan;

/// A labelled node of a preview tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TreeNode {
    label: String,
    children: Vec<TreeNode>,
}

impl TreeNode {
    /// Creates a leaf.
    #[must_use]
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            children: Vec::new(),
        }
    }

    /// Appends a child and returns it for further nesting.
    pub fn add(&mut self, child: Self) -> &mut Self {
        self.children.push(child);
        let last = self.children.len() - 1;
        &mut self.children[last]
    }

    /// Node label.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Direct children.
    #[must_use]
    pub fn children(&self) -> &[Self] {
        &self.children
    }

    fn render(&self, prefix: &str, out: &mut String) {
        for (idx, child) in self.children.iter().enumerate() {
            let last = idx + 1 == self.children.len();
            let (branch, indent) = if last {
                ("\u{2514}\u{2500}\u{2500} ", "    ")
            } else {
                ("\u{251c}\u{2500}\u{2500} ", "\u{2502}   ")
            };
            let _ = writeln!(out, "{prefix}{branch}{}", child.label);
            child.render(&format!("{prefix}{indent}"), out);
        }
    }
}

impl fmt::Display for TreeNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::new();
        let _ = writeln!(out, "{}", self.label);
        self.render("", &mut out);
        f.write_str(&out)
    }
}

impl Plan {
    /// Plan structure as a tree: child plans and component counts.
    #[must_use]
    pub fn structure(&self) -> TreeNode {
        let mut root = TreeNode::new(format!("{}.{}", self.name(), self.namespace()));
        append_structure(self, &mut root);
        root
    }
}

fn append_structure(plan: &Plan, node: &mut TreeNode) {
    for child in plan.child_plans() {
        let branch = node.add(TreeNode::new(format!(
            "Plan: {}.{}",
            child.name(),
            child.namespace()
        )));
        append_structure(child, branch);
    }
    for component in plan.components() {
        node.add(TreeNode::new(component.name()));
    }
}
