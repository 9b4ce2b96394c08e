//! Plan declaration and resolution.
//!
//! This module handles the tree of plans a deployment is built from:
//! - Declaring plans with components, child plans and manifest resolvers
//! - Resolving child plans depth-first with cycle detection
//! - Ordering components for execution and rendering previews

mod component;
mod plan;
mod resolve;
mod tree;

pub use component::PlanComponent;
pub(crate) use component::short_type_name;
pub use plan::{DEFAULT_NAMESPACE, Plan, PlanRef};
pub use tree::TreeNode;
