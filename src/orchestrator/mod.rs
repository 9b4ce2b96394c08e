//! Apply pipeline.
//!
//! [`PlanService::create_plan`] resolves a [`Plan`](crate::planner::Plan),
//! runs its components and synthesizes their resources into a manifest
//! directory. [`AppPlan::apply`] then discovers that directory's bundles and
//! applies them in order:
//! - a local bundle runs its single `ClientSideApply` manifest through the
//!   action registry, honoring the manifest's failure policy
//! - a remote bundle becomes one `kubectl apply` over all of its files and
//!   aborts the apply on failure
//!
//! The returned [`PlanState`] gives read access to every recorded unit in
//! execution order.

mod apply;
mod preview;
mod service;
mod state;

pub use apply::{BundleOutcome, BundleReport};
pub use service::{AppPlan, DEFAULT_TEMP_PREFIX, PlanService, temp_dir_prefix};
pub use state::{PlanState, PlanSummary};
