// ============================================================================
// Strict linting - Dangerous or non-idiomatic practices are forbidden
// ============================================================================

#![deny(unsafe_code)]                 // Unsafe code is forbidden
#![warn(missing_docs)]                // All public items must be documented
#![warn(dead_code)]                   // Unused code is flagged
#![deny(non_camel_case_types)]        // Types must follow CamelCase convention

// Additional strictness - Leave nothing unchecked
#![warn(unused_imports)]              // Unused imports are flagged
#![warn(unused_variables)]            // Unused variables are flagged
#![deny(unused_must_use)]             // Must handle Result and Option explicitly
#![deny(non_snake_case)]              // Variables and functions must be snake_case
#![deny(non_upper_case_globals)]      // Constants must be UPPER_CASE
#![deny(nonstandard_style)]           // Non-standard code style is forbidden
#![forbid(unsafe_op_in_unsafe_fn)]    // Unsafe ops in unsafe fns are forbidden

// Clippy lints (warnings only)
#![warn(clippy::all)]                 // All standard Clippy lints
#![warn(clippy::pedantic)]            // Very strict Clippy lints
#![warn(clippy::nursery)]             // Experimental lints
#![warn(clippy::unwrap_used)]         // unwrap() warning
#![warn(clippy::expect_used)]         // expect() warning
#![warn(clippy::panic)]               // panic!() warning
#![warn(clippy::print_stdout)]        // println!() warning
#![warn(clippy::todo)]                // TODO warning
#![warn(clippy::unimplemented)]       // unimplemented!() warning
#![warn(clippy::missing_const_for_fn)] // Force const when possible
#![warn(clippy::unwrap_in_result)]    // unwrap() in Result warning
#![warn(clippy::module_inception)]    // Module with same name as crate warning
#![warn(clippy::redundant_clone)]     // Useless clones warning
#![warn(clippy::shadow_unrelated)]    // Shadowing unrelated variables warning
#![warn(clippy::too_many_arguments)]  // Limit function arguments
#![warn(clippy::cognitive_complexity)] // Limit cognitive complexity

// Safety and robustness lints
#![deny(overflowing_literals)]        // Overflowing literals are forbidden
#![deny(arithmetic_overflow)]         // Arithmetic overflow is forbidden

// ============================================================================
// Crate Documentation
// ============================================================================

//! # crib SDK
//!
//! Compose deployment plans from typed components, synthesize their
//! resources into manifests and apply them against a cluster in
//! locality-ordered bundles.
//!
//! ## Overview
//!
//! - A [`Plan`] is a named, namespaced list of components plus child plans
//!   and manifest resolvers. [`Plan::build`] expands child plans
//!   depth-first and rejects cycles.
//! - Components declare resources in charts. A [`composite`] wires a set of
//!   typed [`Component`]s by what they produce and consume, and runs them
//!   in dependency order.
//! - [`PlanService`] runs every component, synthesizes the charts into a
//!   manifest directory and applies it: each `ClientSideApply` manifest runs
//!   locally through its action, every other contiguous run of manifests is
//!   one `kubectl apply`.
//!
//! ## Modules
//!
//! - [`planner`]: Plan declaration, resolution and previews
//! - [`composite`]: Typed component wiring and execution
//! - [`synth`]: Synthesis engine, worker and manifest resolvers
//! - [`manifest`]: Manifest envelopes, discovery and bundling
//! - [`runner`]: Action runners and dispatch
//! - [`orchestrator`]: The create/apply pipeline
//! - [`identity`]: Deterministic resource ids and DNS labels
//! - [`results`]: Construct nodes, units and the result index
//! - [`config`]: SDK settings loading and validation
//! - [`cli`]: Command-line interface
//!
//! ## Example
//!
//! ```no_run
//! use crib_sdk::manifest::{Action, ClientSideApply, ClientSideApplyManifest};
//! use crib_sdk::{Context, Plan, PlanService, SdkConfig};
//!
//! # async fn example() -> crib_sdk::Result<()> {
//! let plan = Plan::new("local-dev")
//!     .with_namespace("dev")
//!     .with_component(ClientSideApply::new(ClientSideApplyManifest::new(
//!         Action::Kind,
//!         ["create", "cluster"],
//!     )));
//!
//! let state = PlanService::new(SdkConfig::default())
//!     .apply(&Context::new(), plan)
//!     .await?;
//! for id in state.component_ids() {
//!     println!("{id}");
//! }
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Modules
// ============================================================================

pub mod cli;
pub mod composite;
pub mod config;
pub mod context;
pub mod error;
pub mod identity;
pub mod manifest;
pub mod orchestrator;
pub mod planner;
pub mod results;
pub mod runner;
pub mod synth;

// ============================================================================
// Re-exports
// ============================================================================

pub use cli::{Cli, Commands, OutputFormatter};
pub use composite::{Component, Composite, CompositeBuilder, Dependency, Inputs, composite};
pub use config::{ConfigParser, ConfigValidator, SdkConfig};
pub use context::Context;
pub use error::{CribError, Result};
pub use identity::{extract_resource, resource_id, to_dns_label};
pub use orchestrator::{AppPlan, PlanService, PlanState};
pub use planner::{Plan, PlanComponent};
pub use results::{ResultIndex, Unit};
