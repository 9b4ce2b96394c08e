//! Auto-wiring composition engine.
//!
//! Components declare what they produce through [`Component::Output`] and
//! what they consume through an ordered list of [`Dependency`] selectors.
//! [`CompositeBuilder`] derives the producer/consumer graph from those
//! declarations, rejects ambiguous singular dependencies at registration
//! time, and [`Composite::apply`] runs every component once in dependency
//! order, feeding produced values into later consumers.
//!
//! Two built-in producers are always registered ahead of user components:
//! the invocation [`Context`](crate::Context) and a [`ChartFactory`]
//! capability for creating charts under the composite's own chart.
//!
//! ```no_run
//! use std::sync::Arc;
//! use async_trait::async_trait;
//! use crib_sdk::composite::{Component, Composite, Dependency, Inputs};
//!
//! struct Namespace;
//! struct Database;
//!
//! #[async_trait]
//! impl Component for Namespace {
//!     type Output = String;
//!     async fn apply(&mut self, _inputs: &Inputs) -> crib_sdk::Result<String> {
//!         Ok("data".to_string())
//!     }
//! }
//!
//! #[async_trait]
//! impl Component for Database {
//!     type Output = ();
//!     fn consumes(&self) -> Vec<Dependency> {
//!         vec![Dependency::one::<String>()]
//!     }
//!     async fn apply(&mut self, inputs: &Inputs) -> crib_sdk::Result<()> {
//!         let namespace: Arc<String> = inputs.one()?;
//!         assert_eq!(namespace.as_str(), "data");
//!         Ok(())
//!     }
//! }
//!
//! # async fn run() -> crib_sdk::Result<()> {
//! let composite = Composite::builder()
//!     .register(|| Database)
//!     .register(|| Namespace)
//!     .build()?;
//! let _outputs = composite.apply(&crib_sdk::Context::new()).await?;
//! # Ok(())
//! # }
//! ```

mod builder;
mod builtins;
mod component;
mod execute;
mod plan;
mod tag;

pub use builder::{Composite, CompositeBuilder};
pub use builtins::{ChartFactory, ChartFactoryHandle};
pub use component::Component;
pub use execute::{Inputs, Outputs};
pub use plan::{CompositeComponent, composite};
pub use tag::{Dependency, Provide, TypeTag};
