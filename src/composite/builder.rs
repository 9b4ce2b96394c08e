//! Component registration and dependency graph construction.

use std::fmt;

use tracing::{debug, info};

use crate::error::ComposeError;

use super::builtins::{ChartFactoryProvider, ContextProvider};
use super::component::{Component, Erased, ErasedComponent};
use super::tag::{Dependency, TypeTag};

pub(super) struct Entry {
    pub(super) name: String,
    pub(super) produces: Option<TypeTag>,
    pub(super) capabilities: Vec<TypeTag>,
    pub(super) consumes: Vec<Dependency>,
    pub(super) component: Box<dyn ErasedComponent>,
}

/// A validated set of components ready to run.
pub struct Composite {
    pub(super) entries: Vec<Entry>,
    pub(super) edges: Vec<Vec<usize>>,
}

/// Collects component registrations for a [`Composite`].
///
/// The invocation context and the chart factory are registered first, so
/// user components start at index 2. Registration names have the form
/// `{index}::{component name}`.
pub struct CompositeBuilder {
    entries: Vec<Entry>,
    errors: Vec<ComposeError>,
    next_index: usize,
}

impl Default for CompositeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CompositeBuilder {
    /// Creates a builder with the built-in producers registered.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            errors: Vec::new(),
            next_index: 0,
        }
        .register(|| ContextProvider)
        .register(|| ChartFactoryProvider)
    }

    /// Registers the component returned by `factory`.
    #[must_use]
    pub fn register<C, F>(mut self, factory: F) -> Self
    where
        C: Component,
        F: FnOnce() -> C,
    {
        self.push(factory());
        self
    }

    /// Registers the component returned by a fallible `factory`.
    ///
    /// A factory error is reported by [`CompositeBuilder::build`].
    #[must_use]
    pub fn try_register<C, E, F>(mut self, factory: F) -> Self
    where
        C: Component,
        E: fmt::Display,
        F: FnOnce() -> Result<C, E>,
    {
        match factory() {
            Ok(component) => self.push(component),
            Err(err) => {
                let component = format!(
                    "{}::{}",
                    self.next_index,
                    TypeTag::of::<C>().name()
                );
                self.next_index += 1;
                self.errors.push(ComposeError::FactoryFailed {
                    component,
                    message: err.to_string(),
                });
            }
        }
        self
    }

    fn push<C: Component>(&mut self, component: C) {
        let erased = Erased::new(component);
        let name = format!("{}::{}", self.next_index, erased.inner().name());
        self.next_index += 1;
        debug!("Registered component {}", name);
        self.entries.push(Entry {
            name,
            produces: erased.produces(),
            capabilities: erased.capabilities(),
            consumes: erased.inner().consumes(),
            component: Box::new(erased),
        });
    }

    /// Validates registrations and derives the dependency graph.
    ///
    /// # Errors
    ///
    /// Returns the factory failure or ambiguous singular dependency when
    /// there is exactly one, or [`ComposeError::Registration`] collecting
    /// all of them.
    pub fn build(self) -> Result<Composite, ComposeError> {
        let Self {
            entries,
            mut errors,
            ..
        } = self;

        let mut edges = Vec::with_capacity(entries.len());
        for (idx, consumer) in entries.iter().enumerate() {
            let mut deps = Vec::new();
            for dependency in &consumer.consumes {
                let producers = producers_of(&entries, idx, *dependency);
                if matches!(dependency, Dependency::One(_)) && producers.len() > 1 {
                    errors.push(ComposeError::AmbiguousProducer {
                        consumer: consumer.name.clone(),
                        type_name: dependency.tag().name(),
                        producers: producers.iter().map(|&i| entries[i].name.clone()).collect(),
                    });
                    continue;
                }
                deps.extend(producers);
            }
            edges.push(deps);
        }

        match errors.len() {
            0 => {}
            1 => return Err(errors.remove(0)),
            _ => return Err(ComposeError::Registration(errors)),
        }

        info!("Registered {} component(s)", entries.len());
        Ok(Composite { entries, edges })
    }
}

/// Producers matching `dependency`, never the consumer itself.
fn producers_of(entries: &[Entry], consumer: usize, dependency: Dependency) -> Vec<usize> {
    entries
        .iter()
        .enumerate()
        .filter(|&(i, _)| i != consumer)
        .filter(|(_, e)| match dependency {
            Dependency::One(tag) | Dependency::Many(tag) => e.produces == Some(tag),
            Dependency::Capability(tag) | Dependency::AllCapabilities(tag) => {
                e.capabilities.contains(&tag)
            }
        })
        .map(|(i, _)| i)
        .collect()
}

impl Composite {
    /// Starts a registration.
    #[must_use]
    pub fn builder() -> CompositeBuilder {
        CompositeBuilder::new()
    }

    /// Registration names in registration order.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.name.clone()).collect()
    }

    /// Each component with the components it depends on.
    #[must_use]
    pub fn dependency_graph(&self) -> Vec<(String, Vec<String>)> {
        self.entries
            .iter()
            .zip(&self.edges)
            .map(|(entry, deps)| {
                let deps = deps.iter().map(|&i| self.entries[i].name.clone()).collect();
                (entry.name.clone(), deps)
            })
            .collect()
    }
}

impl fmt::Debug for Composite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Composite")
            .field("components", &self.names())
            .finish()
    }
}
