//! Dependency-ordered execution and result storage.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::context::Context;
use crate::error::{ComposeError, CribError, Result};

use super::builder::Composite;
use super::component::Produced;
use super::tag::{Dependency, TypeTag};

type ErasedValue = Arc<dyn Any + Send + Sync>;

/// Values produced so far, keyed by type and by capability.
#[derive(Default, Clone)]
struct ResultStore {
    latest: HashMap<TypeTag, ErasedValue>,
    all: HashMap<TypeTag, Vec<ErasedValue>>,
    views: HashMap<TypeTag, Vec<ErasedValue>>,
}

impl ResultStore {
    fn record(&mut self, tag: Option<TypeTag>, produced: Produced) {
        if let (Some(tag), Some(value)) = (tag, produced.value) {
            self.all.entry(tag).or_default().push(Arc::clone(&value));
            self.latest.insert(tag, value);
        }
        for (tag, view) in produced.views {
            self.views.entry(tag).or_default().push(view);
        }
    }

    fn resolve(&self, component: &str, dependency: Dependency) -> Result<Slot> {
        let missing = |tag: TypeTag| ComposeError::MissingDependency {
            component: component.to_string(),
            type_name: tag.name(),
        };
        let slot = match dependency {
            Dependency::One(tag) => {
                Slot::Single(Arc::clone(self.latest.get(&tag).ok_or_else(|| missing(tag))?))
            }
            Dependency::Capability(tag) => Slot::Single(Arc::clone(
                self.views
                    .get(&tag)
                    .and_then(|v| v.first())
                    .ok_or_else(|| missing(tag))?,
            )),
            Dependency::Many(tag) => Slot::Multiple(self.all.get(&tag).cloned().unwrap_or_default()),
            Dependency::AllCapabilities(tag) => {
                Slot::Multiple(self.views.get(&tag).cloned().unwrap_or_default())
            }
        };
        Ok(slot)
    }
}

enum Slot {
    Single(ErasedValue),
    Multiple(Vec<ErasedValue>),
}

/// Resolved dependencies handed to [`Component::apply`](super::Component::apply).
pub struct Inputs {
    component: String,
    ctx: Context,
    slots: Vec<(Dependency, Slot)>,
}

impl Inputs {
    fn resolve(
        component: &str,
        ctx: &Context,
        consumes: &[Dependency],
        store: &ResultStore,
    ) -> Result<Self> {
        let slots = consumes
            .iter()
            .map(|dep| Ok((*dep, store.resolve(component, *dep)?)))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            component: component.to_string(),
            ctx: ctx.clone(),
            slots,
        })
    }

    /// Registration name of the running component.
    #[must_use]
    pub fn component(&self) -> &str {
        &self.component
    }

    /// Context the composite was applied with.
    #[must_use]
    pub const fn context(&self) -> &Context {
        &self.ctx
    }

    fn slot(&self, dependency: Dependency) -> Result<&Slot> {
        self.slots
            .iter()
            .find(|(d, _)| *d == dependency)
            .map(|(_, slot)| slot)
            .ok_or_else(|| {
                CribError::from(ComposeError::UndeclaredDependency {
                    component: self.component.clone(),
                    type_name: dependency.tag().name(),
                })
            })
    }

    fn mismatch(&self, tag: TypeTag) -> ComposeError {
        ComposeError::TypeMismatch {
            component: self.component.clone(),
            type_name: tag.name(),
        }
    }

    /// The single produced `T`, declared with [`Dependency::one`].
    ///
    /// # Errors
    ///
    /// Returns an error if `T` was not declared as a singular dependency.
    pub fn one<T: Any + Send + Sync>(&self) -> Result<Arc<T>> {
        let dep = Dependency::one::<T>();
        match self.slot(dep)? {
            Slot::Single(value) => Arc::clone(value)
                .downcast::<T>()
                .map_err(|_| CribError::from(self.mismatch(dep.tag()))),
            Slot::Multiple(_) => Err(CribError::from(self.mismatch(dep.tag()))),
        }
    }

    /// Every produced `T` in execution order, declared with [`Dependency::many`].
    ///
    /// # Errors
    ///
    /// Returns an error if `T` was not declared as a fan-in dependency.
    pub fn many<T: Any + Send + Sync>(&self) -> Result<Vec<Arc<T>>> {
        let dep = Dependency::many::<T>();
        match self.slot(dep)? {
            Slot::Multiple(values) => values
                .iter()
                .map(|v| {
                    Arc::clone(v)
                        .downcast::<T>()
                        .map_err(|_| CribError::from(self.mismatch(dep.tag())))
                })
                .collect(),
            Slot::Single(_) => Err(CribError::from(self.mismatch(dep.tag()))),
        }
    }

    /// The first value offering `C`, declared with [`Dependency::capability`].
    ///
    /// # Errors
    ///
    /// Returns an error if `C` was not declared as a capability dependency.
    pub fn capability<C: ?Sized + Send + Sync + 'static>(&self) -> Result<Arc<C>> {
        let dep = Dependency::capability::<C>();
        match self.slot(dep)? {
            Slot::Single(value) => value
                .downcast_ref::<Arc<C>>()
                .cloned()
                .ok_or_else(|| CribError::from(self.mismatch(dep.tag()))),
            Slot::Multiple(_) => Err(CribError::from(self.mismatch(dep.tag()))),
        }
    }

    /// Every value offering `C`, declared with [`Dependency::all_capabilities`].
    ///
    /// # Errors
    ///
    /// Returns an error if `C` was not declared as a fan-in capability.
    pub fn capabilities<C: ?Sized + Send + Sync + 'static>(&self) -> Result<Vec<Arc<C>>> {
        let dep = Dependency::all_capabilities::<C>();
        match self.slot(dep)? {
            Slot::Multiple(values) => Ok(downcast_views(values)),
            Slot::Single(_) => Err(CribError::from(self.mismatch(dep.tag()))),
        }
    }
}

impl fmt::Debug for Inputs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let deps: Vec<_> = self.slots.iter().map(|(d, _)| d).collect();
        f.debug_struct("Inputs")
            .field("component", &self.component)
            .field("dependencies", &deps)
            .finish()
    }
}

fn downcast_views<C: ?Sized + Send + Sync + 'static>(values: &[ErasedValue]) -> Vec<Arc<C>> {
    values
        .iter()
        .filter_map(|v| v.downcast_ref::<Arc<C>>().cloned())
        .collect()
}

/// Everything a composite produced.
#[derive(Clone)]
pub struct Outputs {
    store: ResultStore,
}

impl Outputs {
    /// Most recently produced `T`.
    #[must_use]
    pub fn one<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        self.store
            .latest
            .get(&TypeTag::of::<T>())
            .and_then(|v| Arc::clone(v).downcast::<T>().ok())
    }

    /// Every produced `T` in execution order.
    #[must_use]
    pub fn many<T: Any + Send + Sync>(&self) -> Vec<Arc<T>> {
        self.store
            .all
            .get(&TypeTag::of::<T>())
            .map(|values| {
                values
                    .iter()
                    .filter_map(|v| Arc::clone(v).downcast::<T>().ok())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Every value offering `C` in execution order.
    #[must_use]
    pub fn capabilities<C: ?Sized + Send + Sync + 'static>(&self) -> Vec<Arc<C>> {
        self.store
            .views
            .get(&TypeTag::of::<C>())
            .map(|values| downcast_views(values))
            .unwrap_or_default()
    }
}

impl fmt::Debug for Outputs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let types: Vec<_> = self.store.latest.keys().map(TypeTag::name).collect();
        f.debug_struct("Outputs").field("types", &types).finish()
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    Visiting,
    Done,
}

impl Composite {
    /// Component indexes with every component after its dependencies.
    pub(super) fn execution_order(&self) -> std::result::Result<Vec<usize>, ComposeError> {
        let mut marks = vec![Mark::Unvisited; self.entries.len()];
        let mut order = Vec::with_capacity(self.entries.len());
        for idx in 0..self.entries.len() {
            self.visit(idx, &mut marks, &mut order)?;
        }
        Ok(order)
    }

    fn visit(
        &self,
        idx: usize,
        marks: &mut [Mark],
        order: &mut Vec<usize>,
    ) -> std::result::Result<(), ComposeError> {
        match marks[idx] {
            Mark::Done => return Ok(()),
            Mark::Visiting => {
                return Err(ComposeError::CircularDependency {
                    component: self.entries[idx].name.clone(),
                });
            }
            Mark::Unvisited => {}
        }
        marks[idx] = Mark::Visiting;
        for &dep in &self.edges[idx] {
            self.visit(dep, marks, order)?;
        }
        marks[idx] = Mark::Done;
        order.push(idx);
        Ok(())
    }

    /// Runs every component once, dependencies first.
    ///
    /// # Errors
    ///
    /// Returns [`ComposeError::CircularDependency`] if the graph has a cycle,
    /// [`ComposeError::MissingDependency`] if a required value was never
    /// produced, or [`ComposeError::ComponentFailed`] wrapping the first
    /// component error.
    pub async fn apply(mut self, ctx: &Context) -> Result<Outputs> {
        let order = self.execution_order()?;
        info!("Applying {} composite component(s)", order.len());

        let store = RwLock::new(ResultStore::default());
        for idx in order {
            let entry = &mut self.entries[idx];
            let inputs = {
                let guard = store.read().await;
                Inputs::resolve(&entry.name, ctx, &entry.consumes, &guard)?
            };

            debug!("Applying component {}", entry.name);
            let produced = entry
                .component
                .run(&inputs)
                .await
                .map_err(|e| ComposeError::component_failed(entry.name.clone(), e))?;
            store.write().await.record(entry.produces, produced);
        }

        Ok(Outputs {
            store: store.into_inner(),
        })
    }
}
