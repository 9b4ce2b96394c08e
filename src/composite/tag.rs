//! Type tags, dependency selectors and capability views.

use std::any::{Any, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::planner::short_type_name;

/// Runtime identity of a Rust type, with its name for diagnostics.
#[derive(Clone, Copy)]
pub struct TypeTag {
    id: TypeId,
    name: &'static str,
}

impl TypeTag {
    /// Tag of `T`. Works for trait objects such as `dyn Trait`.
    #[must_use]
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    /// Underlying type id.
    #[must_use]
    pub const fn id(&self) -> TypeId {
        self.id
    }

    /// Type name without module paths.
    #[must_use]
    pub fn name(&self) -> String {
        short_type_name(self.name)
    }

    /// Returns true for the unit type, which marks "produces nothing".
    #[must_use]
    pub fn is_unit(&self) -> bool {
        self.id == TypeId::of::<()>()
    }
}

impl PartialEq for TypeTag {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeTag {}

impl Hash for TypeTag {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeTag({})", self.name)
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

/// A value a component needs before it can run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dependency {
    /// Exactly one producer of the type must be registered.
    One(TypeTag),
    /// Every producer of the type, in execution order. May be empty.
    Many(TypeTag),
    /// The first value, in execution order, offering the capability.
    Capability(TypeTag),
    /// Every value offering the capability, in execution order. May be empty.
    AllCapabilities(TypeTag),
}

impl Dependency {
    /// Singular dependency on `T`.
    #[must_use]
    pub fn one<T: Any + Send + Sync>() -> Self {
        Self::One(TypeTag::of::<T>())
    }

    /// Fan-in dependency on every `T`.
    #[must_use]
    pub fn many<T: Any + Send + Sync>() -> Self {
        Self::Many(TypeTag::of::<T>())
    }

    /// Dependency on any value viewable as `C`, usually a `dyn Trait`.
    #[must_use]
    pub fn capability<C: ?Sized + Send + Sync + 'static>() -> Self {
        Self::Capability(TypeTag::of::<C>())
    }

    /// Fan-in dependency on every value viewable as `C`.
    #[must_use]
    pub fn all_capabilities<C: ?Sized + Send + Sync + 'static>() -> Self {
        Self::AllCapabilities(TypeTag::of::<C>())
    }

    /// Tag of the consumed type or capability.
    #[must_use]
    pub const fn tag(&self) -> TypeTag {
        match self {
            Self::One(t) | Self::Many(t) | Self::Capability(t) | Self::AllCapabilities(t) => *t,
        }
    }

    /// Returns true if missing producers are an error.
    #[must_use]
    pub const fn is_required(&self) -> bool {
        matches!(self, Self::One(_) | Self::Capability(_))
    }
}

type ErasedValue = Arc<dyn Any + Send + Sync>;

/// A capability a component's output offers to consumers.
pub struct Provide<T> {
    tag: TypeTag,
    view: Box<dyn Fn(Arc<T>) -> ErasedValue + Send + Sync>,
}

impl<T: Send + Sync + 'static> Provide<T> {
    /// Offers the output as `C` through `view`, typically an unsizing
    /// conversion such as `|v: Arc<T>| -> Arc<dyn Trait> { v }`.
    #[must_use]
    pub fn capability<C: ?Sized + Send + Sync + 'static>(view: fn(Arc<T>) -> Arc<C>) -> Self {
        Self {
            tag: TypeTag::of::<C>(),
            view: Box::new(move |value| Arc::new(view(value)) as ErasedValue),
        }
    }

    /// Tag of the offered capability.
    #[must_use]
    pub const fn tag(&self) -> TypeTag {
        self.tag
    }

    pub(super) fn view(&self, value: Arc<T>) -> ErasedValue {
        (self.view)(value)
    }
}

impl<T> fmt::Debug for Provide<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Provide").field("tag", &self.tag).finish()
    }
}
