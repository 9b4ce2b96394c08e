//! Error types for the crib SDK.
//!
//! Every subsystem owns an error enum and all of them fold into
//! [`CribError`]. Plan cycles, wiring faults and apply policy failures are
//! all returned as values so callers decide whether to recover.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for the crib SDK.
#[derive(Debug, Error)]
pub enum CribError {
    /// Plan resolution errors.
    #[error("Plan error: {0}")]
    Plan(#[from] PlanError),

    /// Component composition errors.
    #[error("Composition error: {0}")]
    Compose(#[from] ComposeError),

    /// Manifest discovery and parsing errors.
    #[error("Manifest error: {0}")]
    Manifest(#[from] ManifestError),

    /// Apply-time errors.
    #[error("Apply error: {0}")]
    Apply(#[from] ApplyError),

    /// Synthesis engine errors.
    #[error("Synthesis error: {0}")]
    Synth(#[from] SynthError),

    /// Configuration-related errors.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// IO errors.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Plan construction and resolution errors.
#[derive(Debug, Clone, Error)]
pub enum PlanError {
    /// A plan transitively lists itself as a descendant.
    #[error("Plan dependency cycle detected: {} \u{27f3}", .chain.join(" -> "))]
    Cycle {
        /// Plan names from the root of the resolution to the repeated plan.
        chain: Vec<String>,
    },

    /// A plan was declared without a name.
    #[error("Plan name must not be empty")]
    EmptyName,

    /// The namespace option was supplied twice.
    #[error("Namespace of plan '{plan}' already set to '{current}', refusing '{requested}'")]
    NamespaceAlreadySet {
        /// Plan name.
        plan: String,
        /// Namespace already in effect.
        current: String,
        /// Namespace that was rejected.
        requested: String,
    },
}

/// Component registration and execution errors.
#[derive(Debug, Error)]
pub enum ComposeError {
    /// A fallible component factory returned an error.
    #[error("Factory for component {component:?} failed: {message}")]
    FactoryFailed {
        /// Registration name of the component.
        component: String,
        /// Factory failure description.
        message: String,
    },

    /// A singular dependency has more than one producer.
    #[error(
        "component {consumer:?} consumes single {type_name} but multiple producers exist: [{}]. \
         Consider consuming many::<{type_name}>() instead",
        .producers.join(", ")
    )]
    AmbiguousProducer {
        /// Component declaring the singular dependency.
        consumer: String,
        /// Name of the consumed type.
        type_name: String,
        /// Every component producing the type.
        producers: Vec<String>,
    },

    /// Several registration errors collected in one pass.
    #[error("{} component registration error(s): {}", .0.len(), join_errors(.0.as_slice()))]
    Registration(Vec<ComposeError>),

    /// The component dependency graph contains a cycle.
    #[error("circular dependency detected involving {component}")]
    CircularDependency {
        /// Component found while still being visited.
        component: String,
    },

    /// No registered component produces a required value.
    #[error("component {component:?} has a missing dependency: no registered component provides {type_name}")]
    MissingDependency {
        /// Consuming component.
        component: String,
        /// Name of the missing type or capability.
        type_name: String,
    },

    /// A component read a value it did not list in `consumes()`.
    #[error("component {component:?} reads {type_name} without declaring it as a dependency")]
    UndeclaredDependency {
        /// Reading component.
        component: String,
        /// Requested type name.
        type_name: String,
    },

    /// A stored value could not be viewed as the requested type.
    #[error("component {component:?} requested {type_name} but the stored value has a different type")]
    TypeMismatch {
        /// Consuming component.
        component: String,
        /// Requested type name.
        type_name: String,
    },

    /// A component's apply step returned an error.
    #[error("executing component {component}: {source}")]
    ComponentFailed {
        /// Component name.
        component: String,
        /// Underlying error.
        #[source]
        source: Box<CribError>,
    },
}

/// Manifest discovery and parsing errors.
#[derive(Debug, Error)]
pub enum ManifestError {
    /// A manifest file could not be read.
    #[error("Failed to read manifest {path}: {source}")]
    Read {
        /// Manifest path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// A manifest file is not valid YAML for the expected shape.
    #[error("Failed to parse manifest {path}: {message}")]
    Parse {
        /// Manifest path.
        path: PathBuf,
        /// Parser message.
        message: String,
    },

    /// A manifest parsed but its content is invalid.
    #[error("Invalid manifest {path}: {message}")]
    Invalid {
        /// Manifest path.
        path: PathBuf,
        /// Validation message.
        message: String,
    },

    /// Walking the manifest directory failed.
    #[error("Failed to walk manifest directory: {message}")]
    Walk {
        /// Walker message.
        message: String,
    },
}

/// Apply-time errors.
#[derive(Debug, Error)]
pub enum ApplyError {
    /// A bundle failed under the abort policy; remaining bundles are skipped.
    #[error("bundle {bundle} aborted the apply: {source}")]
    Abort {
        /// Bundle description.
        bundle: String,
        /// Underlying error.
        #[source]
        source: Box<CribError>,
    },

    /// A bundle failed under the continue policy; processing proceeds.
    #[error("bundle {bundle} failed, continuing: {source}")]
    Continue {
        /// Bundle description.
        bundle: String,
        /// Underlying error.
        #[source]
        source: Box<CribError>,
    },

    /// One or more plan components failed before any action was dispatched.
    #[error("{} plan component(s) failed: {}", .0.len(), join_errors(.0.as_slice()))]
    Construction(Vec<CribError>),

    /// No executable with the given name exists on the search path.
    #[error("executable {name:?} not found in PATH")]
    ExecutableNotFound {
        /// Executable name.
        name: String,
    },

    /// A process could not be started.
    #[error("failed to spawn {command:?}: {source}")]
    Spawn {
        /// Rendered command line.
        command: String,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// A process exited unsuccessfully.
    #[error("command {command:?} exited with status {}: {output}", .status.map_or_else(|| "signal".to_string(), |c| c.to_string()))]
    CommandFailed {
        /// Rendered command line.
        command: String,
        /// Exit code, if the process was not killed by a signal.
        status: Option<i32>,
        /// Captured combined output.
        output: String,
    },

    /// The invocation was cancelled while a command was running.
    #[error("command {command:?} cancelled")]
    Cancelled {
        /// Rendered command line.
        command: String,
    },
}

/// Synthesis engine errors.
#[derive(Debug, Error)]
pub enum SynthError {
    /// The synthesis worker has shut down.
    #[error("Synthesis worker is no longer running")]
    WorkerGone,

    /// A chart was requested from a context without construct scope.
    #[error("No construct scope in context")]
    NoScope,

    /// A chart handle does not belong to this engine.
    #[error("Unknown chart: {id}")]
    UnknownChart {
        /// Chart identifier.
        id: String,
    },

    /// A construct id is already used within the same scope.
    #[error("There is already a construct with id '{id}' in scope '{scope}'")]
    DuplicateConstruct {
        /// Parent scope path.
        scope: String,
        /// Duplicated id.
        id: String,
    },

    /// A construct was declared with an empty id.
    #[error("Construct ids must not be empty (scope '{scope}')")]
    EmptyId {
        /// Parent scope path.
        scope: String,
    },

    /// A resource could not be serialized.
    #[error("Failed to serialize resource {id}: {message}")]
    Serialize {
        /// Resource id.
        id: String,
        /// Serializer message.
        message: String,
    },
}

/// Configuration-related errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file was not found.
    #[error("Configuration file not found: {path}")]
    FileNotFound {
        /// Path to the missing file.
        path: PathBuf,
    },

    /// The configuration file could not be parsed.
    #[error("Failed to parse configuration: {message}")]
    ParseError {
        /// Description of the parse error.
        message: String,
        /// Optional source location.
        location: Option<String>,
    },

    /// Validation failed.
    #[error("Configuration validation failed: {message}")]
    ValidationError {
        /// Description of the validation error.
        message: String,
        /// Field that failed validation.
        field: Option<String>,
    },
}

/// Result type alias for crib SDK operations.
pub type Result<T> = std::result::Result<T, CribError>;

fn join_errors<E: std::fmt::Display>(errors: &[E]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl CribError {
    /// Creates a new internal error with the given message.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Returns true if this error carries the abort policy.
    #[must_use]
    pub const fn is_abort(&self) -> bool {
        matches!(self, Self::Apply(ApplyError::Abort { .. }))
    }

    /// Returns true if this error carries the continue policy.
    #[must_use]
    pub const fn is_continue(&self) -> bool {
        matches!(self, Self::Apply(ApplyError::Continue { .. }))
    }
}

impl ComposeError {
    /// Wraps an error returned by a component.
    #[must_use]
    pub fn component_failed(component: impl Into<String>, source: CribError) -> Self {
        Self::ComponentFailed {
            component: component.into(),
            source: Box::new(source),
        }
    }
}

impl ApplyError {
    /// Wraps an error with the abort policy.
    #[must_use]
    pub fn abort(bundle: impl Into<String>, source: impl Into<CribError>) -> Self {
        Self::Abort {
            bundle: bundle.into(),
            source: Box::new(source.into()),
        }
    }

    /// Wraps an error with the continue policy.
    #[must_use]
    pub fn continue_with(bundle: impl Into<String>, source: impl Into<CribError>) -> Self {
        Self::Continue {
            bundle: bundle.into(),
            source: Box::new(source.into()),
        }
    }
}

impl ConfigError {
    /// Creates a validation error for a specific field.
    #[must_use]
    pub fn validation(message: impl Into<String>, field: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Creates a validation error without a specific field.
    #[must_use]
    pub fn validation_general(message: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
            field: None,
        }
    }
}
