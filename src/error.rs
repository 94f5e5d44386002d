//! Error types for the construction engine.

use std::sync::Arc;

use thiserror::Error;

/// Errors raised while registering, resolving or disposing.
///
/// Selection errors (`NoAccessibleConstructor`, `AmbiguousConstructor`) are
/// raised while a build plan is compiled, before anything is instantiated.
/// Disposal errors are collected across a whole cascade and raised once it
/// completes.
///
/// # Examples
///
/// ```rust
/// use ferrous_container::{Container, DiError, ServiceType, TypeCatalog};
/// use std::sync::Arc;
///
/// let container = Container::new(Arc::new(TypeCatalog::new()));
/// let logger = ServiceType::interface("ILogger");
///
/// match container.resolve(&logger, None) {
///     Err(DiError::ResolutionFailed { key, source }) => {
///         assert_eq!(key, "ILogger");
///         assert!(matches!(*source, DiError::NotFound(_)));
///     }
///     _ => unreachable!(),
/// }
/// ```
#[derive(Debug, Clone, Error)]
pub enum DiError {
    /// Nothing registered and the type cannot be built implicitly
    #[error("Service not found: {0}")]
    NotFound(String),
    /// Downcast of a resolved instance failed
    #[error("Type mismatch for: {0}")]
    TypeMismatch(String),
    /// No eligible constructor could be selected
    #[error("No accessible constructor for {0}")]
    NoAccessibleConstructor(String),
    /// Two or more constructors tie and neither dominates
    #[error("Ambiguous constructor selection for {0}")]
    AmbiguousConstructor(String),
    /// A parameter is neither resolvable nor defaulted
    #[error("Unresolved dependency {dependency} for parameter `{parameter}` of {target}")]
    UnresolvedDependency {
        target: String,
        parameter: String,
        dependency: String,
    },
    /// The registration cannot be compiled as given
    #[error("Invalid registration for {key}: {reason}")]
    InvalidRegistration { key: String, reason: String },
    /// Circular dependency detected (includes path)
    #[error("Circular dependency: {}", .0.join(" -> "))]
    Circular(Vec<String>),
    /// Maximum recursion depth exceeded
    #[error("Max depth {0} exceeded")]
    DepthExceeded(usize),
    /// A tracked resource failed to dispose
    #[error("Disposal failed: {0}")]
    Disposal(Arc<dyn std::error::Error + Send + Sync>),
    /// Two or more members of a disposal cascade failed
    #[error("{} errors during disposal", .0.len())]
    AggregateDisposal(Vec<DiError>),
    /// Container options could not be read
    #[error("Invalid configuration: {0}")]
    Configuration(String),
    /// Top-level wrapper surfaced by `Container::resolve`
    #[error("Resolution of {key} failed: {source}")]
    ResolutionFailed {
        key: String,
        #[source]
        source: Box<DiError>,
    },
}

impl DiError {
    /// Wraps an arbitrary error raised by a disposable resource.
    pub fn disposal<E>(err: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        DiError::Disposal(Arc::from(err.into()))
    }

    /// Follows `ResolutionFailed` wrappers down to the underlying cause.
    pub fn root_cause(&self) -> &DiError {
        let mut current = self;
        while let DiError::ResolutionFailed { source, .. } = current {
            current = source;
        }
        current
    }

    pub(crate) fn invalid(key: impl ToString, reason: impl Into<String>) -> Self {
        DiError::InvalidRegistration {
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}

/// Result type for container operations
pub type DiResult<T> = Result<T, DiError>;
