//! Introspection metadata for constructors, parameters and members.
//!
//! These descriptors are what an [`Introspect`](crate::Introspect) provider
//! hands to the constructor and member selectors. Each constructor carries an
//! activator, each property a setter and each method an invoker, so the engine
//! can build and initialise instances without knowing their Rust types.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use smallvec::SmallVec;

use crate::error::{DiError, DiResult};
use crate::key::Key;
use crate::registration::{AnyArc, AnyBox};
use crate::types::ServiceType;

pub(crate) type Activator = Arc<dyn Fn(&Arguments) -> DiResult<AnyBox> + Send + Sync>;
pub(crate) type Setter = Arc<dyn Fn(&mut AnyBox, AnyArc) -> DiResult<()> + Send + Sync>;
pub(crate) type Invoker = Arc<dyn Fn(&mut AnyBox, &Arguments) -> DiResult<()> + Send + Sync>;

/// Member visibility as reported by the introspection provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Public,
    Private,
}

/// Resolved argument values, one per formal parameter.
pub struct Arguments {
    values: SmallVec<[AnyArc; 4]>,
}

impl Arguments {
    pub(crate) fn new(values: SmallVec<[AnyArc; 4]>) -> Self {
        Self { values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// The type-erased argument at `index`.
    pub fn raw(&self, index: usize) -> DiResult<&AnyArc> {
        self.values
            .get(index)
            .ok_or_else(|| DiError::TypeMismatch(format!("missing argument {}", index)))
    }

    /// The argument at `index`, downcast to `T`.
    pub fn get<T: Any + Send + Sync>(&self, index: usize) -> DiResult<Arc<T>> {
        self.raw(index)?
            .clone()
            .downcast::<T>()
            .map_err(|_| DiError::TypeMismatch(std::any::type_name::<T>().to_string()))
    }
}

/// A formal parameter of a constructor or injection method.
#[derive(Clone)]
pub struct ParameterDescriptor {
    name: String,
    service: ServiceType,
    default: Option<AnyArc>,
    dependency_name: Option<String>,
}

impl ParameterDescriptor {
    pub fn new(name: impl Into<String>, service: ServiceType) -> Self {
        Self {
            name: name.into(),
            service,
            default: None,
            dependency_name: None,
        }
    }

    /// Value used when the parameter type cannot be resolved.
    pub fn with_default<T: Any + Send + Sync>(mut self, value: T) -> Self {
        self.default = Some(Arc::new(value));
        self
    }

    /// Resolve the parameter under a registration name instead of the default one.
    pub fn named(mut self, dependency: impl Into<String>) -> Self {
        self.dependency_name = Some(dependency.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn service(&self) -> &ServiceType {
        &self.service
    }

    pub fn default_value(&self) -> Option<&AnyArc> {
        self.default.as_ref()
    }

    /// Key the container resolves for this parameter.
    pub fn key(&self) -> Key {
        Key::new(self.service.clone(), self.dependency_name.as_deref())
    }
}

impl fmt::Debug for ParameterDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParameterDescriptor")
            .field("name", &self.name)
            .field("service", &self.service)
            .field("has_default", &self.default.is_some())
            .field("dependency_name", &self.dependency_name)
            .finish()
    }
}

/// A constructor of a described type.
///
/// # Examples
///
/// ```rust
/// use ferrous_container::{ConstructorDescriptor, ParameterDescriptor, ServiceType};
/// use std::sync::Arc;
///
/// struct Settings;
/// struct Mailer { settings: Arc<Settings> }
///
/// let ctor = ConstructorDescriptor::new(
///     vec![ParameterDescriptor::new("settings", ServiceType::of::<Settings>())],
///     |args| Ok(Mailer { settings: args.get::<Settings>(0)? }),
/// )
/// .marked();
///
/// assert_eq!(ctor.parameters().len(), 1);
/// assert!(ctor.has_injection_marker());
/// ```
#[derive(Clone)]
pub struct ConstructorDescriptor {
    parameters: Vec<ParameterDescriptor>,
    visibility: Visibility,
    is_static: bool,
    injection_marker: bool,
    activator: Activator,
}

impl ConstructorDescriptor {
    pub fn new<T, F>(parameters: Vec<ParameterDescriptor>, activator: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn(&Arguments) -> DiResult<T> + Send + Sync + 'static,
    {
        Self {
            parameters,
            visibility: Visibility::Public,
            is_static: false,
            injection_marker: false,
            activator: Arc::new(move |args| Ok(Box::new(activator(args)?) as AnyBox)),
        }
    }

    /// Carries the explicit-selection marker.
    pub fn marked(mut self) -> Self {
        self.injection_marker = true;
        self
    }

    pub fn private(mut self) -> Self {
        self.visibility = Visibility::Private;
        self
    }

    /// Static factory-style constructor; never eligible.
    pub fn as_static(mut self) -> Self {
        self.is_static = true;
        self
    }

    pub fn parameters(&self) -> &[ParameterDescriptor] {
        &self.parameters
    }

    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    pub fn is_static(&self) -> bool {
        self.is_static
    }

    pub fn has_injection_marker(&self) -> bool {
        self.injection_marker
    }

    /// Public and non-static.
    pub fn is_eligible(&self) -> bool {
        self.visibility == Visibility::Public && !self.is_static
    }

    /// Number of interface-typed parameters, the tie breaker of the heuristic.
    pub fn interface_parameter_count(&self) -> usize {
        self.parameters
            .iter()
            .filter(|p| p.service().is_interface())
            .count()
    }

    pub(crate) fn activate(&self, args: &Arguments) -> DiResult<AnyBox> {
        (self.activator)(args)
    }
}

impl fmt::Debug for ConstructorDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConstructorDescriptor")
            .field("parameters", &self.parameters)
            .field("visibility", &self.visibility)
            .field("is_static", &self.is_static)
            .field("injection_marker", &self.injection_marker)
            .finish()
    }
}

/// A property that may receive an injected value after construction.
#[derive(Clone)]
pub struct PropertyDescriptor {
    name: String,
    service: ServiceType,
    visibility: Visibility,
    settable: bool,
    dependency_marker: bool,
    dependency_name: Option<String>,
    setter: Setter,
}

impl PropertyDescriptor {
    /// Property on `O` holding an `Arc<V>`.
    pub fn new<O, V, F>(name: impl Into<String>, service: ServiceType, setter: F) -> Self
    where
        O: Any + Send + Sync,
        V: Any + Send + Sync,
        F: Fn(&mut O, Arc<V>) + Send + Sync + 'static,
    {
        let setter: Setter = Arc::new(move |owner: &mut AnyBox, value: AnyArc| {
            let owner = (**owner)
                .downcast_mut::<O>()
                .ok_or_else(|| DiError::TypeMismatch(std::any::type_name::<O>().to_string()))?;
            let value = value
                .downcast::<V>()
                .map_err(|_| DiError::TypeMismatch(std::any::type_name::<V>().to_string()))?;
            setter(owner, value);
            Ok(())
        });
        Self {
            name: name.into(),
            service,
            visibility: Visibility::Public,
            settable: true,
            dependency_marker: false,
            dependency_name: None,
            setter,
        }
    }

    /// Carries the dependency marker.
    pub fn marked(mut self) -> Self {
        self.dependency_marker = true;
        self
    }

    pub fn named(mut self, dependency: impl Into<String>) -> Self {
        self.dependency_name = Some(dependency.into());
        self
    }

    pub fn read_only(mut self) -> Self {
        self.settable = false;
        self
    }

    pub fn private(mut self) -> Self {
        self.visibility = Visibility::Private;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn service(&self) -> &ServiceType {
        &self.service
    }

    pub fn has_dependency_marker(&self) -> bool {
        self.dependency_marker
    }

    /// Public and settable.
    pub fn is_injectable(&self) -> bool {
        self.visibility == Visibility::Public && self.settable
    }

    pub fn key(&self) -> Key {
        Key::new(self.service.clone(), self.dependency_name.as_deref())
    }

    pub(crate) fn set(&self, owner: &mut AnyBox, value: AnyArc) -> DiResult<()> {
        (self.setter)(owner, value)
    }
}

impl fmt::Debug for PropertyDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyDescriptor")
            .field("name", &self.name)
            .field("service", &self.service)
            .field("settable", &self.settable)
            .field("dependency_marker", &self.dependency_marker)
            .finish()
    }
}

/// An initialisation method called after construction.
#[derive(Clone)]
pub struct MethodDescriptor {
    name: String,
    parameters: Vec<ParameterDescriptor>,
    visibility: Visibility,
    is_static: bool,
    injection_marker: bool,
    invoker: Invoker,
}

impl MethodDescriptor {
    pub fn new<O, F>(name: impl Into<String>, parameters: Vec<ParameterDescriptor>, invoker: F) -> Self
    where
        O: Any + Send + Sync,
        F: Fn(&mut O, &Arguments) -> DiResult<()> + Send + Sync + 'static,
    {
        let invoker: Invoker = Arc::new(move |owner: &mut AnyBox, args: &Arguments| {
            let owner = (**owner)
                .downcast_mut::<O>()
                .ok_or_else(|| DiError::TypeMismatch(std::any::type_name::<O>().to_string()))?;
            invoker(owner, args)
        });
        Self {
            name: name.into(),
            parameters,
            visibility: Visibility::Public,
            is_static: false,
            injection_marker: false,
            invoker,
        }
    }

    pub fn marked(mut self) -> Self {
        self.injection_marker = true;
        self
    }

    pub fn private(mut self) -> Self {
        self.visibility = Visibility::Private;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parameters(&self) -> &[ParameterDescriptor] {
        &self.parameters
    }

    pub fn has_injection_marker(&self) -> bool {
        self.injection_marker
    }

    pub fn is_eligible(&self) -> bool {
        self.visibility == Visibility::Public && !self.is_static
    }

    pub(crate) fn invoke(&self, owner: &mut AnyBox, args: &Arguments) -> DiResult<()> {
        (self.invoker)(owner, args)
    }
}

impl fmt::Debug for MethodDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodDescriptor")
            .field("name", &self.name)
            .field("parameters", &self.parameters)
            .field("injection_marker", &self.injection_marker)
            .finish()
    }
}
