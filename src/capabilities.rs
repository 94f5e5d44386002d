//! Capability introspection.
//!
//! The engine never discovers constructors itself. It asks an [`Introspect`]
//! provider for the constructors, properties and methods of a type, in a
//! stable order, and reads the injection markers off the returned
//! descriptors. [`TypeCatalog`] is a table-driven provider: shapes are
//! described up front (by hand or by generated code), and generic definitions
//! get a factory that describes any closed form on demand.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::descriptors::{ConstructorDescriptor, MethodDescriptor, PropertyDescriptor};
use crate::types::ServiceType;

/// Contract the engine requires from type discovery.
pub trait Introspect: Send + Sync {
    /// Every constructor of `service`, eligible or not, in introspection order.
    fn constructors(&self, service: &ServiceType) -> Vec<ConstructorDescriptor>;

    /// Every property of `service`.
    fn properties(&self, service: &ServiceType) -> Vec<PropertyDescriptor>;

    /// Every method of `service` that may take part in initialisation.
    fn methods(&self, service: &ServiceType) -> Vec<MethodDescriptor>;
}

/// Constructors and members of one type.
#[derive(Clone, Default, Debug)]
pub struct TypeShape {
    constructors: Vec<ConstructorDescriptor>,
    properties: Vec<PropertyDescriptor>,
    methods: Vec<MethodDescriptor>,
}

impl TypeShape {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn constructor(mut self, constructor: ConstructorDescriptor) -> Self {
        self.constructors.push(constructor);
        self
    }

    pub fn property(mut self, property: PropertyDescriptor) -> Self {
        self.properties.push(property);
        self
    }

    pub fn method(mut self, method: MethodDescriptor) -> Self {
        self.methods.push(method);
        self
    }
}

type ShapeFactory = Arc<dyn Fn(&[ServiceType]) -> TypeShape + Send + Sync>;

/// Table-driven [`Introspect`] implementation.
///
/// # Examples
///
/// ```rust
/// use ferrous_container::{ConstructorDescriptor, Introspect, ServiceType, TypeCatalog, TypeShape};
///
/// struct Clock;
///
/// let catalog = TypeCatalog::new();
/// catalog.describe(
///     ServiceType::of::<Clock>(),
///     TypeShape::new().constructor(ConstructorDescriptor::new(vec![], |_| Ok(Clock))),
/// );
///
/// assert_eq!(catalog.constructors(&ServiceType::of::<Clock>()).len(), 1);
/// assert!(catalog.constructors(&ServiceType::class("Unknown")).is_empty());
/// ```
#[derive(Default)]
pub struct TypeCatalog {
    shapes: RwLock<HashMap<ServiceType, Arc<TypeShape>>>,
    generics: RwLock<HashMap<ServiceType, ShapeFactory>>,
}

impl TypeCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Describes a non-generic or closed generic type. Replaces any earlier shape.
    pub fn describe(&self, service: ServiceType, shape: TypeShape) -> &Self {
        self.shapes.write().insert(service, Arc::new(shape));
        self
    }

    /// Describes every closed form of a generic definition.
    pub fn describe_generic<F>(&self, definition: ServiceType, factory: F) -> &Self
    where
        F: Fn(&[ServiceType]) -> TypeShape + Send + Sync + 'static,
    {
        self.generics.write().insert(definition, Arc::new(factory));
        self
    }

    pub fn is_described(&self, service: &ServiceType) -> bool {
        self.shapes.read().contains_key(service)
            || service
                .definition()
                .map_or(false, |def| self.generics.read().contains_key(def))
    }

    fn shape(&self, service: &ServiceType) -> Option<Arc<TypeShape>> {
        if let Some(shape) = self.shapes.read().get(service) {
            return Some(shape.clone());
        }
        let definition = service.definition()?;
        let factory = self.generics.read().get(definition).cloned()?;
        let shape = Arc::new(factory(service.generic_arguments()));
        self.shapes.write().insert(service.clone(), shape.clone());
        Some(shape)
    }
}

impl Introspect for TypeCatalog {
    fn constructors(&self, service: &ServiceType) -> Vec<ConstructorDescriptor> {
        self.shape(service)
            .map(|s| s.constructors.clone())
            .unwrap_or_default()
    }

    fn properties(&self, service: &ServiceType) -> Vec<PropertyDescriptor> {
        self.shape(service)
            .map(|s| s.properties.clone())
            .unwrap_or_default()
    }

    fn methods(&self, service: &ServiceType) -> Vec<MethodDescriptor> {
        self.shape(service)
            .map(|s| s.methods.clone())
            .unwrap_or_default()
    }
}

impl fmt::Debug for TypeCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeCatalog")
            .field("shapes", &self.shapes.read().len())
            .field("generic_definitions", &self.generics.read().len())
            .finish()
    }
}
