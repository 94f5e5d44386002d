//! Constructor and member selection.
//!
//! Selection runs while a registration is compiled. Its output is a list of
//! [`ParameterResolver`]s per constructor or member, so the build plan never
//! has to look at introspection data again.

use smallvec::SmallVec;

use crate::descriptors::{Arguments, ConstructorDescriptor, MethodDescriptor, ParameterDescriptor, PropertyDescriptor};
use crate::error::{DiError, DiResult};
use crate::key::Key;
use crate::provider::{BuildContext, Container};
use crate::registration::{AnyArc, AnyBox, InjectionParameter};
use crate::types::{ServiceType, TypeKind};

pub mod constructor;
pub mod member;

/// Whether the container can be expected to produce `key` without trying.
///
/// Concrete classes count as resolvable; they are built implicitly. Closed
/// generics count when their definition is the built-in enumerable or has a
/// registration. Interfaces, abstract classes, primitives, strings, enums,
/// delegates and arrays need a registration of their own.
///
/// The answer is optimistic: a concrete class may still fail to build once
/// its own dependencies are looked at.
pub fn is_resolvable(container: &Container, key: &Key) -> bool {
    let service = key.service();
    if service.is_constructible() {
        return true;
    }
    match service.kind() {
        TypeKind::Generic { definition, .. } => {
            *definition == ServiceType::enumerable_definition()
                || container.is_registered_key(&key.with_service(definition.clone()))
                || container.is_registered_key(key)
        }
        _ => container.is_registered_key(key),
    }
}

/// Where a parameter or member value comes from.
#[derive(Clone)]
pub enum ArgumentSource {
    /// Resolve `key` from the container, falling back to `default`
    Container { key: Key, default: Option<AnyArc> },
    /// Fixed value pinned at registration time
    Value(AnyArc),
}

/// Produces the value of one parameter or property at build time.
///
/// Lookup order: a resolve-time override matching the parameter name or
/// type, the pinned value, the container (when the dependency is resolvable),
/// the parameter default.
#[derive(Clone)]
pub struct ParameterResolver {
    parameter: String,
    service: ServiceType,
    source: ArgumentSource,
}

impl ParameterResolver {
    pub(crate) fn from_parameter(parameter: &ParameterDescriptor) -> Self {
        Self {
            parameter: parameter.name().to_string(),
            service: parameter.service().clone(),
            source: ArgumentSource::Container {
                key: parameter.key(),
                default: parameter.default_value().cloned(),
            },
        }
    }

    pub(crate) fn pinned(parameter: &ParameterDescriptor, injection: &InjectionParameter) -> Self {
        let source = match injection {
            InjectionParameter::Value(value) => ArgumentSource::Value(value.clone()),
            InjectionParameter::Resolve(key) => ArgumentSource::Container {
                key: key.clone(),
                default: parameter.default_value().cloned(),
            },
        };
        Self {
            parameter: parameter.name().to_string(),
            service: parameter.service().clone(),
            source,
        }
    }

    pub(crate) fn from_property(property: &PropertyDescriptor, injection: Option<&InjectionParameter>) -> Self {
        let source = match injection {
            Some(InjectionParameter::Value(value)) => ArgumentSource::Value(value.clone()),
            Some(InjectionParameter::Resolve(key)) => ArgumentSource::Container {
                key: key.clone(),
                default: None,
            },
            None => ArgumentSource::Container {
                key: property.key(),
                default: None,
            },
        };
        Self {
            parameter: property.name().to_string(),
            service: property.service().clone(),
            source,
        }
    }

    pub fn parameter(&self) -> &str {
        &self.parameter
    }

    pub fn service(&self) -> &ServiceType {
        &self.service
    }

    pub fn source(&self) -> &ArgumentSource {
        &self.source
    }

    pub(crate) fn resolve(&self, ctx: &BuildContext<'_>, target: &ServiceType) -> DiResult<AnyArc> {
        if let Some(value) = ctx.override_for(&self.parameter, &self.service) {
            return Ok(value.clone());
        }
        match &self.source {
            ArgumentSource::Value(value) => Ok(value.clone()),
            ArgumentSource::Container { key, default } => {
                if is_resolvable(ctx.container(), key) {
                    return ctx.resolve_key(key);
                }
                default.clone().ok_or_else(|| DiError::UnresolvedDependency {
                    target: target.to_string(),
                    parameter: self.parameter.clone(),
                    dependency: key.to_string(),
                })
            }
        }
    }
}

fn resolve_all(
    resolvers: &[ParameterResolver],
    ctx: &BuildContext<'_>,
    target: &ServiceType,
) -> DiResult<Arguments> {
    let values = resolvers
        .iter()
        .map(|r| r.resolve(ctx, target))
        .collect::<DiResult<SmallVec<[AnyArc; 4]>>>()?;
    Ok(Arguments::new(values))
}

/// A constructor chosen for a build type, with one resolver per parameter.
#[derive(Clone)]
pub struct SelectedConstructor {
    target: ServiceType,
    constructor: ConstructorDescriptor,
    resolvers: SmallVec<[ParameterResolver; 4]>,
}

impl SelectedConstructor {
    /// Every parameter resolved from the container.
    pub fn new(target: ServiceType, constructor: ConstructorDescriptor) -> Self {
        let resolvers = constructor
            .parameters()
            .iter()
            .map(ParameterResolver::from_parameter)
            .collect();
        Self {
            target,
            constructor,
            resolvers,
        }
    }

    /// Parameters supplied by the registration, matched by position.
    pub(crate) fn pinned(target: ServiceType, constructor: ConstructorDescriptor, pinned: &[InjectionParameter]) -> Self {
        let resolvers = constructor
            .parameters()
            .iter()
            .zip(pinned)
            .map(|(p, injection)| ParameterResolver::pinned(p, injection))
            .collect();
        Self {
            target,
            constructor,
            resolvers,
        }
    }

    pub fn target(&self) -> &ServiceType {
        &self.target
    }

    pub fn constructor(&self) -> &ConstructorDescriptor {
        &self.constructor
    }

    pub fn resolvers(&self) -> &[ParameterResolver] {
        &self.resolvers
    }

    pub(crate) fn resolve_arguments(&self, ctx: &BuildContext<'_>) -> DiResult<Arguments> {
        resolve_all(&self.resolvers, ctx, &self.target)
    }
}

impl std::fmt::Debug for SelectedConstructor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SelectedConstructor")
            .field("target", &self.target)
            .field("parameters", &self.resolvers.iter().map(|r| r.parameter()).collect::<Vec<_>>())
            .finish()
    }
}

/// Properties and methods injected after construction, in injection order.
#[derive(Clone, Default)]
pub struct SelectedMembers {
    properties: Vec<(PropertyDescriptor, ParameterResolver)>,
    methods: Vec<(MethodDescriptor, SmallVec<[ParameterResolver; 4]>)>,
}

impl SelectedMembers {
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty() && self.methods.is_empty()
    }

    pub fn property_names(&self) -> Vec<&str> {
        self.properties.iter().map(|(p, _)| p.name()).collect()
    }

    pub fn method_names(&self) -> Vec<&str> {
        self.methods.iter().map(|(m, _)| m.name()).collect()
    }

    pub(crate) fn push_property(&mut self, property: PropertyDescriptor, resolver: ParameterResolver) {
        self.properties.push((property, resolver));
    }

    pub(crate) fn push_method(&mut self, method: MethodDescriptor, resolvers: SmallVec<[ParameterResolver; 4]>) {
        self.methods.push((method, resolvers));
    }

    /// Sets properties first, then calls methods.
    pub(crate) fn inject(&self, ctx: &BuildContext<'_>, target: &ServiceType, instance: &mut AnyBox) -> DiResult<()> {
        for (property, resolver) in &self.properties {
            let value = resolver.resolve(ctx, target)?;
            property.set(instance, value)?;
        }
        for (method, resolvers) in &self.methods {
            let args = resolve_all(resolvers, ctx, target)?;
            method.invoke(instance, &args)?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for SelectedMembers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SelectedMembers")
            .field("properties", &self.property_names())
            .field("methods", &self.method_names())
            .finish()
    }
}
