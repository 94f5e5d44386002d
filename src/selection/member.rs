//! Property and method selection stages.

use smallvec::SmallVec;

use crate::error::{DiError, DiResult};
use crate::pipeline::SelectionRequest;
use crate::registration::{InjectionMember, InjectionParameter};

use super::{ParameterResolver, SelectedMembers};

/// Members pinned by the registration plus members carrying a marker.
///
/// A pinned member that does not exist, is not settable, or whose argument
/// count does not match is a registration error.
pub fn select_marked(request: &SelectionRequest<'_>) -> DiResult<Option<SelectedMembers>> {
    let build_type = request.build_type();
    let registration = request.registration();
    let introspect = request.introspect();
    let mut selected = SelectedMembers::default();

    let pinned_properties: Vec<(&str, &InjectionParameter)> = registration
        .members()
        .iter()
        .filter_map(|m| match m {
            InjectionMember::Property(name, value) => Some((name.as_str(), value)),
            _ => None,
        })
        .collect();
    let pinned_methods: Vec<(&str, &[InjectionParameter])> = registration
        .members()
        .iter()
        .filter_map(|m| match m {
            InjectionMember::Method(name, args) => Some((name.as_str(), args.as_slice())),
            _ => None,
        })
        .collect();

    let properties = introspect.properties(build_type);
    for (name, _) in &pinned_properties {
        match properties.iter().find(|p| p.name() == *name) {
            Some(property) if !property.is_injectable() => {
                return Err(DiError::invalid(
                    registration.key(),
                    format!("property `{}` of {} is not settable", name, build_type),
                ))
            }
            Some(_) => {}
            None => {
                return Err(DiError::invalid(
                    registration.key(),
                    format!("{} has no property `{}`", build_type, name),
                ))
            }
        }
    }
    for property in properties {
        let pinned = pinned_properties
            .iter()
            .find(|(name, _)| *name == property.name())
            .map(|(_, value)| *value);
        if pinned.is_some() || (property.has_dependency_marker() && property.is_injectable()) {
            let resolver = ParameterResolver::from_property(&property, pinned);
            selected.push_property(property, resolver);
        }
    }

    let methods = introspect.methods(build_type);
    for (name, args) in &pinned_methods {
        let found = methods
            .iter()
            .any(|m| m.name() == *name && m.is_eligible() && m.parameters().len() == args.len());
        if !found {
            return Err(DiError::invalid(
                registration.key(),
                format!("{} has no method `{}` taking {} arguments", build_type, name, args.len()),
            ));
        }
    }
    for method in methods {
        if !method.is_eligible() {
            continue;
        }
        let pinned = pinned_methods
            .iter()
            .find(|(name, args)| *name == method.name() && args.len() == method.parameters().len())
            .map(|(_, args)| *args);
        let resolvers: SmallVec<[ParameterResolver; 4]> = match pinned {
            Some(args) => method
                .parameters()
                .iter()
                .zip(args)
                .map(|(p, injection)| ParameterResolver::pinned(p, injection))
                .collect(),
            None if method.has_injection_marker() => method
                .parameters()
                .iter()
                .map(ParameterResolver::from_parameter)
                .collect(),
            None => continue,
        };
        selected.push_method(method, resolvers);
    }

    Ok(if selected.is_empty() { None } else { Some(selected) })
}

/// Unmarked, settable properties whose type has an explicit registration.
pub fn select_registered(request: &SelectionRequest<'_>) -> DiResult<Option<SelectedMembers>> {
    let mut selected = SelectedMembers::default();
    for property in request.introspect().properties(request.build_type()) {
        if property.is_injectable() && request.container().is_registered_key(&property.key()) {
            let resolver = ParameterResolver::from_property(&property, None);
            selected.push_property(property, resolver);
        }
    }
    Ok(if selected.is_empty() { None } else { Some(selected) })
}
