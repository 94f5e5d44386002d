//! Constructor selection stages.
//!
//! The default constructor chain asks these stages in order and takes the
//! first answer: the constructor pinned by the registration, the constructor
//! carrying the injection marker, the heuristic.

use std::collections::HashSet;

use crate::descriptors::ConstructorDescriptor;
use crate::error::{DiError, DiResult};
use crate::pipeline::SelectionRequest;
use crate::registration::InjectionParameter;
use crate::types::ServiceType;

use super::{is_resolvable, SelectedConstructor};

/// Uses the constructor matching an `InjectionMember::Constructor` of the registration.
pub fn select_pinned(request: &SelectionRequest<'_>) -> DiResult<Option<SelectedConstructor>> {
    let Some(pinned) = request.registration().constructor_override() else {
        return Ok(None);
    };
    let build_type = request.build_type();
    request
        .introspect()
        .constructors(build_type)
        .into_iter()
        .filter(ConstructorDescriptor::is_eligible)
        .find(|ctor| matches_pinned(ctor, pinned))
        .map(|ctor| Some(SelectedConstructor::pinned(build_type.clone(), ctor, pinned)))
        .ok_or_else(|| {
            DiError::invalid(
                request.registration().key(),
                format!(
                    "no constructor of {} takes the {} pinned parameters",
                    build_type,
                    pinned.len()
                ),
            )
        })
}

fn matches_pinned(ctor: &ConstructorDescriptor, pinned: &[InjectionParameter]) -> bool {
    ctor.parameters().len() == pinned.len()
        && ctor
            .parameters()
            .iter()
            .zip(pinned)
            .all(|(param, injection)| match injection {
                InjectionParameter::Resolve(key) => key.service() == param.service(),
                InjectionParameter::Value(_) => true,
            })
}

/// First eligible constructor carrying the injection marker.
pub fn select_marked(request: &SelectionRequest<'_>) -> DiResult<Option<SelectedConstructor>> {
    let build_type = request.build_type();
    Ok(request
        .introspect()
        .constructors(build_type)
        .into_iter()
        .filter(ConstructorDescriptor::is_eligible)
        .find(ConstructorDescriptor::has_injection_marker)
        .map(|ctor| SelectedConstructor::new(build_type.clone(), ctor)))
}

/// The single eligible constructor, or the "longest resolvable" heuristic.
///
/// Candidates are ordered by parameter count, then by interface parameter
/// count, both descending. The first candidate whose parameters are all
/// resolvable (or defaulted) wins outright when the next resolvable candidate
/// takes a strict subset of its parameter types, or when it takes only
/// interfaces and the next one does not. Any other tie is ambiguous.
pub fn select_by_heuristic(request: &SelectionRequest<'_>) -> DiResult<Option<SelectedConstructor>> {
    let build_type = request.build_type();
    let mut eligible: Vec<ConstructorDescriptor> = request
        .introspect()
        .constructors(build_type)
        .into_iter()
        .filter(ConstructorDescriptor::is_eligible)
        .collect();

    match eligible.len() {
        0 => return Ok(None),
        1 => return Ok(eligible.pop().map(|ctor| SelectedConstructor::new(build_type.clone(), ctor))),
        _ => {}
    }

    // stable: equal candidates keep introspection order
    eligible.sort_by(|a, b| {
        b.parameters()
            .len()
            .cmp(&a.parameters().len())
            .then_with(|| b.interface_parameter_count().cmp(&a.interface_parameter_count()))
    });

    let mut resolvable = eligible
        .into_iter()
        .filter(|ctor| all_parameters_resolvable(request, ctor));
    let Some(best) = resolvable.next() else {
        return Err(DiError::NoAccessibleConstructor(build_type.to_string()));
    };

    if let Some(next) = resolvable.next() {
        let dominates = is_strict_subset(&next, &best)
            || (only_interfaces(&best) && !only_interfaces(&next));
        if !dominates {
            return Err(DiError::AmbiguousConstructor(build_type.to_string()));
        }
    }

    Ok(Some(SelectedConstructor::new(build_type.clone(), best)))
}

fn all_parameters_resolvable(request: &SelectionRequest<'_>, ctor: &ConstructorDescriptor) -> bool {
    ctor.parameters()
        .iter()
        .all(|p| p.default_value().is_some() || is_resolvable(request.container(), &p.key()))
}

fn parameter_types(ctor: &ConstructorDescriptor) -> HashSet<&ServiceType> {
    ctor.parameters().iter().map(|p| p.service()).collect()
}

fn is_strict_subset(smaller: &ConstructorDescriptor, larger: &ConstructorDescriptor) -> bool {
    let small = parameter_types(smaller);
    let large = parameter_types(larger);
    small.len() < large.len() && small.is_subset(&large)
}

fn only_interfaces(ctor: &ConstructorDescriptor) -> bool {
    ctor.parameters().iter().all(|p| p.service().is_interface())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptors::ParameterDescriptor;

    fn ctor(params: &[ServiceType]) -> ConstructorDescriptor {
        let params = params
            .iter()
            .enumerate()
            .map(|(i, t)| ParameterDescriptor::new(format!("p{}", i), t.clone()))
            .collect();
        ConstructorDescriptor::new(params, |_| Ok(()))
    }

    #[test]
    fn subset_ignores_parameter_order() {
        let a = ServiceType::interface("IA");
        let b = ServiceType::interface("IB");
        let long = ctor(&[a.clone(), b.clone()]);
        let short = ctor(&[b.clone()]);
        let swapped = ctor(&[b, a]);

        assert!(is_strict_subset(&short, &long));
        assert!(!is_strict_subset(&swapped, &long));
        assert!(!is_strict_subset(&long, &short));
    }

    #[test]
    fn parameterless_constructor_counts_as_interfaces_only() {
        assert!(only_interfaces(&ctor(&[])));
        assert!(!only_interfaces(&ctor(&[ServiceType::class("Concrete")])));
    }
}
