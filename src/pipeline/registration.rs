//! Registration aspects and the default chains of a container node.
//!
//! Every registration is compiled by running it through one of four
//! registration chains. The aspects here are the building blocks of those
//! chains: lifetime handling, type mapping, object creation and fixed
//! instances. Each aspect receives the rest of the pipeline and decides
//! whether and how to wrap the build plan it produces.

use std::sync::Arc;

use crate::capabilities::Introspect;
use crate::error::{DiError, DiResult};
use crate::key::Key;
use crate::provider::{BuildContext, Container};
use crate::registration::{AnyArc, BuildPlan, ConstructionStrategy, Registration, RegistrationKind};
use crate::selection::{constructor, member, SelectedConstructor, SelectedMembers};
use crate::types::ServiceType;

use super::{BuildStage, SelectionStage, StagedFactoryChain};

/// Input of a registration pipeline.
pub struct PlanRequest<'a> {
    container: &'a Container,
    registration: &'a Registration,
    build_type: ServiceType,
}

impl<'a> PlanRequest<'a> {
    pub(crate) fn new(container: &'a Container, registration: &'a Registration, build_type: ServiceType) -> Self {
        Self {
            container,
            registration,
            build_type,
        }
    }

    /// The node compiling the registration.
    pub fn container(&self) -> &'a Container {
        self.container
    }

    pub fn registration(&self) -> &'a Registration {
        self.registration
    }

    /// The requested key.
    pub fn key(&self) -> &'a Key {
        self.registration.key()
    }

    /// The type actually being built; differs from the key's type after mapping.
    pub fn build_type(&self) -> &ServiceType {
        &self.build_type
    }

    pub fn retarget(&self, build_type: ServiceType) -> PlanRequest<'a> {
        PlanRequest {
            container: self.container,
            registration: self.registration,
            build_type,
        }
    }
}

/// Input of a selection pipeline.
pub struct SelectionRequest<'a> {
    container: &'a Container,
    registration: &'a Registration,
    build_type: &'a ServiceType,
}

impl<'a> SelectionRequest<'a> {
    pub(crate) fn new(container: &'a Container, registration: &'a Registration, build_type: &'a ServiceType) -> Self {
        Self {
            container,
            registration,
            build_type,
        }
    }

    pub fn container(&self) -> &'a Container {
        self.container
    }

    pub fn registration(&self) -> &'a Registration {
        self.registration
    }

    pub fn build_type(&self) -> &'a ServiceType {
        self.build_type
    }

    pub fn introspect(&self) -> &'a dyn Introspect {
        self.container.introspect().as_ref()
    }
}

/// Compiles a registration into a build plan.
pub type RegistrationPipeline =
    Arc<dyn for<'a> Fn(&PlanRequest<'a>) -> DiResult<BuildPlan> + Send + Sync>;

/// Selection pipeline; `Ok(None)` means "no opinion, ask the next stage".
pub type SelectionPipeline<T> =
    Arc<dyn for<'a> Fn(&SelectionRequest<'a>) -> DiResult<Option<T>> + Send + Sync>;

pub type ConstructorPipeline = SelectionPipeline<SelectedConstructor>;
pub type MemberPipeline = SelectionPipeline<SelectedMembers>;

pub(crate) fn build_plan<F>(f: F) -> BuildPlan
where
    F: for<'a> Fn(&BuildContext<'a>) -> DiResult<AnyArc> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Wraps a closure as a registration pipeline.
pub fn registration_pipeline<F>(f: F) -> RegistrationPipeline
where
    F: for<'a> Fn(&PlanRequest<'a>) -> DiResult<BuildPlan> + Send + Sync + 'static,
{
    Arc::new(f)
}

fn selection_pipeline<T, F>(f: F) -> SelectionPipeline<T>
where
    F: for<'a> Fn(&SelectionRequest<'a>) -> DiResult<Option<T>> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Aspect factory for a selection stage: the stage's answer wins when it has
/// one, otherwise the request falls through to the next stage.
pub fn first_non_empty<T, F>(stage: F) -> impl Fn(SelectionPipeline<T>) -> SelectionPipeline<T> + Send + Sync + 'static
where
    T: 'static,
    F: for<'a> Fn(&SelectionRequest<'a>) -> DiResult<Option<T>> + Send + Sync + Clone + 'static,
{
    move |next: SelectionPipeline<T>| -> SelectionPipeline<T> {
        let stage = stage.clone();
        selection_pipeline(move |request| match stage(request)? {
            Some(found) => Ok(Some(found)),
            None => next(request),
        })
    }
}

fn terminal() -> RegistrationPipeline {
    registration_pipeline(|request| {
        Err(DiError::invalid(
            request.key(),
            "no aspect in the chain produced a build plan",
        ))
    })
}

/// Caches instances through the registration's lifetime manager.
pub fn lifetime_aspect(next: RegistrationPipeline) -> RegistrationPipeline {
    registration_pipeline(move |request| {
        let plan = next(request)?;
        let manager = request.registration().lifetime().clone();
        Ok(build_plan(move |ctx| {
            let scope = ctx.scope();
            if let Some(existing) = manager.get_value(scope) {
                return Ok(existing);
            }
            let value = plan(ctx)?;
            Ok(manager.set_value(scope, value))
        }))
    })
}

/// Builds the mapped-to type instead of the requested one. At build time the
/// mapped key is resolved through the container when it has a registration of
/// its own, otherwise the target type is built directly.
pub fn mapping_aspect(next: RegistrationPipeline) -> RegistrationPipeline {
    registration_pipeline(move |request| {
        let target = match request.registration().strategy() {
            ConstructionStrategy::MapTo(target) => close_target(target, request.build_type())?,
            _ => return next(request),
        };
        if target == *request.build_type() {
            return next(request);
        }

        let redirect = Key::new(target.clone(), request.key().name());
        let container = request.container();
        let fallback = if target.is_constructible() {
            match next(&request.retarget(target.clone())) {
                Ok(plan) => Some(Ok(plan)),
                // only tolerated while a registration can take over
                Err(err) if container.is_registered_key(&redirect) => Some(Err(err)),
                Err(err) => return Err(err),
            }
        } else {
            None
        };

        Ok(build_plan(move |ctx| {
            if ctx.container().is_registered_key(&redirect) {
                return ctx.resolve_key(&redirect);
            }
            match &fallback {
                Some(Ok(plan)) => plan(ctx),
                Some(Err(err)) => Err(err.clone()),
                None => Err(DiError::NotFound(redirect.to_string())),
            }
        }))
    })
}

fn close_target(target: &ServiceType, build_type: &ServiceType) -> DiResult<ServiceType> {
    if target.is_generic_definition() {
        target.close(build_type.generic_arguments())
    } else {
        Ok(target.clone())
    }
}

/// Creates the object: calls the factory delegate, or selects a constructor
/// and injectable members and builds through them.
pub fn creation_aspect(next: RegistrationPipeline) -> RegistrationPipeline {
    registration_pipeline(move |request| match request.registration().strategy() {
        ConstructionStrategy::Factory(factory) => Ok(factory.clone()),
        ConstructionStrategy::Instance(_) => next(request),
        ConstructionStrategy::Construct | ConstructionStrategy::MapTo(_) => {
            let selection = SelectionRequest::new(
                request.container(),
                request.registration(),
                request.build_type(),
            );
            let constructor = request.container().select_constructor(&selection)?;
            let members = request.container().select_members(&selection)?;
            Ok(build_plan(move |ctx| {
                let args = constructor.resolve_arguments(ctx)?;
                let mut instance = constructor.constructor().activate(&args)?;
                members.inject(ctx, constructor.target(), &mut instance)?;
                let instance: AnyArc = instance.into();
                Ok(instance)
            }))
        }
    })
}

/// Hands out a fixed instance; the instance is seeded into the lifetime
/// manager for the registering node.
pub fn instance_aspect(next: RegistrationPipeline) -> RegistrationPipeline {
    registration_pipeline(move |request| {
        let instance = match request.registration().strategy() {
            ConstructionStrategy::Instance(instance) => instance.clone(),
            _ => return next(request),
        };
        let manager = request.registration().lifetime().clone();
        let stored = manager.set_value(request.container().id(), instance);
        Ok(build_plan(move |ctx| {
            Ok(manager
                .get_value(ctx.scope())
                .unwrap_or_else(|| stored.clone()))
        }))
    })
}

pub type RegistrationChain = StagedFactoryChain<RegistrationPipeline, BuildStage>;

/// Default chain for a registration kind.
pub fn default_registration_chain(kind: RegistrationKind) -> RegistrationChain {
    let mut chain = StagedFactoryChain::new(terminal());
    match kind {
        RegistrationKind::Generic | RegistrationKind::Explicit => {
            chain
                .add(BuildStage::Lifetime, lifetime_aspect)
                .add(BuildStage::TypeMapping, mapping_aspect)
                .add(BuildStage::Creation, creation_aspect);
        }
        RegistrationKind::Implicit => {
            chain
                .add(BuildStage::Lifetime, lifetime_aspect)
                .add(BuildStage::Creation, creation_aspect);
        }
        RegistrationKind::Instance => {
            chain.add(BuildStage::Lifetime, instance_aspect);
        }
    }
    chain
}

pub type ConstructorChain = StagedFactoryChain<ConstructorPipeline, SelectionStage>;
pub type MemberChain = StagedFactoryChain<MemberPipeline, SelectionStage>;

/// Pinned constructor, then marked constructor, then the heuristic.
pub fn default_constructor_chain() -> ConstructorChain {
    let mut chain: ConstructorChain = StagedFactoryChain::new(selection_pipeline(|_| Ok(None)));
    chain
        .add(SelectionStage::Explicit, first_non_empty(constructor::select_pinned))
        .add(SelectionStage::Attribute, first_non_empty(constructor::select_marked))
        .add(SelectionStage::Reflection, first_non_empty(constructor::select_by_heuristic));
    chain
}

/// Marked and pinned members, then members whose type is registered.
pub fn default_member_chain() -> MemberChain {
    let mut chain: MemberChain = StagedFactoryChain::new(selection_pipeline(|_| Ok(None)));
    chain
        .add(SelectionStage::Attribute, first_non_empty(member::select_marked))
        .add(SelectionStage::Reflection, first_non_empty(member::select_registered));
    chain
}

/// The six chains owned by a container node.
///
/// A child node starts with a snapshot of its parent's chains; changes made
/// through [`Container::configure_pipelines`] stay local to the node.
#[derive(Clone, Debug)]
pub struct Pipelines {
    pub generic: RegistrationChain,
    pub explicit: RegistrationChain,
    pub implicit: RegistrationChain,
    pub instance: RegistrationChain,
    pub constructors: ConstructorChain,
    pub members: MemberChain,
}

impl Pipelines {
    pub fn new() -> Self {
        Self {
            generic: default_registration_chain(RegistrationKind::Generic),
            explicit: default_registration_chain(RegistrationKind::Explicit),
            implicit: default_registration_chain(RegistrationKind::Implicit),
            instance: default_registration_chain(RegistrationKind::Instance),
            constructors: default_constructor_chain(),
            members: default_member_chain(),
        }
    }

    pub fn for_kind(&self, kind: RegistrationKind) -> &RegistrationChain {
        match kind {
            RegistrationKind::Generic => &self.generic,
            RegistrationKind::Explicit => &self.explicit,
            RegistrationKind::Implicit => &self.implicit,
            RegistrationKind::Instance => &self.instance,
        }
    }

    pub(crate) fn invalidate_all(&mut self) {
        self.generic.invalidate();
        self.explicit.invalidate();
        self.implicit.invalidate();
        self.instance.invalidate();
        self.constructors.invalidate();
        self.members.invalidate();
    }
}

impl Default for Pipelines {
    fn default() -> Self {
        Self::new()
    }
}
