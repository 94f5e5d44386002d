//! Container nodes and resolution.
//!
//! This module contains the [`Container`] handle, the node state behind it
//! and the [`BuildContext`] handed to build plans.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use tracing::{debug, trace, warn};

use crate::capabilities::Introspect;
use crate::config::ContainerOptions;
use crate::error::{DiError, DiResult};
use crate::internal::{aggregate, dispose_reverse, same_manager, StackGuard, Tracked};
use crate::key::Key;
use crate::lifetime::{Lifetime, LifetimeManager};
use crate::pipeline::registration::build_plan;
use crate::pipeline::{Pipelines, PlanRequest, SelectionRequest};
use crate::registration::{
    AnyArc, ConstructionStrategy, PolicySet, Registration, RegistrationKind, ResolverOverride,
};
use crate::selection::{SelectedConstructor, SelectedMembers};
use crate::traits::{Dispose, ResolverCore};
use crate::types::ServiceType;

pub mod context;
pub mod scope;

pub use context::BuildContext;
pub use scope::{NodeMode, ScopeId};
use scope::NodeInner;

/// A node in the container hierarchy.
///
/// `Container` is a cheap handle; clones refer to the same node. A root node
/// owns its registrations. A child node created with
/// [`create_child_container`](Self::create_child_container) sees every
/// registration of its ancestors until it is registered into, at which point
/// it gets a store of its own that shadows the parent for the keys it holds.
///
/// # Thread Safety
///
/// Registration, resolution and child creation may run concurrently from any
/// number of threads. Disposal is idempotent.
///
/// # Examples
///
/// ```
/// use ferrous_container::{
///     ConstructorDescriptor, Container, Lifetime, ParameterDescriptor, Resolver, ServiceType,
///     TypeCatalog, TypeShape,
/// };
/// use std::sync::Arc;
///
/// struct Settings { dsn: String }
/// struct Repository { settings: Arc<Settings> }
///
/// let catalog = TypeCatalog::new();
/// catalog.describe(
///     ServiceType::of::<Repository>(),
///     TypeShape::new().constructor(ConstructorDescriptor::new(
///         vec![ParameterDescriptor::new("settings", ServiceType::of::<Settings>())],
///         |args| Ok(Repository { settings: args.get::<Settings>(0)? }),
///     )),
/// );
///
/// let root = Container::new(Arc::new(catalog));
/// root.register_value(None, Settings { dsn: "sqlite::memory:".into() }).unwrap();
///
/// let child = root.create_child_container();
/// child.register_value(None, Settings { dsn: "postgres://test".into() }).unwrap();
///
/// // Repository is not registered anywhere; it is built implicitly
/// assert_eq!(root.get_required::<Repository>().settings.dsn, "sqlite::memory:");
/// assert_eq!(child.get_required::<Repository>().settings.dsn, "postgres://test");
/// ```
#[derive(Clone)]
pub struct Container {
    inner: Arc<NodeInner>,
}

impl Container {
    /// Root container using default options.
    pub fn new(introspect: Arc<dyn Introspect>) -> Self {
        Self::with_options(introspect, ContainerOptions::default())
    }

    pub fn with_options(introspect: Arc<dyn Introspect>, options: ContainerOptions) -> Self {
        let container = Self {
            inner: Arc::new(NodeInner::root(introspect, options)),
        };
        debug!(scope = %container.id(), "created root container");
        container
    }

    pub fn id(&self) -> ScopeId {
        self.inner.id
    }

    pub fn mode(&self) -> NodeMode {
        self.inner.mode()
    }

    /// Parent node, `None` for a root or once this node is disposed.
    pub fn parent(&self) -> Option<Container> {
        self.inner.parent().map(|inner| Container { inner })
    }

    pub fn options(&self) -> &ContainerOptions {
        &self.inner.options
    }

    pub fn introspect(&self) -> &Arc<dyn Introspect> {
        &self.inner.introspect
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.is_disposed()
    }

    /// Creates a child that delegates to this node until registered into.
    ///
    /// The child is tracked by this node and disposed with it. The child
    /// holds its parent weakly: once every handle to this node is dropped,
    /// the child no longer sees any ancestor registration and
    /// [`parent`](Self::parent) returns `None`. Keep the parent alive for as
    /// long as its children are in use.
    pub fn create_child_container(&self) -> Container {
        let child = Container {
            inner: Arc::new(NodeInner::child(&self.inner)),
        };
        if self.is_disposed() {
            warn!(parent = %self.id(), scope = %child.id(), "child created from a disposed container");
        } else {
            self.inner
                .disposables
                .lock()
                .push(Tracked::Child(child.id(), child.clone()));
        }
        debug!(parent = %self.id(), scope = %child.id(), "created child container");
        child
    }

    // ----- Registration -----

    /// Compiles `registration` and stores it on this node, replacing any
    /// earlier registration of the same key here.
    ///
    /// Constructor and member selection run now: a type with no usable or
    /// with ambiguous constructors is rejected here, not on first resolve.
    /// Registrations of open generic definitions are compiled per closed type
    /// on first resolve.
    pub fn register(&self, registration: Registration) -> DiResult<Arc<PolicySet>> {
        let key = registration.key().clone();
        let kind = classify(&registration)?;
        let policy = Arc::new(match kind {
            RegistrationKind::Generic => open_generic(registration),
            _ => self.compile(kind, registration)?,
        });

        let replaced = self.inner.local_store().insert(policy.clone());
        if let Some(replaced) = &replaced {
            self.retire(replaced, &policy);
        }
        if self.is_disposed() {
            warn!(scope = %self.id(), key = %key, "registered into a disposed container");
        }
        self.track_lifetime(policy.lifetime());
        debug!(
            scope = %self.id(),
            key = %key,
            kind = ?kind,
            replaced = replaced.is_some(),
            "registered"
        );
        Ok(policy)
    }

    /// Releases what a replaced registration cached and stops tracking its
    /// lifetime managers, closed generic forms included.
    fn retire(&self, replaced: &PolicySet, current: &PolicySet) {
        let managers: Vec<_> = std::iter::once(replaced.lifetime().clone())
            .chain(replaced.closed_lifetimes())
            .filter(|manager| !same_manager(manager, current.lifetime()))
            .collect();
        let released: Vec<_> = {
            let mut bag = self.inner.disposables.lock();
            managers
                .into_iter()
                .filter(|manager| {
                    bag.forget_lifetime(manager);
                    !bag.tracks_lifetime(manager)
                })
                .collect()
        };
        for manager in &released {
            manager.remove_value();
        }
        trace!(scope = %self.id(), key = %replaced.key(), released = released.len(), "retired replaced registration");
    }

    fn track_lifetime(&self, manager: &Arc<dyn LifetimeManager>) {
        if !self.is_disposed() {
            self.inner.disposables.lock().push(Tracked::Lifetime(manager.clone()));
        }
    }

    /// Maps `service` (under `name`) to the type `to`.
    ///
    /// Mapping a type to itself registers it for construction.
    pub fn register_type(
        &self,
        service: ServiceType,
        name: Option<&str>,
        to: ServiceType,
        lifetime: Lifetime,
    ) -> DiResult<Arc<PolicySet>> {
        let registration = Registration::new(Key::new(service.clone(), name)).with_lifetime(lifetime);
        let registration = if to == service {
            registration
        } else {
            registration.map_to(to)
        };
        self.register(registration)
    }

    pub fn register_factory<F>(
        &self,
        service: ServiceType,
        name: Option<&str>,
        lifetime: Lifetime,
        factory: F,
    ) -> DiResult<Arc<PolicySet>>
    where
        F: for<'a> Fn(&BuildContext<'a>) -> DiResult<AnyArc> + Send + Sync + 'static,
    {
        self.register(
            Registration::new(Key::new(service, name))
                .with_lifetime(lifetime)
                .factory(factory),
        )
    }

    /// Registers a fixed instance held by `manager`.
    pub fn register_instance(
        &self,
        service: ServiceType,
        name: Option<&str>,
        instance: AnyArc,
        manager: Arc<dyn LifetimeManager>,
    ) -> DiResult<Arc<PolicySet>> {
        self.register(
            Registration::new(Key::new(service, name))
                .instance(instance)
                .with_lifetime_manager(manager),
        )
    }

    /// Registers `value` as the singleton instance of its own Rust type.
    pub fn register_value<T: std::any::Any + Send + Sync>(&self, name: Option<&str>, value: T) -> DiResult<Arc<PolicySet>> {
        self.register_instance(
            ServiceType::of::<T>(),
            name,
            Arc::new(value),
            Lifetime::Singleton.manager(),
        )
    }

    /// Tracks `resource` for disposal with this node.
    ///
    /// On a disposed node the resource is disposed immediately.
    pub fn register_disposable(&self, resource: Arc<dyn Dispose>) -> DiResult<()> {
        if self.is_disposed() {
            warn!(scope = %self.id(), "disposable registered after dispose; disposing it now");
            return resource.dispose();
        }
        self.inner.disposables.lock().push(Tracked::Resource(resource));
        Ok(())
    }

    /// Snapshot of this node's pipelines.
    pub fn pipelines(&self) -> Pipelines {
        self.inner.pipelines.read().clone()
    }

    /// Changes the pipelines of this node; children created afterwards inherit the change.
    ///
    /// `configure` must not call back into this container.
    pub fn configure_pipelines<F>(&self, configure: F)
    where
        F: FnOnce(&mut Pipelines),
    {
        configure(&mut self.inner.pipelines.write());
        self.inner.implicit.write().clear();
        debug!(scope = %self.id(), "pipelines reconfigured");
    }

    // ----- Lookup -----

    /// Nearest registration of `(service, name)` visible from this node.
    pub fn get_registration(&self, service: &ServiceType, name: Option<&str>) -> Option<Arc<PolicySet>> {
        self.inner.get_registration(&Key::new(service.clone(), name))
    }

    /// Whether `(service, name)` is explicitly registered here or in an ancestor.
    ///
    /// Types built implicitly do not count.
    pub fn is_registered(&self, service: &ServiceType, name: Option<&str>) -> bool {
        self.is_registered_key(&Key::new(service.clone(), name))
    }

    pub(crate) fn is_registered_key(&self, key: &Key) -> bool {
        self.inner.get_registration(key).is_some()
    }

    /// Keys registered on this node itself, in registration order.
    pub fn local_registrations(&self) -> Vec<Key> {
        self.inner.local_keys()
    }

    /// Named registrations of `service` (and its generic definition) across
    /// the ancestor chain. The ancestor's entry wins when a name repeats.
    pub fn collect_all_named(&self, service: &ServiceType) -> Vec<Arc<PolicySet>> {
        self.collect_named_keys(service).into_values().collect()
    }

    fn collect_named_keys(&self, service: &ServiceType) -> IndexMap<Key, Arc<PolicySet>> {
        let mut acc = IndexMap::new();
        self.inner.collect_all_named(service, &mut acc);
        acc
    }

    // ----- Resolution -----

    /// Resolves `(service, name)`.
    ///
    /// Failures are reported as [`DiError::ResolutionFailed`] wrapping the cause.
    pub fn resolve(&self, service: &ServiceType, name: Option<&str>) -> DiResult<AnyArc> {
        self.resolve_with(service, name, &[])
    }

    /// Resolves with values overriding parameters for this call's whole object graph.
    pub fn resolve_with(
        &self,
        service: &ServiceType,
        name: Option<&str>,
        overrides: &[ResolverOverride],
    ) -> DiResult<AnyArc> {
        let key = Key::new(service.clone(), name);
        self.resolve_inner(&key, overrides)
            .map_err(|source| wrap_failure(key.to_string(), source))
    }

    /// Resolves every named registration of `service`, nearest registration
    /// building each instance. The default registration is not included.
    pub fn resolve_all(&self, service: &ServiceType) -> DiResult<Vec<AnyArc>> {
        self.resolve_all_inner(service, &[])
            .map_err(|source| wrap_failure(service.to_string(), source))
    }

    pub(crate) fn resolve_inner(&self, key: &Key, overrides: &[ResolverOverride]) -> DiResult<AnyArc> {
        let _guard = StackGuard::enter(self.id(), key, self.options())?;
        let policy = self.find_policy(key)?;
        trace!(scope = %self.id(), key = %key, kind = ?policy.kind(), "resolving");
        policy.execute(&BuildContext::new(self, key, overrides))
    }

    pub(crate) fn resolve_all_inner(&self, service: &ServiceType, overrides: &[ResolverOverride]) -> DiResult<Vec<AnyArc>> {
        self.collect_named_keys(service)
            .keys()
            .map(|key| self.resolve_inner(key, overrides))
            .collect()
    }

    /// Policy that builds `key`: registered, enumerable, closed generic, implicit.
    fn find_policy(&self, key: &Key) -> DiResult<Arc<PolicySet>> {
        if let Some(policy) = self.inner.get_registration(key) {
            return Ok(policy);
        }

        let service = key.service();
        if let Some(element) = service.enumerable_element() {
            return self.implicit_policy(key, || {
                let element = element.clone();
                Registration::new(key.clone()).factory(move |ctx| {
                    let items: AnyArc = Arc::new(ctx.resolve_all(&element)?);
                    Ok(items)
                })
            });
        }

        if let Some(definition) = service.definition() {
            let open_key = key.with_service(definition.clone());
            if let Some((owner, open)) = self.inner.find_owner(&open_key) {
                if open.kind() == RegistrationKind::Generic {
                    // closed forms belong to the node owning the open registration
                    let owner = Container { inner: owner };
                    let (policy, created) = open.closed_for(service, |closed| {
                        debug!(scope = %owner.id(), key = %key, "closing generic registration");
                        owner.compile(RegistrationKind::Generic, closed)
                    })?;
                    if created {
                        owner.track_lifetime(policy.lifetime());
                    }
                    return Ok(policy);
                }
            }
        }

        if service.is_constructible() {
            let lifetime = self.options().implicit_lifetime;
            return self.implicit_policy(key, || Registration::new(key.clone()).with_lifetime(lifetime));
        }

        Err(DiError::NotFound(key.to_string()))
    }

    fn implicit_policy<F>(&self, key: &Key, registration: F) -> DiResult<Arc<PolicySet>>
    where
        F: FnOnce() -> Registration,
    {
        if let Some(policy) = self.inner.implicit.read().get(key) {
            return Ok(policy.clone());
        }
        let policy = Arc::new(self.compile(RegistrationKind::Implicit, registration())?);
        trace!(scope = %self.id(), key = %key, "materialised implicit registration");
        Ok(self
            .inner
            .implicit
            .write()
            .entry(key.clone())
            .or_insert(policy)
            .clone())
    }

    /// Runs `registration` through this node's chain for `kind`.
    fn compile(&self, kind: RegistrationKind, registration: Registration) -> DiResult<PolicySet> {
        let pipeline = self.inner.pipelines.read().for_kind(kind).pipeline();
        let build_type = registration.key().service().clone();
        let plan = pipeline(&PlanRequest::new(self, &registration, build_type))?;
        Ok(PolicySet::new(registration, kind, plan))
    }

    pub(crate) fn select_constructor(&self, request: &SelectionRequest<'_>) -> DiResult<SelectedConstructor> {
        let pipeline = self.inner.pipelines.read().constructors.pipeline();
        pipeline(request)?
            .ok_or_else(|| DiError::NoAccessibleConstructor(request.build_type().to_string()))
    }

    pub(crate) fn select_members(&self, request: &SelectionRequest<'_>) -> DiResult<SelectedMembers> {
        let pipeline = self.inner.pipelines.read().members.pipeline();
        Ok(pipeline(request)?.unwrap_or_default())
    }

    // ----- Disposal -----

    /// Disposes this node: detaches it from its parent, disposes everything
    /// it tracks (children included) newest first, then drops its
    /// registrations and cached pipelines.
    ///
    /// Only the first call does anything. Errors are collected across the
    /// whole cascade; one error is returned as-is, several are returned as
    /// [`DiError::AggregateDisposal`].
    pub fn dispose(&self) -> DiResult<()> {
        if !self.inner.mark_disposed() {
            return Ok(());
        }
        debug!(scope = %self.id(), "disposing container");

        if let Some(parent) = self.inner.parent_link() {
            parent.disposables.lock().detach(self.id());
            let mut ancestor = Some(parent);
            while let Some(node) = ancestor {
                node.disposables.lock().release_scope(self.id());
                ancestor = node.parent_link();
            }
        }

        let tracked = self.inner.disposables.lock().take();
        let errors = dispose_reverse(tracked);
        for err in &errors {
            warn!(scope = %self.id(), error = %err, "disposal failed");
        }

        self.inner.pipelines.write().invalidate_all();
        self.inner.implicit.write().clear();
        // a delegating child gets an empty store so lookups stop at this node
        let store = self.inner.local_store();
        store.clear();

        aggregate(errors)
    }
}

fn wrap_failure(key: String, source: DiError) -> DiError {
    DiError::ResolutionFailed {
        key,
        source: Box::new(source),
    }
}

fn classify(registration: &Registration) -> DiResult<RegistrationKind> {
    let key = registration.key();
    let service = key.service();
    if !service.is_generic_definition() {
        return Ok(match registration.strategy() {
            ConstructionStrategy::Instance(_) => RegistrationKind::Instance,
            _ => RegistrationKind::Explicit,
        });
    }
    match registration.strategy() {
        ConstructionStrategy::Instance(_) => Err(DiError::invalid(
            key,
            "an open generic definition cannot have an instance",
        )),
        ConstructionStrategy::MapTo(target) if !target.is_generic_definition() => Err(DiError::invalid(
            key,
            format!("{} is not a generic definition", target),
        )),
        _ => Ok(RegistrationKind::Generic),
    }
}

fn open_generic(registration: Registration) -> PolicySet {
    let plan = build_plan(|ctx| {
        Err(DiError::invalid(
            ctx.key(),
            "an open generic definition cannot be resolved directly",
        ))
    });
    PolicySet::new(registration, RegistrationKind::Generic, plan)
}

impl ResolverCore for Container {
    fn resolve_any(&self, key: &Key) -> DiResult<AnyArc> {
        self.resolve(key.service(), key.name())
    }

    fn resolve_all_any(&self, service: &ServiceType) -> DiResult<Vec<AnyArc>> {
        self.resolve_all(service)
    }

    fn push_disposable(&self, resource: Arc<dyn Dispose>) -> DiResult<()> {
        self.register_disposable(resource)
    }
}

impl Dispose for Container {
    fn dispose(&self) -> DiResult<()> {
        Container::dispose(self)
    }
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Container")
            .field("id", &self.id())
            .field("mode", &self.mode())
            .field("registrations", &self.inner.local_len())
            .field("tracked", &self.inner.disposables.lock().len())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}
