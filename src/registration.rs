//! Registrations, compiled policy sets and the per-node registration store.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::RwLock;

use crate::error::DiResult;
use crate::key::Key;
use crate::lifetime::{Lifetime, LifetimeManager};
use crate::provider::BuildContext;
use crate::types::ServiceType;

// Type-erased instances
pub type AnyArc = Arc<dyn Any + Send + Sync>;
pub type AnyBox = Box<dyn Any + Send + Sync>;

/// Compiled build plan of a registration.
pub type BuildPlan = Arc<dyn for<'a> Fn(&BuildContext<'a>) -> DiResult<AnyArc> + Send + Sync>;

/// User factory delegate.
pub type FactoryFn = Arc<dyn for<'a> Fn(&BuildContext<'a>) -> DiResult<AnyArc> + Send + Sync>;

/// How a registration produces its instance.
#[derive(Clone)]
pub enum ConstructionStrategy {
    /// Construct the requested type through constructor selection
    Construct,
    /// Build (or resolve) another type in place of the requested one
    MapTo(ServiceType),
    /// Call a user delegate
    Factory(FactoryFn),
    /// Hand out a fixed instance
    Instance(AnyArc),
}

impl fmt::Debug for ConstructionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstructionStrategy::Construct => f.write_str("Construct"),
            ConstructionStrategy::MapTo(target) => write!(f, "MapTo({})", target),
            ConstructionStrategy::Factory(_) => f.write_str("Factory"),
            ConstructionStrategy::Instance(_) => f.write_str("Instance"),
        }
    }
}

/// Value supplied for a parameter or member at registration time.
#[derive(Clone)]
pub enum InjectionParameter {
    /// Use this value as-is
    Value(AnyArc),
    /// Resolve this key from the container at build time
    Resolve(Key),
}

impl InjectionParameter {
    pub fn value<T: Any + Send + Sync>(value: T) -> Self {
        InjectionParameter::Value(Arc::new(value))
    }

    pub fn resolve(service: ServiceType) -> Self {
        InjectionParameter::Resolve(Key::default_of(service))
    }
}

impl fmt::Debug for InjectionParameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InjectionParameter::Value(_) => f.write_str("Value(..)"),
            InjectionParameter::Resolve(key) => write!(f, "Resolve({})", key),
        }
    }
}

/// Explicit injection configuration attached to a registration.
#[derive(Debug, Clone)]
pub enum InjectionMember {
    /// Use the constructor whose parameters match these, with these values
    Constructor(Vec<InjectionParameter>),
    /// Inject this property
    Property(String, InjectionParameter),
    /// Call this method with these arguments
    Method(String, Vec<InjectionParameter>),
}

/// Value supplied for one `resolve_with` call; applies to the whole object graph it builds.
#[derive(Clone)]
pub enum ResolverOverride {
    /// Any parameter with this name
    Parameter { name: String, value: AnyArc },
    /// Any parameter or property of this type
    Dependency { service: ServiceType, value: AnyArc },
}

impl ResolverOverride {
    pub fn parameter<T: Any + Send + Sync>(name: impl Into<String>, value: T) -> Self {
        ResolverOverride::Parameter {
            name: name.into(),
            value: Arc::new(value),
        }
    }

    pub fn dependency<T: Any + Send + Sync>(service: ServiceType, value: T) -> Self {
        ResolverOverride::Dependency {
            service,
            value: Arc::new(value),
        }
    }

    pub(crate) fn matches(&self, name: &str, service: &ServiceType) -> Option<&AnyArc> {
        match self {
            ResolverOverride::Parameter { name: n, value } if n == name => Some(value),
            ResolverOverride::Dependency { service: s, value } if s == service => Some(value),
            _ => None,
        }
    }
}

impl fmt::Debug for ResolverOverride {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolverOverride::Parameter { name, .. } => write!(f, "Parameter({})", name),
            ResolverOverride::Dependency { service, .. } => write!(f, "Dependency({})", service),
        }
    }
}

/// Stored intent to construct `(type, name)` a particular way.
///
/// # Examples
///
/// ```rust
/// use ferrous_container::{InjectionMember, InjectionParameter, Key, Lifetime, Registration, ServiceType};
///
/// let registration = Registration::new(Key::default_of(ServiceType::interface("IMailer")))
///     .map_to(ServiceType::class("SmtpMailer"))
///     .with_lifetime(Lifetime::Singleton)
///     .with_member(InjectionMember::Property(
///         "host".into(),
///         InjectionParameter::value(String::from("smtp.local")),
///     ));
///
/// assert_eq!(registration.members().len(), 1);
/// ```
#[derive(Clone)]
pub struct Registration {
    key: Key,
    strategy: ConstructionStrategy,
    lifetime: Arc<dyn LifetimeManager>,
    members: Vec<InjectionMember>,
}

impl Registration {
    /// Transient registration that constructs the requested type itself.
    pub fn new(key: Key) -> Self {
        Self {
            key,
            strategy: ConstructionStrategy::Construct,
            lifetime: Lifetime::Transient.manager(),
            members: Vec::new(),
        }
    }

    pub fn map_to(mut self, target: ServiceType) -> Self {
        self.strategy = ConstructionStrategy::MapTo(target);
        self
    }

    pub fn factory<F>(mut self, factory: F) -> Self
    where
        F: for<'a> Fn(&BuildContext<'a>) -> DiResult<AnyArc> + Send + Sync + 'static,
    {
        self.strategy = ConstructionStrategy::Factory(Arc::new(factory));
        self
    }

    pub fn instance(mut self, instance: AnyArc) -> Self {
        self.strategy = ConstructionStrategy::Instance(instance);
        self
    }

    pub fn with_lifetime(self, lifetime: Lifetime) -> Self {
        self.with_lifetime_manager(lifetime.manager())
    }

    pub fn with_lifetime_manager(mut self, manager: Arc<dyn LifetimeManager>) -> Self {
        self.lifetime = manager;
        self
    }

    pub fn with_member(mut self, member: InjectionMember) -> Self {
        self.members.push(member);
        self
    }

    pub fn key(&self) -> &Key {
        &self.key
    }

    pub fn strategy(&self) -> &ConstructionStrategy {
        &self.strategy
    }

    pub fn lifetime(&self) -> &Arc<dyn LifetimeManager> {
        &self.lifetime
    }

    pub fn members(&self) -> &[InjectionMember] {
        &self.members
    }

    /// Pinned constructor arguments, if an `InjectionMember::Constructor` was given.
    pub fn constructor_override(&self) -> Option<&[InjectionParameter]> {
        self.members.iter().find_map(|m| match m {
            InjectionMember::Constructor(params) => Some(params.as_slice()),
            _ => None,
        })
    }

    /// Copy of this registration closed over a concrete generic key, with a fresh lifetime manager.
    pub(crate) fn close(&self, key: Key) -> Self {
        Self {
            key,
            strategy: self.strategy.clone(),
            lifetime: self.lifetime.create_fresh(),
            members: self.members.clone(),
        }
    }
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("key", &self.key)
            .field("strategy", &self.strategy)
            .field("lifetime", &self.lifetime)
            .field("members", &self.members)
            .finish()
    }
}

/// Which registration chain compiles a registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegistrationKind {
    /// Open generic definition, compiled per closed type
    Generic,
    /// Regular `register` call
    Explicit,
    /// Materialised on first resolve of an unregistered concrete type
    Implicit,
    /// Fixed instance
    Instance,
}

/// Executable form of a registration.
pub struct PolicySet {
    registration: Arc<Registration>,
    kind: RegistrationKind,
    plan: BuildPlan,
    closed: RwLock<HashMap<ServiceType, Arc<PolicySet>>>,
}

impl PolicySet {
    pub(crate) fn new(registration: Registration, kind: RegistrationKind, plan: BuildPlan) -> Self {
        Self {
            registration: Arc::new(registration),
            kind,
            plan,
            closed: RwLock::new(HashMap::new()),
        }
    }

    pub fn key(&self) -> &Key {
        self.registration.key()
    }

    pub fn kind(&self) -> RegistrationKind {
        self.kind
    }

    pub fn registration(&self) -> &Registration {
        &self.registration
    }

    pub fn lifetime(&self) -> &Arc<dyn LifetimeManager> {
        self.registration.lifetime()
    }

    pub fn plan(&self) -> &BuildPlan {
        &self.plan
    }

    pub(crate) fn execute(&self, ctx: &BuildContext<'_>) -> DiResult<AnyArc> {
        (self.plan)(ctx)
    }

    /// Closed form of this generic definition for `service`, compiled once by `compile`.
    ///
    /// The flag is `true` for the call whose compiled policy was cached.
    pub(crate) fn closed_for<F>(&self, service: &ServiceType, compile: F) -> DiResult<(Arc<PolicySet>, bool)>
    where
        F: FnOnce(Registration) -> DiResult<PolicySet>,
    {
        if let Some(policy) = self.closed.read().get(service) {
            return Ok((policy.clone(), false));
        }
        let closed = self.registration.close(self.key().with_service(service.clone()));
        let policy = Arc::new(compile(closed)?);
        // first compiled policy wins so every caller shares one lifetime manager
        let mut cache = self.closed.write();
        match cache.get(service) {
            Some(existing) => Ok((existing.clone(), false)),
            None => {
                cache.insert(service.clone(), policy.clone());
                Ok((policy, true))
            }
        }
    }

    /// Lifetime managers of the closed forms compiled so far.
    pub(crate) fn closed_lifetimes(&self) -> Vec<Arc<dyn LifetimeManager>> {
        self.closed
            .read()
            .values()
            .map(|policy| policy.lifetime().clone())
            .collect()
    }
}

impl fmt::Debug for PolicySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PolicySet")
            .field("key", self.key())
            .field("kind", &self.kind)
            .field("lifetime", self.lifetime())
            .finish()
    }
}

/// Per-node mapping from key to policy set; last write wins.
#[derive(Default)]
pub(crate) struct RegistrationStore {
    entries: RwLock<IndexMap<Key, Arc<PolicySet>>>,
}

impl RegistrationStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces, returning the replaced policy.
    pub(crate) fn insert(&self, policy: Arc<PolicySet>) -> Option<Arc<PolicySet>> {
        let key = policy.key().clone();
        self.entries.write().insert(key, policy)
    }

    #[inline]
    pub(crate) fn get(&self, key: &Key) -> Option<Arc<PolicySet>> {
        self.entries.read().get(key).cloned()
    }

    /// Named (non-default) registrations of `service`, in registration order.
    pub(crate) fn named_for(&self, service: &ServiceType) -> Vec<Arc<PolicySet>> {
        self.entries
            .read()
            .iter()
            .filter(|(k, _)| !k.is_default() && k.service() == service)
            .map(|(_, p)| p.clone())
            .collect()
    }

    pub(crate) fn keys(&self) -> Vec<Key> {
        self.entries.read().keys().cloned().collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub(crate) fn clear(&self) {
        self.entries.write().clear();
    }
}
