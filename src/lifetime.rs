//! Instance lifetime policies.
//!
//! A [`LifetimeManager`] decides whether a build plan runs or a cached
//! instance is handed back. The engine only calls the trait; the three
//! managers here cover the usual policies and custom ones can be plugged in
//! through [`Registration::with_lifetime_manager`](crate::Registration::with_lifetime_manager).

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::provider::ScopeId;
use crate::registration::AnyArc;

/// Built-in lifetime policies.
///
/// # Examples
///
/// ```rust
/// use ferrous_container::{Container, Lifetime, Resolver, ServiceType, TypeCatalog};
/// use ferrous_container::{ConstructorDescriptor, TypeShape};
/// use std::sync::Arc;
///
/// struct Clock;
///
/// let catalog = TypeCatalog::new();
/// catalog.describe(
///     ServiceType::of::<Clock>(),
///     TypeShape::new().constructor(ConstructorDescriptor::new(vec![], |_| Ok(Clock))),
/// );
///
/// let container = Container::new(Arc::new(catalog));
/// container.register_type(ServiceType::of::<Clock>(), None, ServiceType::of::<Clock>(), Lifetime::Singleton).unwrap();
///
/// let a = container.get_required::<Clock>();
/// let b = container.get_required::<Clock>();
/// assert!(Arc::ptr_eq(&a, &b));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "config", derive(serde::Serialize, serde::Deserialize))]
pub enum Lifetime {
    /// One instance for the registration, shared by every scope
    Singleton,
    /// One instance per resolving container node
    PerScope,
    /// New instance per resolution, never cached
    Transient,
}

impl Lifetime {
    /// A fresh manager implementing this policy.
    pub fn manager(self) -> Arc<dyn LifetimeManager> {
        match self {
            Lifetime::Singleton => Arc::new(SingletonLifetimeManager::new()),
            Lifetime::PerScope => Arc::new(PerScopeLifetimeManager::new()),
            Lifetime::Transient => Arc::new(TransientLifetimeManager),
        }
    }
}

/// Caching policy consulted around every build plan.
pub trait LifetimeManager: Send + Sync + fmt::Debug {
    /// Cached instance visible from `scope`, if any.
    fn get_value(&self, scope: ScopeId) -> Option<AnyArc>;

    /// Offers a freshly built instance and returns the one to hand out.
    /// When two builds race, the first stored value wins.
    fn set_value(&self, scope: ScopeId, value: AnyArc) -> AnyArc;

    /// Drops every cached instance.
    fn remove_value(&self);

    /// Drops the instance cached for `scope`, called when that scope is disposed.
    fn release_scope(&self, _scope: ScopeId) {}

    /// An empty manager with the same policy, used when closing generic registrations.
    fn create_fresh(&self) -> Arc<dyn LifetimeManager>;
}

#[derive(Debug, Default)]
pub struct TransientLifetimeManager;

impl LifetimeManager for TransientLifetimeManager {
    fn get_value(&self, _scope: ScopeId) -> Option<AnyArc> {
        None
    }

    fn set_value(&self, _scope: ScopeId, value: AnyArc) -> AnyArc {
        value
    }

    fn remove_value(&self) {}

    fn create_fresh(&self) -> Arc<dyn LifetimeManager> {
        Arc::new(TransientLifetimeManager)
    }
}

#[derive(Default)]
pub struct SingletonLifetimeManager {
    value: RwLock<Option<AnyArc>>,
}

impl SingletonLifetimeManager {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LifetimeManager for SingletonLifetimeManager {
    fn get_value(&self, _scope: ScopeId) -> Option<AnyArc> {
        self.value.read().clone()
    }

    fn set_value(&self, _scope: ScopeId, value: AnyArc) -> AnyArc {
        let mut slot = self.value.write();
        slot.get_or_insert(value).clone()
    }

    fn remove_value(&self) {
        self.value.write().take();
    }

    fn create_fresh(&self) -> Arc<dyn LifetimeManager> {
        Arc::new(SingletonLifetimeManager::new())
    }
}

impl fmt::Debug for SingletonLifetimeManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SingletonLifetimeManager")
            .field("has_value", &self.value.read().is_some())
            .finish()
    }
}

#[derive(Default)]
pub struct PerScopeLifetimeManager {
    values: Mutex<HashMap<ScopeId, AnyArc>>,
}

impl PerScopeLifetimeManager {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LifetimeManager for PerScopeLifetimeManager {
    fn get_value(&self, scope: ScopeId) -> Option<AnyArc> {
        self.values.lock().get(&scope).cloned()
    }

    fn set_value(&self, scope: ScopeId, value: AnyArc) -> AnyArc {
        self.values.lock().entry(scope).or_insert(value).clone()
    }

    fn remove_value(&self) {
        self.values.lock().clear();
    }

    fn release_scope(&self, scope: ScopeId) {
        self.values.lock().remove(&scope);
    }

    fn create_fresh(&self) -> Arc<dyn LifetimeManager> {
        Arc::new(PerScopeLifetimeManager::new())
    }
}

impl fmt::Debug for PerScopeLifetimeManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PerScopeLifetimeManager")
            .field("scopes", &self.values.lock().len())
            .finish()
    }
}
