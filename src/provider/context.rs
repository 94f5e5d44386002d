//! Build context for dependency resolution.
//!
//! This module contains the BuildContext type handed to build plans and
//! factory delegates while one `resolve` call is in flight.

use std::sync::Arc;

use crate::error::DiResult;
use crate::key::Key;
use crate::registration::{AnyArc, ResolverOverride};
use crate::traits::{Dispose, ResolverCore};
use crate::types::ServiceType;

use super::{Container, ScopeId};

/// Context passed to build plans and factory functions.
///
/// Nested resolutions made through the context run against the container
/// that received the outer `resolve` call and carry its overrides along.
/// Errors from nested resolutions are returned unwrapped.
///
/// # Examples
///
/// ```
/// use ferrous_container::{AnyArc, Container, Lifetime, Resolver, ServiceType, TypeCatalog};
/// use std::sync::Arc;
///
/// struct Database { url: String }
/// struct UserService { db: Arc<Database> }
///
/// let container = Container::new(Arc::new(TypeCatalog::new()));
/// container.register_value(None, Database { url: "postgres://localhost".into() }).unwrap();
/// container
///     .register_factory(ServiceType::of::<UserService>(), None, Lifetime::Transient, |ctx| {
///         Ok(Arc::new(UserService { db: ctx.get::<Database>()? }) as AnyArc)
///     })
///     .unwrap();
///
/// let users = container.get_required::<UserService>();
/// assert_eq!(users.db.url, "postgres://localhost");
/// ```
pub struct BuildContext<'a> {
    container: &'a Container,
    key: &'a Key,
    overrides: &'a [ResolverOverride],
}

impl<'a> BuildContext<'a> {
    pub(crate) fn new(container: &'a Container, key: &'a Key, overrides: &'a [ResolverOverride]) -> Self {
        Self {
            container,
            key,
            overrides,
        }
    }

    /// The container the outer `resolve` call was made on.
    pub fn container(&self) -> &'a Container {
        self.container
    }

    /// Key being built.
    pub fn key(&self) -> &'a Key {
        self.key
    }

    /// Scope whose per-scope instances this build uses.
    pub fn scope(&self) -> ScopeId {
        self.container.id()
    }

    pub fn overrides(&self) -> &'a [ResolverOverride] {
        self.overrides
    }

    pub fn resolve_key(&self, key: &Key) -> DiResult<AnyArc> {
        self.container.resolve_inner(key, self.overrides)
    }

    pub fn resolve(&self, service: &ServiceType, name: Option<&str>) -> DiResult<AnyArc> {
        self.resolve_key(&Key::new(service.clone(), name))
    }

    pub fn resolve_all(&self, service: &ServiceType) -> DiResult<Vec<AnyArc>> {
        self.container.resolve_all_inner(service, self.overrides)
    }

    /// Tracks `resource` for disposal with the resolving container.
    pub fn register_disposable(&self, resource: Arc<dyn Dispose>) -> DiResult<()> {
        self.container.register_disposable(resource)
    }

    /// First override matching a parameter name or type.
    pub(crate) fn override_for(&self, parameter: &str, service: &ServiceType) -> Option<&'a AnyArc> {
        self.overrides
            .iter()
            .find_map(|o| o.matches(parameter, service))
    }
}

impl ResolverCore for BuildContext<'_> {
    fn resolve_any(&self, key: &Key) -> DiResult<AnyArc> {
        self.resolve_key(key)
    }

    fn resolve_all_any(&self, service: &ServiceType) -> DiResult<Vec<AnyArc>> {
        self.resolve_all(service)
    }

    fn push_disposable(&self, resource: Arc<dyn Dispose>) -> DiResult<()> {
        self.register_disposable(resource)
    }
}
