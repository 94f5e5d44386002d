//! Resolver traits for service resolution.

use std::any::Any;
use std::sync::Arc;

use crate::error::{DiError, DiResult};
use crate::key::Key;
use crate::registration::AnyArc;
use crate::traits::Dispose;
use crate::types::ServiceType;

/// Core resolver trait for object-safe service resolution.
///
/// Implemented by [`Container`](crate::Container) and by the
/// [`BuildContext`](crate::BuildContext) handed to factories. Most users
/// should use the [`Resolver`] trait instead, which provides typed helpers on
/// top of this trait.
pub trait ResolverCore {
    /// Resolves a single instance.
    ///
    /// # Returns
    ///
    /// * `Ok(AnyArc)` - The resolved instance wrapped in `Arc<dyn Any>`
    /// * `Err(DiError)` - Resolution error (not found, selection, circular, etc.)
    fn resolve_any(&self, key: &Key) -> DiResult<AnyArc>;

    /// Resolves every named registration of `service` visible from this resolver.
    fn resolve_all_any(&self, service: &ServiceType) -> DiResult<Vec<AnyArc>>;

    /// Hands a resource to the disposal scope of the resolving container.
    fn push_disposable(&self, resource: Arc<dyn Dispose>) -> DiResult<()>;
}

fn downcast<T: Any + Send + Sync>(any: AnyArc) -> DiResult<Arc<T>> {
    any.downcast::<T>()
        .map_err(|_| DiError::TypeMismatch(std::any::type_name::<T>().to_string()))
}

fn downcast_trait<T: ?Sized + Send + Sync + 'static>(any: AnyArc) -> DiResult<Arc<T>> {
    // Trait objects are stored as Arc<Arc<dyn Trait>>
    any.downcast::<Arc<T>>()
        .map(|boxed| (*boxed).clone())
        .map_err(|_| DiError::TypeMismatch(std::any::type_name::<T>().to_string()))
}

/// Typed resolution helpers.
///
/// Registered instances are stored type-erased. Concrete instances downcast
/// straight to `T`; trait objects are registered as `Arc<Arc<dyn Trait>>` and
/// come back out through [`get_trait`](Self::get_trait).
///
/// # Examples
///
/// ```
/// use ferrous_container::{AnyArc, Container, Lifetime, Resolver, ServiceType, TypeCatalog};
/// use std::sync::Arc;
///
/// trait Logger: Send + Sync {
///     fn prefix(&self) -> &str;
/// }
///
/// struct ConsoleLogger;
/// impl Logger for ConsoleLogger {
///     fn prefix(&self) -> &str { "console" }
/// }
///
/// let container = Container::new(Arc::new(TypeCatalog::new()));
/// let logger = ServiceType::interface_of::<dyn Logger>();
/// container
///     .register_factory(logger.clone(), None, Lifetime::Singleton, |_| {
///         Ok(Arc::new(Arc::new(ConsoleLogger) as Arc<dyn Logger>) as AnyArc)
///     })
///     .unwrap();
///
/// let resolved = container.get_trait::<dyn Logger>(&logger, None).unwrap();
/// assert_eq!(resolved.prefix(), "console");
/// ```
pub trait Resolver: ResolverCore {
    /// Resolves the default registration of the concrete type `T`.
    fn get<T: Any + Send + Sync>(&self) -> DiResult<Arc<T>> {
        downcast(self.resolve_any(&Key::of::<T>())?)
    }

    /// Resolves a named registration of the concrete type `T`.
    fn get_named<T: Any + Send + Sync>(&self, name: &str) -> DiResult<Arc<T>> {
        downcast(self.resolve_any(&Key::named(ServiceType::of::<T>(), name))?)
    }

    /// Resolves `service` and downcasts the instance to the concrete type `T`.
    fn get_as<T: Any + Send + Sync>(&self, service: &ServiceType, name: Option<&str>) -> DiResult<Arc<T>> {
        downcast(self.resolve_any(&Key::new(service.clone(), name))?)
    }

    /// Resolves a trait object registered as `Arc<Arc<dyn Trait>>`.
    fn get_trait<T: ?Sized + Send + Sync + 'static>(&self, service: &ServiceType, name: Option<&str>) -> DiResult<Arc<T>> {
        downcast_trait(self.resolve_any(&Key::new(service.clone(), name))?)
    }

    /// Resolves every named registration of `service` as the concrete type `T`.
    fn get_all_as<T: Any + Send + Sync>(&self, service: &ServiceType) -> DiResult<Vec<Arc<T>>> {
        self.resolve_all_any(service)?
            .into_iter()
            .map(downcast)
            .collect()
    }

    /// Resolves every named registration of `service` as trait objects.
    fn get_all_trait<T: ?Sized + Send + Sync + 'static>(&self, service: &ServiceType) -> DiResult<Vec<Arc<T>>> {
        self.resolve_all_any(service)?
            .into_iter()
            .map(downcast_trait)
            .collect()
    }

    /// Resolves `T` or panics.
    ///
    /// # Panics
    ///
    /// Panics if the service cannot be resolved.
    fn get_required<T: Any + Send + Sync>(&self) -> Arc<T> {
        match self.get::<T>() {
            Ok(value) => value,
            Err(err) => panic!("failed to resolve {}: {}", std::any::type_name::<T>(), err),
        }
    }

    /// Registers `resource` for disposal with the resolving container.
    fn register_disposer<D: Dispose>(&self, resource: Arc<D>) -> DiResult<()> {
        self.push_disposable(resource)
    }
}

impl<R: ResolverCore + ?Sized> Resolver for R {}
