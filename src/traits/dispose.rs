//! Disposal trait for resource cleanup.

use crate::error::DiResult;

/// Trait for synchronous resource disposal.
///
/// Implement this trait for services that need structured teardown (flushing
/// caches, closing connections). Resources handed to
/// [`Container::register_disposable`](crate::Container::register_disposable)
/// are disposed in LIFO order when their container is disposed. A failure
/// does not stop the cascade; errors are collected and reported once it
/// completes.
///
/// # Examples
///
/// ```
/// use ferrous_container::{Container, DiResult, Dispose, TypeCatalog};
/// use std::sync::atomic::{AtomicBool, Ordering};
/// use std::sync::Arc;
///
/// struct Cache {
///     flushed: AtomicBool,
/// }
///
/// impl Dispose for Cache {
///     fn dispose(&self) -> DiResult<()> {
///         self.flushed.store(true, Ordering::SeqCst);
///         Ok(())
///     }
/// }
///
/// let container = Container::new(Arc::new(TypeCatalog::new()));
/// let cache = Arc::new(Cache { flushed: AtomicBool::new(false) });
/// container.register_disposable(cache.clone()).unwrap();
///
/// container.dispose().unwrap();
/// assert!(cache.flushed.load(Ordering::SeqCst));
/// ```
pub trait Dispose: Send + Sync + 'static {
    /// Perform synchronous cleanup of resources.
    fn dispose(&self) -> DiResult<()>;
}
