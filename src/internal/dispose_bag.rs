//! Internal disposal bag for a container node.

use std::sync::Arc;

use crate::error::{DiError, DiResult};
use crate::lifetime::LifetimeManager;
use crate::provider::{Container, ScopeId};
use crate::traits::Dispose;

/// Something a node must release when it is disposed.
pub(crate) enum Tracked {
    /// A child container created from this node
    Child(ScopeId, Container),
    /// Lifetime manager of a registration made on this node
    Lifetime(Arc<dyn LifetimeManager>),
    /// Resource registered through `register_disposable`
    Resource(Arc<dyn Dispose>),
}

impl Tracked {
    fn dispose(self) -> DiResult<()> {
        match self {
            Tracked::Child(_, child) => child.dispose(),
            Tracked::Lifetime(manager) => {
                manager.remove_value();
                Ok(())
            }
            Tracked::Resource(resource) => resource.dispose(),
        }
    }
}

/// Tracked entries in insertion order; disposed LIFO.
#[derive(Default)]
pub(crate) struct DisposeBag {
    entries: Vec<Tracked>,
}

impl DisposeBag {
    pub(crate) fn push(&mut self, entry: Tracked) {
        self.entries.push(entry);
    }

    /// Forgets a child that was disposed on its own.
    pub(crate) fn detach(&mut self, child: ScopeId) -> bool {
        let before = self.entries.len();
        self.entries
            .retain(|entry| !matches!(entry, Tracked::Child(id, _) if *id == child));
        before != self.entries.len()
    }

    /// Forgets one tracked entry of `manager`, newest first.
    pub(crate) fn forget_lifetime(&mut self, manager: &Arc<dyn LifetimeManager>) -> bool {
        let position = self
            .entries
            .iter()
            .rposition(|entry| matches!(entry, Tracked::Lifetime(tracked) if same_manager(tracked, manager)));
        match position {
            Some(index) => {
                self.entries.remove(index);
                true
            }
            None => false,
        }
    }

    pub(crate) fn tracks_lifetime(&self, manager: &Arc<dyn LifetimeManager>) -> bool {
        self.entries
            .iter()
            .any(|entry| matches!(entry, Tracked::Lifetime(tracked) if same_manager(tracked, manager)))
    }

    /// Lets every tracked lifetime manager drop what it cached for `scope`.
    pub(crate) fn release_scope(&self, scope: ScopeId) {
        for entry in &self.entries {
            if let Tracked::Lifetime(manager) = entry {
                manager.release_scope(scope);
            }
        }
    }

    pub(crate) fn take(&mut self) -> Vec<Tracked> {
        std::mem::take(&mut self.entries)
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}

pub(crate) fn same_manager(a: &Arc<dyn LifetimeManager>, b: &Arc<dyn LifetimeManager>) -> bool {
    std::ptr::eq(Arc::as_ptr(a) as *const (), Arc::as_ptr(b) as *const ())
}

/// Disposes `entries` newest first, running every entry even after a failure.
pub(crate) fn dispose_reverse(entries: Vec<Tracked>) -> Vec<DiError> {
    entries
        .into_iter()
        .rev()
        .filter_map(|entry| entry.dispose().err())
        .collect()
}

/// Folds collected disposal errors into one result.
pub(crate) fn aggregate(mut errors: Vec<DiError>) -> DiResult<()> {
    match errors.len() {
        0 => Ok(()),
        1 => Err(errors.remove(0)),
        _ => Err(DiError::AggregateDisposal(errors)),
    }
}
