//! Container nodes and copy-on-write promotion.
//!
//! A child node starts out delegating every registration lookup to its
//! parent, without a store of its own. The first write to the child promotes
//! it: an empty local store is attached and lookups consult it before falling
//! back to the parent chain. Promotion is one-way and happens at most once.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};
use std::sync::{Arc, Weak};

use indexmap::IndexMap;
use once_cell::sync::OnceCell;
use parking_lot::{Mutex, RwLock};
use tracing::{debug, trace};

use crate::capabilities::Introspect;
use crate::config::ContainerOptions;
use crate::internal::DisposeBag;
use crate::key::Key;
use crate::pipeline::Pipelines;
use crate::registration::{PolicySet, RegistrationStore};
use crate::types::ServiceType;

static NEXT_SCOPE: AtomicU64 = AtomicU64::new(1);

/// Identity of a container node, used to key per-scope instances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ScopeId(u64);

impl ScopeId {
    pub(crate) fn next() -> Self {
        ScopeId(NEXT_SCOPE.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ScopeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "scope-{}", self.0)
    }
}

/// How a node answers registration lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum NodeMode {
    /// No parent; owns its store
    Root = 0,
    /// Child without local registrations; every lookup goes to the parent
    DelegatingChild = 1,
    /// Child with a local store, consulted before the parent
    OwningChild = 2,
}

impl NodeMode {
    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => NodeMode::Root,
            1 => NodeMode::DelegatingChild,
            _ => NodeMode::OwningChild,
        }
    }
}

pub(crate) struct NodeInner {
    pub(crate) id: ScopeId,
    parent: Option<Weak<NodeInner>>,
    mode: AtomicU8,
    promotion: Mutex<()>,
    store: OnceCell<RegistrationStore>,
    /// Policies materialised for unregistered types, invisible to `is_registered`
    pub(crate) implicit: RwLock<HashMap<Key, Arc<PolicySet>>>,
    pub(crate) pipelines: RwLock<Pipelines>,
    pub(crate) introspect: Arc<dyn Introspect>,
    pub(crate) options: Arc<ContainerOptions>,
    pub(crate) disposables: Mutex<DisposeBag>,
    disposed: AtomicBool,
}

impl NodeInner {
    pub(crate) fn root(introspect: Arc<dyn Introspect>, options: ContainerOptions) -> Self {
        Self {
            id: ScopeId::next(),
            parent: None,
            mode: AtomicU8::new(NodeMode::Root as u8),
            promotion: Mutex::new(()),
            store: OnceCell::with_value(RegistrationStore::new()),
            implicit: RwLock::new(HashMap::new()),
            pipelines: RwLock::new(Pipelines::new()),
            introspect,
            options: Arc::new(options),
            disposables: Mutex::new(DisposeBag::default()),
            disposed: AtomicBool::new(false),
        }
    }

    pub(crate) fn child(parent: &Arc<NodeInner>) -> Self {
        Self {
            id: ScopeId::next(),
            parent: Some(Arc::downgrade(parent)),
            mode: AtomicU8::new(NodeMode::DelegatingChild as u8),
            promotion: Mutex::new(()),
            store: OnceCell::new(),
            implicit: RwLock::new(HashMap::new()),
            pipelines: RwLock::new(parent.pipelines.read().clone()),
            introspect: parent.introspect.clone(),
            options: parent.options.clone(),
            disposables: Mutex::new(DisposeBag::default()),
            disposed: AtomicBool::new(false),
        }
    }

    #[inline]
    pub(crate) fn mode(&self) -> NodeMode {
        NodeMode::from_u8(self.mode.load(Ordering::Acquire))
    }

    /// Parent used for lookups; a disposed node never falls back.
    pub(crate) fn parent(&self) -> Option<Arc<NodeInner>> {
        if self.is_disposed() {
            return None;
        }
        let parent = self.parent_link();
        if parent.is_none() && self.parent.is_some() {
            debug!(scope = %self.id, "parent container was dropped; lookups stop at this node");
        }
        parent
    }

    pub(crate) fn parent_link(&self) -> Option<Arc<NodeInner>> {
        self.parent.as_ref().and_then(Weak::upgrade)
    }

    pub(crate) fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    /// Marks the node disposed; `true` only for the first caller.
    pub(crate) fn mark_disposed(&self) -> bool {
        !self.disposed.swap(true, Ordering::AcqRel)
    }

    /// The store writes go to, promoting a delegating child first.
    pub(crate) fn local_store(&self) -> &RegistrationStore {
        if let Some(store) = self.store.get() {
            if self.mode() != NodeMode::DelegatingChild {
                return store;
            }
        }
        let _promotion = self.promotion.lock();
        let store = self.store.get_or_init(RegistrationStore::new);
        if self.mode() == NodeMode::DelegatingChild {
            self.mode.store(NodeMode::OwningChild as u8, Ordering::Release);
            debug!(scope = %self.id, "child container promoted to owning mode");
        }
        store
    }

    /// Nearest registration of `key`, searching this node then its ancestors.
    pub(crate) fn get_registration(&self, key: &Key) -> Option<Arc<PolicySet>> {
        match self.mode() {
            NodeMode::Root => self.store.get()?.get(key),
            NodeMode::DelegatingChild => self.parent()?.get_registration(key),
            NodeMode::OwningChild => self
                .store
                .get()
                .and_then(|store| store.get(key))
                .or_else(|| self.parent()?.get_registration(key)),
        }
    }

    /// Node holding the nearest registration of `key`, with that registration.
    pub(crate) fn find_owner(self: &Arc<Self>, key: &Key) -> Option<(Arc<NodeInner>, Arc<PolicySet>)> {
        let mut node = self.clone();
        loop {
            if node.mode() != NodeMode::DelegatingChild {
                if let Some(policy) = node.store.get().and_then(|store| store.get(key)) {
                    return Some((node, policy));
                }
            }
            node = node.parent()?;
        }
    }

    /// Named registrations of `service` from the root down to this node.
    ///
    /// The first entry seen for a key is kept, so an ancestor's registration
    /// shadows a descendant's registration under the same name. Named
    /// registrations of the generic definition of `service` are included
    /// under the closed key.
    pub(crate) fn collect_all_named(&self, service: &ServiceType, acc: &mut IndexMap<Key, Arc<PolicySet>>) {
        if let Some(parent) = self.parent() {
            parent.collect_all_named(service, acc);
        }
        if self.mode() == NodeMode::DelegatingChild {
            return;
        }
        let Some(store) = self.store.get() else {
            return;
        };
        for policy in store.named_for(service) {
            acc.entry(policy.key().clone()).or_insert(policy);
        }
        if let Some(definition) = service.definition() {
            for policy in store.named_for(definition) {
                acc.entry(policy.key().with_service(service.clone()))
                    .or_insert(policy);
            }
        }
        trace!(scope = %self.id, service = %service, collected = acc.len(), "collected named registrations");
    }

    pub(crate) fn local_keys(&self) -> Vec<Key> {
        match self.mode() {
            NodeMode::DelegatingChild => Vec::new(),
            _ => self.store.get().map(RegistrationStore::keys).unwrap_or_default(),
        }
    }

    pub(crate) fn local_len(&self) -> usize {
        match self.mode() {
            NodeMode::DelegatingChild => 0,
            _ => self.store.get().map(RegistrationStore::len).unwrap_or(0),
        }
    }
}

impl Drop for NodeInner {
    fn drop(&mut self) {
        if !*self.disposed.get_mut() && !self.disposables.get_mut().is_empty() {
            debug!(scope = %self.id, "container dropped without dispose; tracked resources were not released");
        }
    }
}
