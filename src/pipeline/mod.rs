//! Staged, composable construction pipelines.
//!
//! A [`StagedFactoryChain`] keeps `(aspect factory, stage)` pairs sorted by
//! stage. Building the chain folds it from the highest stage down: the
//! terminal pipeline is wrapped by the innermost (creation) aspect, that by
//! the next outer aspect, and so on, middleware style. The composed pipeline is
//! cached until the chain is mutated.
//!
//! Cloning a chain takes a snapshot: entries are copied, and the already
//! built pipeline is shared until either copy is mutated.

use std::fmt;
use std::sync::Arc;

use once_cell::sync::OnceCell;

pub mod registration;

pub use registration::{
    default_constructor_chain, default_member_chain, ConstructorPipeline, MemberPipeline, Pipelines,
    PlanRequest, RegistrationPipeline, SelectionRequest,
};

/// Sort key of a chain entry.
pub trait Stage: Copy + Ord + fmt::Debug + Send + Sync + 'static {}

/// Stages of the registration chains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BuildStage {
    Setup,
    Diagnostic,
    Lifetime,
    TypeMapping,
    PreCreation,
    Creation,
    PostCreation,
}

impl Stage for BuildStage {}

/// Stages of the constructor and member selection chains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SelectionStage {
    /// Members pinned by the registration
    Explicit,
    /// Marker-based selection
    Attribute,
    /// Heuristic selection
    Reflection,
}

impl Stage for SelectionStage {}

/// Wraps the rest of the pipeline and returns the composed pipeline.
pub type AspectFactory<P> = Arc<dyn Fn(P) -> P + Send + Sync>;

/// Ordered collection of aspect factories composed into one pipeline.
///
/// # Examples
///
/// ```rust
/// use ferrous_container::pipeline::{BuildStage, StagedFactoryChain};
/// use std::sync::Arc;
///
/// type Step = Arc<dyn Fn(&mut Vec<&'static str>) + Send + Sync>;
///
/// let terminal: Step = Arc::new(|log: &mut Vec<&'static str>| log.push("create"));
/// let mut chain = StagedFactoryChain::new(terminal);
///
/// // Added out of order; the stage decides the nesting.
/// chain.add(BuildStage::TypeMapping, |next: Step| -> Step {
///     Arc::new(move |log: &mut Vec<&'static str>| { log.push("map"); next(log) })
/// });
/// chain.add(BuildStage::Lifetime, |next: Step| -> Step {
///     Arc::new(move |log: &mut Vec<&'static str>| { log.push("lifetime"); next(log) })
/// });
///
/// let mut log = Vec::new();
/// (chain.pipeline())(&mut log);
/// assert_eq!(log, ["lifetime", "map", "create"]);
/// ```
pub struct StagedFactoryChain<P, S> {
    entries: Vec<(AspectFactory<P>, S)>,
    terminal: P,
    built: OnceCell<P>,
}

impl<P, S> StagedFactoryChain<P, S>
where
    P: Clone,
    S: Stage,
{
    /// Empty chain whose composed pipeline ends in `terminal`.
    pub fn new(terminal: P) -> Self {
        Self {
            entries: Vec::new(),
            terminal,
            built: OnceCell::new(),
        }
    }

    /// Adds an aspect factory; entries of equal stage keep insertion order.
    pub fn add<F>(&mut self, stage: S, factory: F) -> &mut Self
    where
        F: Fn(P) -> P + Send + Sync + 'static,
    {
        let at = self.entries.partition_point(|(_, s)| *s <= stage);
        self.entries.insert(at, (Arc::new(factory), stage));
        self.invalidate();
        self
    }

    /// Removes every factory registered at `stage`, returning how many were removed.
    pub fn remove_stage(&mut self, stage: S) -> usize {
        let before = self.entries.len();
        self.entries.retain(|(_, s)| *s != stage);
        let removed = before - self.entries.len();
        if removed > 0 {
            self.invalidate();
        }
        removed
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.invalidate();
    }

    /// Stages in chain order (ascending).
    pub fn stages(&self) -> Vec<S> {
        self.entries.iter().map(|(_, s)| *s).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether a composed pipeline is currently cached.
    pub fn is_built(&self) -> bool {
        self.built.get().is_some()
    }

    /// Folds the chain into a fresh pipeline, ignoring the cache.
    pub fn build_pipeline(&self) -> P {
        self.entries
            .iter()
            .rev()
            .fold(self.terminal.clone(), |next, (factory, _)| factory(next))
    }

    /// The composed pipeline, built on first use and cached.
    pub fn pipeline(&self) -> P {
        self.built.get_or_init(|| self.build_pipeline()).clone()
    }

    /// Drops the cached pipeline; the next `pipeline()` call rebuilds it.
    pub fn invalidate(&mut self) {
        self.built = OnceCell::new();
    }
}

impl<P: Clone, S: Stage> Clone for StagedFactoryChain<P, S> {
    fn clone(&self) -> Self {
        Self {
            entries: self.entries.clone(),
            terminal: self.terminal.clone(),
            built: self.built.clone(),
        }
    }
}

impl<P, S: Stage> fmt::Debug for StagedFactoryChain<P, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StagedFactoryChain")
            .field("stages", &self.entries.iter().map(|(_, s)| s).collect::<Vec<_>>())
            .field("built", &self.built.get().is_some())
            .finish()
    }
}
