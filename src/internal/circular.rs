//! Circular dependency detection infrastructure.

use std::cell::RefCell;

use crate::config::ContainerOptions;
use crate::error::{DiError, DiResult};
use crate::key::Key;
use crate::provider::ScopeId;

// Thread-local resolution state for circular dependency detection
thread_local! {
    static RESOLUTION_STACK: RefCell<Vec<(ScopeId, Key)>> = const { RefCell::new(Vec::new()) };
}

/// Guard for managing the thread-local resolution stack.
///
/// Entering a key that is already being resolved by the same node on this
/// thread is a cycle. The path reported starts at the outermost resolution
/// and ends with the repeated key.
pub(crate) struct StackGuard {
    _private: (),
}

impl StackGuard {
    pub(crate) fn enter(scope: ScopeId, key: &Key, options: &ContainerOptions) -> DiResult<Self> {
        RESOLUTION_STACK.with(|stack| {
            let mut stack = stack.borrow_mut();

            // Circular detection BEFORE pushing the new key
            if options.detect_cycles && stack.iter().any(|(s, k)| *s == scope && k == key) {
                let mut path: Vec<String> = stack.iter().map(|(_, k)| k.to_string()).collect();
                path.push(key.to_string());
                return Err(DiError::Circular(path));
            }

            if stack.len() >= options.max_resolution_depth {
                return Err(DiError::DepthExceeded(stack.len()));
            }

            stack.push((scope, key.clone()));
            Ok(StackGuard { _private: () })
        })
    }
}

impl Drop for StackGuard {
    fn drop(&mut self) {
        RESOLUTION_STACK.with(|stack| {
            stack.borrow_mut().pop();
        });
    }
}

/// Current nesting depth on this thread.
#[cfg(test)]
pub(crate) fn depth() -> usize {
    RESOLUTION_STACK.with(|stack| stack.borrow().len())
}
