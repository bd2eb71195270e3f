//! Registry of wrapped handles known to the collector.
//!
//! Every handle the runtime wraps is registered here with a weak
//! reference. The collector walks the set to trace live handles; entries
//! whose handle has been dropped are pruned during the walk. Holding weak
//! references means registration never extends an object's lifetime.

use crate::trace::{Trace, Tracer};
use parking_lot::RwLock;
use std::sync::Weak;

/// Weak set of traceable handles.
pub struct RootSet {
    roots: RwLock<Vec<Weak<dyn Trace + Send + Sync>>>,
}

impl RootSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Create a set with room for `capacity` handles.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            roots: RwLock::new(Vec::with_capacity(capacity)),
        }
    }

    /// Register a handle for tracing.
    pub fn register(&self, root: Weak<dyn Trace + Send + Sync>) {
        self.roots.write().push(root);
    }

    /// Trace every live handle, pruning dead entries.
    ///
    /// Returns the number of live handles visited.
    pub fn trace_all(&self, tracer: &mut dyn Tracer) -> usize {
        let mut roots = self.roots.write();
        let mut visited = 0;
        roots.retain(|weak| match weak.upgrade() {
            Some(root) => {
                root.trace(tracer);
                visited += 1;
                true
            }
            None => false,
        });
        visited
    }

    /// Number of registered entries, dead ones included.
    pub fn len(&self) -> usize {
        self.roots.read().len()
    }

    /// Check if the set is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for RootSet {
    fn default() -> Self {
        Self::new()
    }
}
