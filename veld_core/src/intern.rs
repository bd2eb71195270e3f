//! String interning.
//!
//! Method names and type names are compared on every dispatch, so they are
//! interned once and compared by pointer afterwards. The interner is
//! explicitly owned state (held by the runtime's top-level context), not an
//! ambient global: two runtimes never share a string table.

use parking_lot::RwLock;
use rustc_hash::FxHashSet;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// An interned string.
///
/// Cheap to clone and to compare: equality first tries pointer identity
/// (which holds for any two strings interned by the same `Interner`) and
/// only then falls back to content comparison.
#[derive(Clone)]
pub struct InternedString(Arc<str>);

impl InternedString {
    /// View as a string slice.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Pointer identity with another interned string.
    #[inline]
    pub fn ptr_eq(&self, other: &InternedString) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl PartialEq for InternedString {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other) || self.0 == other.0
    }
}

impl Eq for InternedString {}

impl PartialEq<&str> for InternedString {
    #[inline]
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == *other
    }
}

impl Hash for InternedString {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.as_str().hash(state);
    }
}

impl fmt::Debug for InternedString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.as_str())
    }
}

impl fmt::Display for InternedString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Deduplicating string table.
pub struct Interner {
    strings: RwLock<FxHashSet<Arc<str>>>,
}

impl Interner {
    /// Create an empty interner.
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Create an interner with room for `capacity` strings.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            strings: RwLock::new(FxHashSet::with_capacity_and_hasher(
                capacity,
                Default::default(),
            )),
        }
    }

    /// Intern a string, returning the canonical copy.
    pub fn intern(&self, s: &str) -> InternedString {
        if let Some(hit) = self.strings.read().get(s) {
            return InternedString(hit.clone());
        }
        let mut strings = self.strings.write();
        // Re-check under the write lock: another thread may have won.
        if let Some(hit) = strings.get(s) {
            return InternedString(hit.clone());
        }
        let canonical: Arc<str> = Arc::from(s);
        strings.insert(canonical.clone());
        InternedString(canonical)
    }

    /// Number of distinct strings interned so far.
    pub fn len(&self) -> usize {
        self.strings.read().len()
    }

    /// Check if the interner is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for Interner {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intern_deduplicates() {
        let interner = Interner::new();
        let a = interner.intern("find_method");
        let b = interner.intern("find_method");
        assert!(a.ptr_eq(&b));
        assert_eq!(interner.len(), 1);
    }

    #[test]
    fn test_distinct_strings() {
        let interner = Interner::new();
        let a = interner.intern("alpha");
        let b = interner.intern("beta");
        assert!(!a.ptr_eq(&b));
        assert_ne!(a, b);
        assert_eq!(interner.len(), 2);
    }

    #[test]
    fn test_content_equality_across_interners() {
        // Different tables, same content: not pointer-equal, still equal.
        let left = Interner::new().intern("name");
        let right = Interner::new().intern("name");
        assert!(!left.ptr_eq(&right));
        assert_eq!(left, right);
        assert_eq!(left, "name");
    }
}
