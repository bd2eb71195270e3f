//! Runtime configuration.
//!
//! A single struct captures the kernel's tunables, resolved once at
//! construction for zero-cost access afterwards. All fields have defaults
//! suitable for a small embedding.

/// Configuration for a `Runtime`.
///
/// # Example
///
/// ```ignore
/// use veld_runtime::{Runtime, RuntimeConfig};
///
/// let rt = Runtime::with_config(RuntimeConfig {
///     initial_root_capacity: 1024,
///     ..Default::default()
/// });
/// ```
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Initial capacity of the handle root set.
    ///
    /// Every wrapped handle is registered for tracing; sizing this to the
    /// expected live-object count avoids early reallocation.
    ///
    /// Default: 64
    pub initial_root_capacity: usize,

    /// Initial capacity of the string interner.
    ///
    /// Method and type names are interned on first use.
    ///
    /// Default: 256
    pub interner_capacity: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            initial_root_capacity: 64,
            interner_capacity: 256,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RuntimeConfig::default();
        assert_eq!(config.initial_root_capacity, 64);
        assert_eq!(config.interner_capacity, 256);
    }
}
