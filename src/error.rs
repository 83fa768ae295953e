//! Error types for the cache family
//!
//! Provides unified error handling using thiserror.

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for both cache kinds.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// A construction or operation parameter is outside its valid range
    #[error("{name} out of range: {reason}")]
    OutOfRange {
        /// Name of the offending parameter
        name: &'static str,
        /// What was wrong with it
        reason: String,
    },

    /// Key not present in the cache
    #[error("Key not found: {0}")]
    KeyNotFound(String),

    /// The cache has been disposed and no longer accepts mutations
    #[error("Cache has been disposed")]
    Disposed,

    /// The background timer runtime could not be started
    #[error("Timer runtime unavailable: {0}")]
    Runtime(String),

    /// A configuration value could not be interpreted
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl CacheError {
    pub(crate) fn out_of_range(name: &'static str, reason: impl Into<String>) -> Self {
        CacheError::OutOfRange {
            name,
            reason: reason.into(),
        }
    }
}

// == Result Type Alias ==
/// Convenience Result type for cache operations.
pub type Result<T> = std::result::Result<T, CacheError>;
