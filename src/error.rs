//! Error types for the cache
//!
//! Cache operations never fail on their own; absence is reported through
//! `Option`/`bool`. These errors cover setup: configuration and spawning the
//! maintenance scheduler.

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for cache setup.
#[derive(Error, Debug)]
pub enum CacheError {
    /// An environment variable holds a value that cannot be used
    #[error("Invalid configuration: {name}={value:?} ({reason})")]
    InvalidConfig {
        name: &'static str,
        value: String,
        reason: String,
    },

    /// The maintenance thread could not be started
    #[error("Failed to spawn maintenance thread: {0}")]
    Spawn(#[from] std::io::Error),
}

// == Result Type Alias ==
/// Convenience Result type for the cache.
pub type Result<T> = std::result::Result<T, CacheError>;
