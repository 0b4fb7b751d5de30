//! Error types for cache operations
//!
//! Only argument and freshness failures ever reach the caller of a cached
//! function. Disk-tier variants are produced internally and recovered as misses.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the cache layer
#[derive(Error, Debug)]
pub enum CacheError {
    /// Call arguments could not be canonically serialized into a signature
    #[error("Unserializable arguments: {0}")]
    UnserializableArguments(String),

    /// The freshness function failed to produce a token
    #[error("Freshness check failed: {0}")]
    Freshness(String),

    /// A disk artifact is missing or does not decode
    #[error("Corrupt disk record at {path:?}: {reason}")]
    DiskCorruption { path: PathBuf, reason: String },

    /// Filesystem error in the disk tier
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/Deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type alias for cache operations
pub type Result<T> = std::result::Result<T, CacheError>;

impl From<bincode::Error> for CacheError {
    fn from(e: bincode::Error) -> Self {
        CacheError::Serialization(e.to_string())
    }
}

impl From<serde_json::Error> for CacheError {
    fn from(e: serde_json::Error) -> Self {
        CacheError::Serialization(e.to_string())
    }
}
