//! Freshness validation of cached entries

use crate::cache::entry::CacheEntry;
use serde::{Deserialize, Serialize};

/// Result of comparing a stored token against the current one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Validation {
    /// Tokens are equal; the entry may be served
    Fresh,

    /// Tokens differ; the entry must be recomputed
    Stale,
}

/// Decide whether `entry` was computed under `fresh_token`
pub fn is_valid<T: PartialEq, V>(entry: &CacheEntry<T, V>, fresh_token: &T) -> bool {
    entry.freshness_token == *fresh_token
}

pub fn check<T: PartialEq, V>(entry: &CacheEntry<T, V>, fresh_token: &T) -> Validation {
    if is_valid(entry, fresh_token) {
        Validation::Fresh
    } else {
        Validation::Stale
    }
}

/// Token produced when no freshness function is configured. Every entry
/// computed under it stays valid for good.
pub const CONSTANT_TOKEN: u64 = 0;
