//! Shared types for the cache system

use serde::{Deserialize, Serialize};
use std::fmt;

/// Which tier answered a lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CacheTier {
    /// In-process memory tier
    Memory,

    /// Persistent disk tier
    Disk,
}

impl fmt::Display for CacheTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheTier::Memory => write!(f, "memory"),
            CacheTier::Disk => write!(f, "disk"),
        }
    }
}

/// How a single call through a cached function was answered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CallOutcome {
    /// Valid entry found; the tier says where it was found this call
    Hit(CacheTier),

    /// No entry for the signature; the function ran
    Miss,

    /// An entry existed but its freshness token no longer matched; the function ran
    Stale,
}

impl CallOutcome {
    pub fn is_hit(&self) -> bool {
        matches!(self, CallOutcome::Hit(_))
    }
}

impl fmt::Display for CallOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallOutcome::Hit(tier) => write!(f, "hit ({})", tier),
            CallOutcome::Miss => write!(f, "miss"),
            CallOutcome::Stale => write!(f, "stale"),
        }
    }
}

/// Counters for cache behavior
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Calls answered from a valid entry
    pub hits: u64,

    /// Calls that invoked the wrapped function (includes stale)
    pub misses: u64,

    /// Misses where an entry existed but its freshness token changed
    pub stale: u64,

    /// Entries loaded from the disk tier into memory
    pub disk_loads: u64,

    /// Records written to the disk tier
    pub disk_writes: u64,

    /// Disk reads or writes that failed and were recovered
    pub disk_errors: u64,

    /// Entries removed by explicit invalidation
    pub invalidations: u64,

    /// Number of entries currently in memory
    pub entries: usize,
}

impl CacheStats {
    /// Calculate cache hit rate as a percentage
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            (self.hits as f64 / total as f64) * 100.0
        }
    }

    /// Calculate miss rate as a percentage
    pub fn miss_rate(&self) -> f64 {
        100.0 - self.hit_rate()
    }

    /// Total number of calls observed
    pub fn calls(&self) -> u64 {
        self.hits + self.misses
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CacheStats {{ hits: {}, misses: {}, stale: {}, hit_rate: {:.2}%, entries: {}, disk_loads: {}, disk_writes: {}, disk_errors: {} }}",
            self.hits,
            self.misses,
            self.stale,
            self.hit_rate(),
            self.entries,
            self.disk_loads,
            self.disk_writes,
            self.disk_errors
        )
    }
}
