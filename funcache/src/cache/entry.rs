//! Cache entries: a result paired with the freshness token it was computed under

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// A memoized result and the freshness token it is valid for
#[derive(Debug)]
pub struct CacheEntry<T, V> {
    /// Token the value was computed under
    pub freshness_token: T,

    /// The memoized result
    pub value: Arc<V>,

    /// Entry metadata
    pub metadata: EntryMetadata,
}

impl<T, V> CacheEntry<T, V> {
    /// Create a new entry from a freshly computed value
    pub fn new(freshness_token: T, value: V) -> Self {
        Self::from_shared(freshness_token, Arc::new(value))
    }

    /// Create a new entry around an already shared value
    pub fn from_shared(freshness_token: T, value: Arc<V>) -> Self {
        Self {
            freshness_token,
            value,
            metadata: EntryMetadata::new(EntrySource::Computed),
        }
    }

    pub(crate) fn loaded_from_disk(freshness_token: T, value: V) -> Self {
        Self {
            freshness_token,
            value: Arc::new(value),
            metadata: EntryMetadata::new(EntrySource::Disk),
        }
    }

    /// Record a hit against this entry
    pub fn mark_accessed(&mut self) {
        self.metadata.accessed_at = Utc::now();
        self.metadata.hits += 1;
    }
}

impl<T: Clone, V> Clone for CacheEntry<T, V> {
    // Clones share the value; only the token and metadata are copied.
    fn clone(&self) -> Self {
        Self {
            freshness_token: self.freshness_token.clone(),
            value: Arc::clone(&self.value),
            metadata: self.metadata.clone(),
        }
    }
}

/// Where an entry's value came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntrySource {
    /// Produced by invoking the wrapped function
    Computed,

    /// Read back from the disk tier
    Disk,
}

/// Metadata associated with a cache entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryMetadata {
    /// When the entry was created in memory
    pub created_at: DateTime<Utc>,

    /// Last time the entry served a hit
    pub accessed_at: DateTime<Utc>,

    /// Number of hits served
    pub hits: u64,

    pub source: EntrySource,
}

impl EntryMetadata {
    fn new(source: EntrySource) -> Self {
        let now = Utc::now();
        Self {
            created_at: now,
            accessed_at: now,
            hits: 0,
            source,
        }
    }

    /// Get the age of the entry
    pub fn age(&self) -> Duration {
        (Utc::now() - self.created_at)
            .to_std()
            .unwrap_or(Duration::from_secs(0))
    }

    /// Get time since the last hit, or since creation if there was none
    pub fn time_since_access(&self) -> Duration {
        (Utc::now() - self.accessed_at)
            .to_std()
            .unwrap_or(Duration::from_secs(0))
    }
}
