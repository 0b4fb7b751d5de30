//! Entry store: the memory tier and its optional disk mirror

use crate::cache::{
    config::CacheConfig,
    disk::DiskTier,
    entry::{CacheEntry, EntryMetadata},
    signature::CallSignature,
    types::{CacheStats, CallOutcome},
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info, warn};

/// Per-signature storage of the latest entry
///
/// This implementation provides:
/// - One slot per signature; a new entry replaces the old one
/// - Thread-safe access via `RwLock`, never held across a computation
/// - Write-once mirroring to a [`DiskTier`] when configured
/// - Recovery of unreadable disk records as plain misses
pub struct EntryStore<T, V> {
    /// Internal storage
    store: RwLock<MemoryTier<T, V>>,

    /// Persistent mirror
    disk: Option<DiskTier>,
}

struct MemoryTier<T, V> {
    entries: HashMap<CallSignature, CacheEntry<T, V>>,
    stats: CacheStats,
}

impl<T, V> EntryStore<T, V>
where
    T: Clone + Serialize + DeserializeOwned,
    V: Serialize + DeserializeOwned,
{
    pub fn new(disk: Option<DiskTier>) -> Self {
        match &disk {
            Some(tier) => info!("Initializing entry store with disk tier at {:?}", tier.root()),
            None => debug!("Initializing memory-only entry store"),
        }

        Self {
            store: RwLock::new(MemoryTier {
                entries: HashMap::new(),
                stats: CacheStats::default(),
            }),
            disk,
        }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        let disk = config
            .disk_cache_root
            .as_ref()
            .map(|root| DiskTier::new(root, config.disk_format));
        Self::new(disk)
    }

    pub fn disk(&self) -> Option<&DiskTier> {
        self.disk.as_ref()
    }

    /// Memory-tier lookup. The returned entry shares its value with the store.
    pub fn get(&self, signature: &CallSignature) -> Option<CacheEntry<T, V>> {
        self.read().entries.get(signature).cloned()
    }

    /// Store `entry` in memory, replacing any previous one, and mirror it to
    /// disk if no disk record exists for `signature` yet.
    pub fn put(&self, signature: &CallSignature, entry: CacheEntry<T, V>) {
        let token = entry.freshness_token.clone();
        let value = Arc::clone(&entry.value);

        {
            let mut store = self.write();
            if store.entries.insert(signature.clone(), entry).is_some() {
                debug!("Replaced cache entry: {}", signature);
            } else {
                debug!("Inserted cache entry: {}", signature);
            }
        }

        let Some(disk) = &self.disk else {
            return;
        };
        if disk.has_record(signature) {
            return;
        }

        match disk.write(signature, &token, &*value) {
            Ok(()) => self.write().stats.disk_writes += 1,
            Err(e) => {
                warn!("Failed to persist cache entry {}: {}", signature, e);
                self.write().stats.disk_errors += 1;
            }
        }
    }

    /// Warm the memory tier from disk.
    ///
    /// Returns the loaded entry when memory had nothing for `signature` and a
    /// complete disk record was read. Missing, partial and corrupt records all
    /// yield `None`.
    pub fn load_from_disk_if_absent(&self, signature: &CallSignature) -> Option<CacheEntry<T, V>> {
        let disk = self.disk.as_ref()?;
        if self.contains(signature) {
            return None;
        }

        match disk.read::<T, V>(signature) {
            Ok(Some((token, value))) => {
                let mut store = self.write();
                if store.entries.contains_key(signature) {
                    return None;
                }
                let entry = CacheEntry::loaded_from_disk(token, value);
                store.entries.insert(signature.clone(), entry.clone());
                store.stats.disk_loads += 1;
                debug!("Loaded cache entry from disk: {}", signature);
                Some(entry)
            }
            Ok(None) => None,
            Err(e) => {
                warn!("Ignoring unreadable disk record for {}: {}", signature, e);
                self.write().stats.disk_errors += 1;
                None
            }
        }
    }

    /// Count a call outcome; hits also update the entry's access metadata
    pub fn record(&self, signature: &CallSignature, outcome: CallOutcome) {
        let mut store = self.write();
        match outcome {
            CallOutcome::Hit(_) => {
                store.stats.hits += 1;
                if let Some(entry) = store.entries.get_mut(signature) {
                    entry.mark_accessed();
                }
            }
            CallOutcome::Miss => store.stats.misses += 1,
            CallOutcome::Stale => {
                store.stats.misses += 1;
                store.stats.stale += 1;
            }
        }
    }

    /// Drop the memory entry for `signature`. The disk record is left alone.
    pub fn invalidate(&self, signature: &CallSignature) -> bool {
        let mut store = self.write();
        let removed = store.entries.remove(signature).is_some();
        if removed {
            store.stats.invalidations += 1;
            debug!("Invalidated cache entry: {}", signature);
        }
        removed
    }

    /// Clear all entries from the memory tier
    pub fn clear(&self) {
        let mut store = self.write();
        let count = store.entries.len();
        store.entries.clear();
        store.stats.invalidations += count as u64;

        info!("Cleared {} entries from cache", count);
    }

    /// Metadata of the memory entry for `signature`
    pub fn metadata(&self, signature: &CallSignature) -> Option<EntryMetadata> {
        self.read().entries.get(signature).map(|entry| entry.metadata.clone())
    }

    pub fn contains(&self, signature: &CallSignature) -> bool {
        self.read().entries.contains_key(signature)
    }

    pub fn len(&self) -> usize {
        self.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().entries.is_empty()
    }

    /// Get cache statistics
    pub fn stats(&self) -> CacheStats {
        let store = self.read();
        CacheStats {
            entries: store.entries.len(),
            ..store.stats.clone()
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, MemoryTier<T, V>> {
        self.store.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, MemoryTier<T, V>> {
        self.store.write().unwrap_or_else(PoisonError::into_inner)
    }
}
