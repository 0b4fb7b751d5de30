//! Cached function wrapper
//!
//! [`CachedFn`] owns a function, a [`CachePolicy`] and an [`EntryStore`]. Every
//! call runs the same protocol:
//!
//! 1. compute the freshness token from the call arguments
//! 2. derive the call signature
//! 3. warm the memory tier from disk if the signature is not in memory
//! 4. serve the stored value if its token equals the fresh one
//! 5. otherwise run the function and store `{token, value}`
//!
//! Errors from the function are returned as-is and nothing is stored for
//! that call.

use crate::cache::{
    config::CacheConfig,
    entry::{CacheEntry, EntryMetadata},
    freshness::{self, FreshnessFn},
    signature::{CallSignature, FunctionIdentity, SignatureBuilder},
    store::EntryStore,
    types::{CacheStats, CacheTier, CallOutcome},
    validation::{self, Validation},
};
use crate::error::{CacheError, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// How a function is cached: configuration plus the freshness function
pub struct CachePolicy<A: ?Sized, T = u64> {
    config: CacheConfig,
    freshness: FreshnessFn<A, T>,
}

impl<A: ?Sized + 'static> CachePolicy<A, u64> {
    /// Policy with a constant freshness token (plain memoization)
    pub fn new(config: CacheConfig) -> Self {
        Self {
            config,
            freshness: Arc::new(|args: &A| freshness::constant(args)),
        }
    }
}

impl<A: ?Sized + 'static> Default for CachePolicy<A, u64> {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}

impl<A: ?Sized + 'static> CachePolicy<A, String> {
    /// Policy whose token is the content hash of the file at `project(args)`
    pub fn file_content<F>(config: CacheConfig, project: F) -> Self
    where
        F: Fn(&A) -> &Path + Send + Sync + 'static,
    {
        Self {
            config,
            freshness: Arc::new(move |args: &A| freshness::file_content_hash(project(args))),
        }
    }
}

impl<A: AsRef<Path> + ?Sized + 'static> CachePolicy<A, String> {
    /// Policy for functions whose argument is itself a path
    pub fn for_path(config: CacheConfig) -> Self {
        Self::file_content(config, |args: &A| args.as_ref())
    }
}

impl<A: ?Sized, T> CachePolicy<A, T> {
    /// Replace the freshness function
    pub fn with_freshness<U, F>(self, freshness: F) -> CachePolicy<A, U>
    where
        F: Fn(&A) -> Result<U> + Send + Sync + 'static,
    {
        CachePolicy {
            config: self.config,
            freshness: Arc::new(freshness),
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn freshness_token(&self, args: &A) -> Result<T> {
        (self.freshness)(args)
    }
}

/// What the lookup phase decided for one call
enum Lookup<T, V> {
    Hit(Arc<V>, CallOutcome),
    Compute(PendingEntry<T>),
}

struct PendingEntry<T> {
    signature: CallSignature,
    token: T,
    outcome: CallOutcome,
}

/// A function wrapped with a validity-checked two-tier cache
pub struct CachedFn<A: ?Sized, V, T, F> {
    identity: FunctionIdentity,
    policy: CachePolicy<A, T>,
    store: EntryStore<T, V>,
    func: F,
}

impl<A, V, T, F> CachedFn<A, V, T, F>
where
    A: Serialize + ?Sized,
    V: Clone + Serialize + DeserializeOwned,
    T: Clone + PartialEq + Serialize + DeserializeOwned,
{
    /// Wrap an infallible function. Fails only if the policy's configuration
    /// is invalid.
    pub fn new(identity: FunctionIdentity, policy: CachePolicy<A, T>, func: F) -> Result<Self>
    where
        F: Fn(&A) -> V,
    {
        Self::assemble(identity, policy, func)
    }

    /// Wrap a function returning `Result<V, E>`, called through
    /// [`try_call`](Self::try_call)
    pub fn new_fallible<E>(identity: FunctionIdentity, policy: CachePolicy<A, T>, func: F) -> Result<Self>
    where
        F: Fn(&A) -> std::result::Result<V, E>,
    {
        Self::assemble(identity, policy, func)
    }

    /// Wrap an async function, called through [`call_async`](Self::call_async)
    pub fn new_async<E, Fut>(identity: FunctionIdentity, policy: CachePolicy<A, T>, func: F) -> Result<Self>
    where
        F: Fn(&A) -> Fut,
        Fut: Future<Output = std::result::Result<V, E>>,
    {
        Self::assemble(identity, policy, func)
    }

    fn assemble(identity: FunctionIdentity, policy: CachePolicy<A, T>, func: F) -> Result<Self> {
        policy.config.validate()?;
        let store = EntryStore::from_config(&policy.config);
        debug!("Caching {} (copy_on_read: {})", identity, policy.config.copy_on_read);

        Ok(Self {
            identity,
            policy,
            store,
            func,
        })
    }

    /// Call an infallible function through the cache
    pub fn call(&self, args: &A) -> Result<Arc<V>>
    where
        F: Fn(&A) -> V,
    {
        self.call_with_outcome(args).map(|(value, _)| value)
    }

    /// Like [`call`](Self::call), also reporting how the call was answered
    pub fn call_with_outcome(&self, args: &A) -> Result<(Arc<V>, CallOutcome)>
    where
        F: Fn(&A) -> V,
    {
        match self.lookup(args)? {
            Lookup::Hit(value, outcome) => Ok((value, outcome)),
            Lookup::Compute(pending) => {
                let outcome = pending.outcome;
                let value = (self.func)(args);
                Ok((self.store_result(pending, value), outcome))
            }
        }
    }

    /// Call a fallible function through the cache. The function's error is
    /// returned unchanged and nothing is cached for the call.
    pub fn try_call<E>(&self, args: &A) -> std::result::Result<Arc<V>, E>
    where
        F: Fn(&A) -> std::result::Result<V, E>,
        E: From<CacheError>,
    {
        self.try_call_with_outcome(args).map(|(value, _)| value)
    }

    pub fn try_call_with_outcome<E>(&self, args: &A) -> std::result::Result<(Arc<V>, CallOutcome), E>
    where
        F: Fn(&A) -> std::result::Result<V, E>,
        E: From<CacheError>,
    {
        match self.lookup(args)? {
            Lookup::Hit(value, outcome) => Ok((value, outcome)),
            Lookup::Compute(pending) => {
                let outcome = pending.outcome;
                let value = (self.func)(args)?;
                Ok((self.store_result(pending, value), outcome))
            }
        }
    }

    /// Call an async function through the cache. No lock is held while the
    /// future runs, so concurrent calls for the same signature may both compute.
    pub async fn call_async<E, Fut>(&self, args: &A) -> std::result::Result<Arc<V>, E>
    where
        F: Fn(&A) -> Fut,
        Fut: Future<Output = std::result::Result<V, E>>,
        E: From<CacheError>,
    {
        match self.lookup(args)? {
            Lookup::Hit(value, _) => Ok(value),
            Lookup::Compute(pending) => {
                let value = (self.func)(args).await?;
                Ok(self.store_result(pending, value))
            }
        }
    }

    /// Signature a call with `args` is cached under
    pub fn signature(&self, args: &A) -> Result<CallSignature> {
        SignatureBuilder::from_args(&self.identity, args)
    }

    /// Forget the in-memory entry for `args`
    pub fn invalidate(&self, args: &A) -> Result<bool> {
        let signature = self.signature(args)?;
        Ok(self.store.invalidate(&signature))
    }

    /// Metadata of the in-memory entry for `args`, if there is one
    pub fn entry_metadata(&self, args: &A) -> Result<Option<EntryMetadata>> {
        let signature = self.signature(args)?;
        Ok(self.store.metadata(&signature))
    }

    /// Forget every in-memory entry
    pub fn clear(&self) {
        self.store.clear();
    }

    pub fn stats(&self) -> CacheStats {
        self.store.stats()
    }

    pub fn identity(&self) -> &FunctionIdentity {
        &self.identity
    }

    pub fn policy(&self) -> &CachePolicy<A, T> {
        &self.policy
    }

    pub fn store(&self) -> &EntryStore<T, V> {
        &self.store
    }

    fn lookup(&self, args: &A) -> Result<Lookup<T, V>> {
        let token = self.policy.freshness_token(args)?;
        let signature = SignatureBuilder::from_args(&self.identity, args)?;

        let tier = match self.store.load_from_disk_if_absent(&signature) {
            Some(_) => CacheTier::Disk,
            None => CacheTier::Memory,
        };

        let outcome = match self.store.get(&signature) {
            Some(entry) => match validation::check(&entry, &token) {
                Validation::Fresh => {
                    let outcome = CallOutcome::Hit(tier);
                    self.store.record(&signature, outcome);
                    debug!(
                        "Cache hit ({}): {} (age {:?})",
                        tier,
                        signature,
                        entry.metadata.age()
                    );
                    return Ok(Lookup::Hit(self.hand_out(&entry.value), outcome));
                }
                Validation::Stale => CallOutcome::Stale,
            },
            None => CallOutcome::Miss,
        };

        self.store.record(&signature, outcome);
        debug!("Cache {}: {}", outcome, signature);

        Ok(Lookup::Compute(PendingEntry {
            signature,
            token,
            outcome,
        }))
    }

    fn store_result(&self, pending: PendingEntry<T>, value: V) -> Arc<V> {
        let entry = CacheEntry::new(pending.token, value);
        let shared = Arc::clone(&entry.value);
        self.store.put(&pending.signature, entry);
        self.hand_out(&shared)
    }

    fn hand_out(&self, value: &Arc<V>) -> Arc<V> {
        if self.policy.config.copy_on_read {
            Arc::new(V::clone(value))
        } else {
            Arc::clone(value)
        }
    }
}
