//! # Validity-Checked Function Cache
//!
//! Memoizes a function behind a memory tier and an optional disk tier. Each
//! entry remembers the freshness token it was computed under; a stored value is
//! only served while the token recomputed for the current call is equal.
//!
//! ## Features
//!
//! - **Deterministic signatures**: function identity plus canonical, key-sorted
//!   arguments, hashed with SHA-256
//! - **Freshness tokens**: any `PartialEq + serde` value derived from the call
//!   arguments, e.g. the content hash of an input file
//! - **Disk tier**: write-once records under `<root>/func_cache/`, loaded back
//!   on a cold start
//! - **Corruption tolerance**: partial or undecodable records are misses
//! - **Copy-on-read**: callers get their own copy of cached values by default
//!
//! ## Example
//!
//! ```rust
//! use funcache::{function_identity, CacheConfig, CachePolicy, CachedFn};
//!
//! # fn example() -> funcache::Result<()> {
//! let policy = CachePolicy::<(u64, u64)>::new(CacheConfig::default());
//! let add = CachedFn::new(function_identity!(add), policy, |(a, b): &(u64, u64)| a + b)?;
//!
//! assert_eq!(*add.call(&(2, 3))?, 5);
//! assert_eq!(*add.call(&(2, 3))?, 5); // served from memory
//! assert_eq!(add.stats().hits, 1);
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```

mod canonical;
pub mod config;
pub mod disk;
pub mod entry;
pub mod freshness;
pub mod signature;
pub mod store;
pub mod types;
pub mod validation;
pub mod wrapper;

pub use config::{CacheConfig, CacheConfigBuilder};
pub use disk::{ArtifactKind, DiskFormat, DiskTier};
pub use entry::{CacheEntry, EntryMetadata, EntrySource};
pub use freshness::{file_content_hash, FreshnessFn};
pub use signature::{CallSignature, FunctionIdentity, SignatureBuilder};
pub use store::EntryStore;
pub use types::{CacheStats, CacheTier, CallOutcome};
pub use validation::{is_valid, Validation};
pub use wrapper::{CachePolicy, CachedFn};
