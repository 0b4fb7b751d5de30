//! # funcache
//!
//! Transparent memoization with freshness checks.
//!
//! A cached function is called like the original. Behind it sit an in-process
//! memory tier and, optionally, a disk tier. Every entry stores the freshness
//! token it was computed under, and a cached value is only reused when the
//! token recomputed for the current call matches. This makes it safe to cache
//! computations whose result depends on more than their argument values, such
//! as the contents of a file named by a path argument.
//!
//! ## Plain memoization
//!
//! With the default policy the freshness token is constant, so every result is
//! kept for the life of the [`CachedFn`].
//!
//! ```rust
//! use funcache::{function_identity, CachePolicy, CachedFn};
//!
//! # fn main() -> funcache::Result<()> {
//! let square = CachedFn::new(
//!     function_identity!(square),
//!     CachePolicy::<u64>::default(),
//!     |x: &u64| x * x,
//! )?;
//!
//! assert_eq!(*square.call(&12)?, 144);
//! # Ok(())
//! # }
//! ```
//!
//! ## File-backed freshness
//!
//! [`CachePolicy::for_path`] hashes the file named by the argument on every
//! call, so editing the file invalidates the cached result.
//!
//! ```rust
//! use funcache::{function_identity, CacheConfig, CachePolicy, CachedFn};
//! use std::path::PathBuf;
//!
//! # fn main() -> anyhow::Result<()> {
//! let dir = tempfile::tempdir()?;
//! let path = dir.path().join("numbers.txt");
//! std::fs::write(&path, "1\n2\n3\n4")?;
//!
//! let sum_lines = CachedFn::new_fallible(
//!     function_identity!(sum_lines),
//!     CachePolicy::<PathBuf, String>::for_path(CacheConfig::default()),
//!     |path: &PathBuf| -> anyhow::Result<i64> {
//!         let text = std::fs::read_to_string(path)?;
//!         Ok(text.lines().map(|l| l.trim().parse::<i64>()).sum::<Result<i64, _>>()?)
//!     },
//! )?;
//!
//! assert_eq!(*sum_lines.try_call(&path)?, 10);
//!
//! std::fs::write(&path, "10\n20\n30\n40")?;
//! assert_eq!(*sum_lines.try_call(&path)?, 100);
//! # Ok(())
//! # }
//! ```
//!
//! ## Disk tier
//!
//! Setting a disk root persists each first result under
//! `<root>/func_cache/<module>/<function>/<args_hash>.result` with the token
//! beside it in `.hash_result`. A new process with an empty memory tier picks
//! those records up again. Records are written once and never refreshed.

pub mod cache;
pub mod error;

// Re-export main types for convenience
pub use cache::{
    file_content_hash, CacheConfig, CacheConfigBuilder, CacheEntry, CachePolicy, CacheStats,
    CacheTier, CachedFn, CallOutcome, CallSignature, DiskFormat, DiskTier, EntryMetadata,
    EntryStore, FunctionIdentity, SignatureBuilder,
};
pub use error::{CacheError, Result};
