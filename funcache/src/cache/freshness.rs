//! Freshness functions
//!
//! A freshness function maps the call arguments to a token. The token is
//! recomputed on every call and compared with the one stored alongside the
//! cached value.

use crate::cache::validation::CONSTANT_TOKEN;
use crate::error::{CacheError, Result};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;

/// Shared freshness function over arguments of type `A`
pub type FreshnessFn<A, T> = Arc<dyn Fn(&A) -> Result<T> + Send + Sync>;

const CHUNK_SIZE: usize = 128 * 1024;

/// Freshness function that never changes its token
pub fn constant<A: ?Sized>(_args: &A) -> Result<u64> {
    Ok(CONSTANT_TOKEN)
}

/// SHA-256 hex digest of a file's contents, read in 128 KiB chunks
pub fn file_content_hash(path: impl AsRef<Path>) -> Result<String> {
    let path = path.as_ref();
    let mut file = File::open(path)
        .map_err(|e| CacheError::Freshness(format!("cannot open {:?}: {}", path, e)))?;

    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; CHUNK_SIZE];
    loop {
        let n = file
            .read(&mut buf)
            .map_err(|e| CacheError::Freshness(format!("cannot read {:?}: {}", path, e)))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }

    Ok(hex::encode(hasher.finalize()))
}
