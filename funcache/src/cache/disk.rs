//! Disk tier: persisted cache records
//!
//! A record is two files next to each other:
//!
//! ```text
//! <root>/func_cache/<namespace>/<function>/<args_hash>.result       value
//! <root>/func_cache/<namespace>/<function>/<args_hash>.hash_result  freshness token
//! ```
//!
//! The value is written first, the token second. A record whose token file is
//! missing or does not decode is incomplete and reads back as an error, which
//! the entry store turns into a miss.

use crate::cache::signature::CallSignature;
use crate::error::{CacheError, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

const CACHE_DIR: &str = "func_cache";

/// Encoding used for disk artifacts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiskFormat {
    /// Compact binary encoding
    #[default]
    Bincode,

    /// Human-readable JSON
    Json,
}

impl DiskFormat {
    pub fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>> {
        match self {
            DiskFormat::Bincode => Ok(bincode::serialize(value)?),
            DiskFormat::Json => Ok(serde_json::to_vec(value)?),
        }
    }

    pub fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T> {
        match self {
            DiskFormat::Bincode => Ok(bincode::deserialize(bytes)?),
            DiskFormat::Json => Ok(serde_json::from_slice(bytes)?),
        }
    }
}

/// The two files making up a disk record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    /// The memoized value
    Value,

    /// The freshness token
    Token,
}

impl ArtifactKind {
    pub fn extension(&self) -> &'static str {
        match self {
            ArtifactKind::Value => "result",
            ArtifactKind::Token => "hash_result",
        }
    }
}

/// Persistent mirror of cache entries rooted at a directory
#[derive(Debug, Clone)]
pub struct DiskTier {
    root: PathBuf,
    format: DiskFormat,
}

impl DiskTier {
    pub fn new(root: impl Into<PathBuf>, format: DiskFormat) -> Self {
        Self {
            root: root.into(),
            format,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn format(&self) -> DiskFormat {
        self.format
    }

    /// Location of one artifact of the record for `signature`
    pub fn cache_path(&self, signature: &CallSignature, kind: ArtifactKind) -> PathBuf {
        self.root
            .join(CACHE_DIR)
            .join(signature.function.namespace_dir())
            .join(&signature.function.name)
            .join(format!("{}.{}", signature.args_hash, kind.extension()))
    }

    /// Whether a record exists for `signature`.
    ///
    /// Presence of the value artifact is what counts, so an incomplete record
    /// still blocks later writes.
    pub fn has_record(&self, signature: &CallSignature) -> bool {
        self.cache_path(signature, ArtifactKind::Value).is_file()
    }

    /// Write both artifacts, value first. Parent directories are created as needed.
    pub fn write<T, V>(&self, signature: &CallSignature, token: &T, value: &V) -> Result<()>
    where
        T: Serialize + ?Sized,
        V: Serialize + ?Sized,
    {
        let value_bytes = self.format.encode(value)?;
        let token_bytes = self.format.encode(token)?;

        let value_path = self.cache_path(signature, ArtifactKind::Value);
        if let Some(parent) = value_path.parent() {
            fs::create_dir_all(parent)?;
        }

        fs::write(&value_path, value_bytes)?;
        fs::write(self.cache_path(signature, ArtifactKind::Token), token_bytes)?;

        debug!("Wrote disk record: {:?}", value_path);
        Ok(())
    }

    /// Read the record for `signature`.
    ///
    /// `Ok(None)` when no value artifact exists. An existing record that cannot
    /// be fully read or decoded is [`CacheError::DiskCorruption`].
    pub fn read<T, V>(&self, signature: &CallSignature) -> Result<Option<(T, V)>>
    where
        T: DeserializeOwned,
        V: DeserializeOwned,
    {
        if !self.has_record(signature) {
            return Ok(None);
        }

        let token = self.read_artifact(&self.cache_path(signature, ArtifactKind::Token))?;
        let value = self.read_artifact(&self.cache_path(signature, ArtifactKind::Value))?;

        Ok(Some((token, value)))
    }

    fn read_artifact<X: DeserializeOwned>(&self, path: &Path) -> Result<X> {
        let bytes = fs::read(path).map_err(|e| CacheError::DiskCorruption {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        self.format
            .decode(&bytes)
            .map_err(|e| CacheError::DiskCorruption {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })
    }
}
