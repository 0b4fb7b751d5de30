//! Configuration for cached functions

use crate::cache::disk::DiskFormat;
use crate::error::{CacheError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration for a cached function
///
/// The defaults give plain in-memory memoization that hands out copies of
/// cached values. Setting `disk_cache_root` mirrors entries under
/// `<root>/func_cache/`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Return a copy of the cached value on every call instead of the shared
    /// stored instance
    pub copy_on_read: bool,

    /// Root directory of the disk tier; `None` disables it
    pub disk_cache_root: Option<PathBuf>,

    /// Encoding of the disk artifacts
    pub disk_format: DiskFormat,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            copy_on_read: true,
            disk_cache_root: None,
            disk_format: DiskFormat::default(),
        }
    }
}

impl CacheConfig {
    /// Create a new builder for cache configuration
    pub fn builder() -> CacheConfigBuilder {
        CacheConfigBuilder::default()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if let Some(root) = &self.disk_cache_root {
            if root.as_os_str().is_empty() {
                return Err(CacheError::Config(
                    "disk_cache_root must not be an empty path".to_string(),
                ));
            }
            if root.is_file() {
                return Err(CacheError::Config(format!(
                    "disk_cache_root {:?} is a file, expected a directory",
                    root
                )));
            }
        }

        Ok(())
    }

    /// Whether a disk tier is configured
    pub fn has_disk_tier(&self) -> bool {
        self.disk_cache_root.is_some()
    }
}

/// Preset configurations
impl CacheConfig {
    /// Memory tier only (the default)
    pub fn memory_only() -> Self {
        Self::default()
    }

    /// Memory tier mirrored to disk under `root`
    pub fn persistent(root: impl AsRef<Path>) -> Self {
        Self {
            disk_cache_root: Some(root.as_ref().to_path_buf()),
            ..Default::default()
        }
    }
}

/// Builder for cache configuration
#[derive(Debug, Default)]
pub struct CacheConfigBuilder {
    copy_on_read: Option<bool>,
    disk_cache_root: Option<PathBuf>,
    disk_format: Option<DiskFormat>,
}

impl CacheConfigBuilder {
    /// Enable or disable copy-on-read
    pub fn copy_on_read(mut self, enable: bool) -> Self {
        self.copy_on_read = Some(enable);
        self
    }

    /// Enable the disk tier rooted at `root`
    pub fn disk_cache_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.disk_cache_root = Some(root.into());
        self
    }

    /// Set the disk artifact encoding
    pub fn disk_format(mut self, format: DiskFormat) -> Self {
        self.disk_format = Some(format);
        self
    }

    /// Build the cache configuration
    pub fn build(self) -> CacheConfig {
        let defaults = CacheConfig::default();

        CacheConfig {
            copy_on_read: self.copy_on_read.unwrap_or(defaults.copy_on_read),
            disk_cache_root: self.disk_cache_root.or(defaults.disk_cache_root),
            disk_format: self.disk_format.unwrap_or(defaults.disk_format),
        }
    }
}
