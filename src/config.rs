//! Tunable knobs for indexing, the viewport cache and the search engine.
//!
//! Every struct has sensible defaults so the library works without any configuration.
//! With the `config` feature enabled the whole tree can be loaded from a TOML file,
//! where any missing key falls back to its default.

#[cfg(feature = "config")]
use crate::error::{Result, RlsiftError};
#[cfg(feature = "config")]
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Top-level configuration for a viewing/search session.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "config", derive(serde::Deserialize))]
#[cfg_attr(feature = "config", serde(default))]
pub struct ViewerConfig {
    pub index: IndexConfig,
    pub cache: CacheConfig,
    pub search: SearchConfig,
}

/// Line index construction settings.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "config", derive(serde::Deserialize))]
#[cfg_attr(feature = "config", serde(default))]
pub struct IndexConfig {
    /// Bytes read per scan block
    pub block_size: usize,
    /// Emit a progress report each time this many more lines are indexed
    pub progress_interval: u64,
    /// Files below this size are read fully into memory instead of memory-mapped
    pub in_memory_threshold: u64,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            block_size: 1024 * 1024,
            progress_interval: 10_000,
            in_memory_threshold: 50 * 1024 * 1024,
        }
    }
}

/// Viewport line cache settings.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "config", derive(serde::Deserialize))]
#[cfg_attr(feature = "config", serde(default))]
pub struct CacheConfig {
    /// Maximum number of decoded lines held at once
    pub max_size: usize,
    /// Lines either side of the window that survive eviction
    pub margin: u64,
    /// Lines either side of the window fetched by a preload
    pub preload_margin: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_size: 1000,
            margin: 100,
            preload_margin: 50,
        }
    }
}

/// Search engine and chunk planning settings.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "config", derive(serde::Deserialize))]
#[cfg_attr(feature = "config", serde(default))]
pub struct SearchConfig {
    /// Worker pool size; clamped to `[1, MAX_WORKERS]`
    pub workers: usize,
    /// Smallest chunk handed to a worker, in lines
    pub min_chunk: u64,
    /// Largest chunk handed to a worker, in lines
    pub max_chunk: u64,
    /// Files with fewer lines than this are searched as a single chunk
    pub small_file_threshold: u64,
    /// Minimum spacing between progress events, in milliseconds
    pub progress_throttle_ms: u64,
    /// Lines scanned between cancellation and cap checks
    pub check_interval: u64,
}

/// Upper bound on search workers; more would oversubscribe the disk.
pub const MAX_WORKERS: usize = 8;

impl SearchConfig {
    pub fn progress_throttle(&self) -> Duration {
        Duration::from_millis(self.progress_throttle_ms)
    }

    /// Worker count clamped to what the pool accepts
    pub fn effective_workers(&self) -> usize {
        self.workers.clamp(1, MAX_WORKERS)
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        let parallelism = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4);
        Self {
            workers: parallelism.min(MAX_WORKERS),
            min_chunk: 1000,
            max_chunk: 250_000,
            small_file_threshold: 5000,
            progress_throttle_ms: 100,
            check_interval: 256,
        }
    }
}

#[cfg(feature = "config")]
impl ViewerConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            RlsiftError::file_error(format!("Failed to read config: {}", path.display()), e)
        })?;
        toml::from_str(&text).map_err(|e| RlsiftError::config(e.to_string()))
    }

    /// `<config_dir>/rlsift/config.toml`, if the platform has a config directory
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("rlsift").join("config.toml"))
    }

    /// Load from the default location, falling back to defaults when absent
    pub fn load_or_default() -> Result<Self> {
        match Self::default_path() {
            Some(path) if path.exists() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ViewerConfig::default();
        assert_eq!(config.index.block_size, 1024 * 1024);
        assert_eq!(config.index.progress_interval, 10_000);
        assert_eq!(config.cache.max_size, 1000);
        assert_eq!(config.cache.margin, 100);
        assert!(config.search.workers >= 1);
        assert!(config.search.workers <= MAX_WORKERS);
        assert_eq!(config.search.progress_throttle(), Duration::from_millis(100));
    }

    #[test]
    fn test_effective_workers_clamped() {
        let mut search = SearchConfig::default();
        search.workers = 0;
        assert_eq!(search.effective_workers(), 1);
        search.workers = 64;
        assert_eq!(search.effective_workers(), MAX_WORKERS);
    }

    #[cfg(feature = "config")]
    #[test]
    fn test_load_partial_toml() {
        use std::io::Write;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[cache]\nmax_size = 42\n\n[search]\nworkers = 2").unwrap();
        file.flush().unwrap();

        let config = ViewerConfig::load(file.path()).unwrap();
        assert_eq!(config.cache.max_size, 42);
        assert_eq!(config.cache.margin, 100);
        assert_eq!(config.search.workers, 2);
        assert_eq!(config.index, IndexConfig::default());
    }

    #[cfg(feature = "config")]
    #[test]
    fn test_load_rejects_bad_toml() {
        use std::io::Write;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[cache]\nmax_size = \"lots\"").unwrap();
        file.flush().unwrap();

        assert!(matches!(
            ViewerConfig::load(file.path()),
            Err(RlsiftError::ConfigError { .. })
        ));
    }
}
