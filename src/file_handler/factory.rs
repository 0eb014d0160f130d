//! Backing-store selection for the viewport cache.
//!
//! Small files are read into memory; anything at or above the configured threshold is
//! memory-mapped so that multi-gigabyte files cost only the pages actually viewed.

use crate::config::IndexConfig;
use crate::error::{Result, RlsiftError};
use crate::file_handler::validation::validate_file_path;
use memmap2::Mmap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Random-access bytes of an opened file
#[derive(Debug)]
pub enum ByteSource {
    /// Content loaded entirely into memory (small files)
    InMemory(Vec<u8>),
    /// Content accessed via memory mapping (large files)
    MemoryMapped(Mmap),
}

impl ByteSource {
    /// Get the underlying bytes as a slice regardless of storage strategy
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            ByteSource::InMemory(vec) => vec.as_slice(),
            ByteSource::MemoryMapped(mmap) => &mmap[..],
        }
    }

    pub fn len(&self) -> u64 {
        self.as_bytes().len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.as_bytes().is_empty()
    }

    /// Bytes in `[start, end)`, clamped to the available data
    pub fn slice(&self, start: u64, end: u64) -> &[u8] {
        let bytes = self.as_bytes();
        let end = (end as usize).min(bytes.len());
        let start = (start as usize).min(end);
        &bytes[start..end]
    }

    pub fn is_memory_mapped(&self) -> bool {
        matches!(self, ByteSource::MemoryMapped(_))
    }
}

/// Factory for creating ByteSource instances
///
/// # Strategy Selection
/// - Files below `in_memory_threshold`: `ByteSource::InMemory`
/// - Everything else: `ByteSource::MemoryMapped`
pub struct ByteSourceFactory;

impl ByteSourceFactory {
    /// Validate `path` and open it with the strategy its size calls for
    pub fn create(path: &Path, config: &IndexConfig) -> Result<ByteSource> {
        validate_file_path(path)?;

        let file = File::open(path).map_err(|e| {
            RlsiftError::file_error(format!("Failed to open file: {}", path.display()), e)
        })?;
        let file_size = file
            .metadata()
            .map_err(|e| RlsiftError::file_error("Failed to get file metadata", e))?
            .len();

        // Empty files cannot be mapped on every platform
        if file_size < config.in_memory_threshold || file_size == 0 {
            Self::read_into_memory(file, file_size)
        } else {
            Self::map(&file, path)
        }
    }

    /// Bypass the size heuristic and force a strategy
    pub fn create_with_strategy(path: &Path, force_mmap: bool) -> Result<ByteSource> {
        validate_file_path(path)?;

        let file = File::open(path).map_err(|e| {
            RlsiftError::file_error(format!("Failed to open file: {}", path.display()), e)
        })?;
        let file_size = file
            .metadata()
            .map_err(|e| RlsiftError::file_error("Failed to get file metadata", e))?
            .len();

        if force_mmap && file_size > 0 {
            Self::map(&file, path)
        } else {
            Self::read_into_memory(file, file_size)
        }
    }

    fn read_into_memory(mut file: File, file_size: u64) -> Result<ByteSource> {
        let mut content = Vec::with_capacity(file_size as usize);
        file.read_to_end(&mut content)
            .map_err(|e| RlsiftError::file_error("Failed to read file", e))?;
        Ok(ByteSource::InMemory(content))
    }

    fn map(file: &File, path: &Path) -> Result<ByteSource> {
        // The file is opened read-only; truncation by another process is outside our control.
        let mmap = unsafe {
            Mmap::map(file).map_err(|e| {
                RlsiftError::memory_mapping(format!(
                    "Failed to memory map file {}: {}",
                    path.display(),
                    e
                ))
            })?
        };

        // Viewport access jumps around the file
        #[cfg(unix)]
        {
            if let Err(e) = mmap.advise(memmap2::Advice::Random) {
                log::warn!("Failed to set mmap advice: {}", e);
            }
        }

        Ok(ByteSource::MemoryMapped(mmap))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_test_file(content: &[u8]) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("Failed to create temp file");
        file.write_all(content).expect("Failed to write test data");
        file.flush().expect("Failed to flush test data");
        file
    }

    #[test]
    fn test_small_file_loaded_in_memory() {
        let file = create_test_file(b"line1\nline2\n");
        let source = ByteSourceFactory::create(file.path(), &IndexConfig::default()).unwrap();
        assert!(!source.is_memory_mapped());
        assert_eq!(source.as_bytes(), b"line1\nline2\n");
    }

    #[test]
    fn test_threshold_selects_mmap() {
        let file = create_test_file(b"line1\nline2\n");
        let config = IndexConfig {
            in_memory_threshold: 4,
            ..IndexConfig::default()
        };
        let source = ByteSourceFactory::create(file.path(), &config).unwrap();
        assert!(source.is_memory_mapped());
        assert_eq!(source.len(), 12);
    }

    #[test]
    fn test_strategies_agree() {
        let content = b"alpha\nbeta\ngamma";
        let file = create_test_file(content);
        let mapped = ByteSourceFactory::create_with_strategy(file.path(), true).unwrap();
        let loaded = ByteSourceFactory::create_with_strategy(file.path(), false).unwrap();
        assert_eq!(mapped.as_bytes(), loaded.as_bytes());
        assert_eq!(mapped.slice(6, 10), b"beta");
        assert_eq!(mapped.slice(11, 999), b"gamma");
    }

    #[test]
    fn test_empty_file_never_mapped() {
        let file = create_test_file(b"");
        let source = ByteSourceFactory::create_with_strategy(file.path(), true).unwrap();
        assert!(source.is_empty());
        assert!(!source.is_memory_mapped());
    }

    #[test]
    fn test_missing_file() {
        let result = ByteSourceFactory::create(
            Path::new("/this/file/does/not/exist.log"),
            &IndexConfig::default(),
        );
        assert!(matches!(result, Err(RlsiftError::FileNotFound { .. })));
    }
}
