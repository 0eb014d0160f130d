//! Session layer
//!
//! A [`Session`] wires the components for one opened file: it owns the line index, the
//! backing bytes, the viewport cache, the result store and the search engine, and hands
//! out references to them. It holds no presentation state of its own.

use crate::config::ViewerConfig;
use crate::error::Result;
use crate::export::{export_results, ExportReport};
use crate::file_handler::{
    spawn_indexing, validate_file_path, ByteSource, ByteSourceFactory, FileLineSource, LineCache,
    LineIndex, LineSource, TextDecoder,
};
use crate::search::{ResultStore, SearchCriteria, SearchEngine, SearchHandle};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Everything needed to view and search one file
pub struct Session {
    path: PathBuf,
    config: ViewerConfig,
    index: Arc<LineIndex>,
    bytes: Arc<ByteSource>,
    decoder: TextDecoder,
    cache: Arc<LineCache>,
    results: Arc<ResultStore>,
    engine: SearchEngine,
}

impl Session {
    /// Open `path`, indexing it on the current thread
    pub fn open(path: impl AsRef<Path>, config: &ViewerConfig) -> Result<Self> {
        let path = path.as_ref();
        validate_file_path(path)?;
        let index = LineIndex::build_from_path(path, &config.index, None, |_| {})?;
        Self::assemble(path, config, index)
    }

    /// Open `path` with indexing on the blocking pool
    pub async fn open_async(path: impl AsRef<Path>, config: &ViewerConfig) -> Result<Self> {
        let path = path.as_ref();
        validate_file_path(path)?;
        let index = spawn_indexing(path, config.index.clone()).wait().await?;
        Self::assemble(path, config, index)
    }

    fn assemble(path: &Path, config: &ViewerConfig, index: LineIndex) -> Result<Self> {
        let bytes = Arc::new(ByteSourceFactory::create(path, &config.index)?);
        if bytes.len() != index.file_size() {
            log::warn!(
                "{} changed size while opening ({} indexed, {} mapped)",
                path.display(),
                index.file_size(),
                bytes.len()
            );
        }

        let decoder = TextDecoder::detect(bytes.as_bytes());
        let index = Arc::new(index);
        let cache = Arc::new(LineCache::new(
            Arc::clone(&bytes),
            Arc::clone(&index),
            decoder.clone(),
            config.cache.clone(),
        ));
        let results = Arc::new(ResultStore::new());
        let source: Arc<dyn LineSource> = Arc::new(FileLineSource::new(path, Arc::clone(&index)));
        let engine = SearchEngine::new(
            Arc::clone(&index),
            source,
            decoder.clone(),
            Arc::clone(&results),
            config.search.clone(),
        );

        log::info!(
            "opened {}: {} lines, {} bytes, {}, {}",
            path.display(),
            index.total_lines(),
            index.file_size(),
            decoder.encoding_name(),
            if bytes.is_memory_mapped() {
                "memory-mapped"
            } else {
                "in memory"
            }
        );

        Ok(Self {
            path: path.to_path_buf(),
            config: config.clone(),
            index,
            bytes,
            decoder,
            cache,
            results,
            engine,
        })
    }

    /// Stop any search, drop cached lines and release the file
    pub async fn close(self) {
        self.engine.shutdown().await;
        self.cache.invalidate();
        self.results.clear();
        log::debug!("closed {}", self.path.display());
    }

    /// Start a search; previous results are cleared first
    pub async fn search(&self, criteria: SearchCriteria) -> Result<SearchHandle> {
        self.engine.start(criteria).await
    }

    /// Set the viewport window and return its lines
    pub fn viewport(&self, start: u64, count: u64) -> Result<Vec<Arc<str>>> {
        self.cache.set_window(start, count);
        self.cache.get_lines(start, count)
    }

    /// Write the current results to `<name>_result.txt` and `<name>_info.txt` in `out_dir`
    pub fn export(
        &self,
        criteria: &SearchCriteria,
        out_dir: &Path,
        name: &str,
    ) -> Result<ExportReport> {
        export_results(
            &self.results,
            criteria,
            self.index.total_lines(),
            out_dir,
            name,
        )
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    pub fn line_index(&self) -> &Arc<LineIndex> {
        &self.index
    }

    pub fn cache(&self) -> &Arc<LineCache> {
        &self.cache
    }

    pub fn results(&self) -> &Arc<ResultStore> {
        &self.results
    }

    pub fn engine(&self) -> &SearchEngine {
        &self.engine
    }

    pub fn total_lines(&self) -> u64 {
        self.index.total_lines()
    }

    pub fn file_size(&self) -> u64 {
        self.bytes.len()
    }

    /// Name of the encoding detected for the file, e.g. `UTF-8` or `GBK`
    pub fn encoding_name(&self) -> &'static str {
        self.decoder.encoding_name()
    }

    /// Lines decoded with a fallback encoding so far
    pub fn decode_fallbacks(&self) -> u64 {
        self.decoder.fallback_count()
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("path", &self.path)
            .field("total_lines", &self.index.total_lines())
            .field("encoding", &self.decoder.encoding_name())
            .field("engine", &self.engine)
            .finish()
    }
}
