//! Bounded viewport cache of decoded lines
//!
//! Lines are decoded lazily from the backing [`ByteSource`] the first time they are
//! requested. The cache never holds more than `max_size` entries: when it is full, lines
//! outside the current window (plus a margin) go first, then the least recently used.
//! Lookups, inserts, eviction and preloading all share one lock, and the lock is never
//! held while a line is being decoded.

use crate::config::CacheConfig;
use crate::error::{Result, RlsiftError};
use crate::file_handler::encoding::TextDecoder;
use crate::file_handler::factory::ByteSource;
use crate::file_handler::line_index::LineIndex;
use lru::LruCache;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Snapshot of cache occupancy and effectiveness
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub len: usize,
    pub hits: u64,
    pub misses: u64,
    pub max_size: usize,
}

struct CacheState {
    lines: LruCache<u64, Arc<str>>,
    window_start: u64,
    window_count: u64,
    hits: u64,
    misses: u64,
}

/// Line-number to text cache for one opened file
pub struct LineCache {
    bytes: Arc<ByteSource>,
    index: Arc<LineIndex>,
    decoder: TextDecoder,
    config: CacheConfig,
    state: Mutex<CacheState>,
}

impl LineCache {
    pub fn new(
        bytes: Arc<ByteSource>,
        index: Arc<LineIndex>,
        decoder: TextDecoder,
        config: CacheConfig,
    ) -> Self {
        Self {
            bytes,
            index,
            decoder,
            config,
            state: Mutex::new(CacheState {
                lines: LruCache::unbounded(),
                window_start: 0,
                window_count: 0,
                hits: 0,
                misses: 0,
            }),
        }
    }

    /// Decoded text of `line`, without its terminator
    ///
    /// Never fails on undecodable bytes; only a line past the end of the file is an error.
    pub fn get_line(&self, line: u64) -> Result<Arc<str>> {
        self.fetch(line, true).map(|(text, _)| text)
    }

    /// Up to `count` consecutive lines starting at `start`, clamped to the end of the file
    pub fn get_lines(&self, start: u64, count: u64) -> Result<Vec<Arc<str>>> {
        let end = start.saturating_add(count).min(self.index.total_lines());
        (start..end).map(|line| self.get_line(line)).collect()
    }

    /// Record the range the caller is displaying; it is protected from the next eviction
    pub fn set_window(&self, start: u64, count: u64) {
        let mut state = self.state.lock();
        state.window_start = start;
        state.window_count = count;
    }

    /// Current `(start, count)` window
    pub fn window(&self) -> (u64, u64) {
        let state = self.state.lock();
        (state.window_start, state.window_count)
    }

    /// Drop every cached line and reset the counters
    pub fn invalidate(&self) {
        let mut state = self.state.lock();
        state.lines.clear();
        state.hits = 0;
        state.misses = 0;
    }

    /// Whether `line` is currently cached; does not touch recency
    pub fn is_cached(&self, line: u64) -> bool {
        self.state.lock().lines.contains(&line)
    }

    pub fn stats(&self) -> CacheStats {
        let state = self.state.lock();
        CacheStats {
            len: state.lines.len(),
            hits: state.hits,
            misses: state.misses,
            max_size: self.max_size(),
        }
    }

    pub fn total_lines(&self) -> u64 {
        self.index.total_lines()
    }

    pub fn decoder(&self) -> &TextDecoder {
        &self.decoder
    }

    /// Decode the window plus `preload_margin` on both sides
    ///
    /// Returns how many lines were newly decoded. Checks `cancel` before each line and
    /// stops with [`RlsiftError::Cancelled`] once it is set. The range is trimmed so a
    /// preload can never evict its own lines.
    pub fn preload_window(&self, cancel: &AtomicBool) -> Result<usize> {
        let (start, end) = {
            let state = self.state.lock();
            let margin = self.config.preload_margin;
            let start = state.window_start.saturating_sub(margin);
            let end = state
                .window_start
                .saturating_add(state.window_count)
                .saturating_add(margin)
                .min(self.index.total_lines())
                .min(start.saturating_add(self.max_size() as u64));
            (start, end)
        };

        let mut loaded = 0;
        for line in start..end {
            if cancel.load(Ordering::Relaxed) {
                log::debug!("preload cancelled after {} lines", loaded);
                return Err(RlsiftError::Cancelled);
            }
            let (_, was_cached) = self.fetch(line, false)?;
            if !was_cached {
                loaded += 1;
            }
        }
        log::debug!("preloaded lines {}..{} ({} decoded)", start, end, loaded);
        Ok(loaded)
    }

    /// Run [`preload_window`](Self::preload_window) on the blocking pool
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn_preload(self: &Arc<Self>) -> PreloadHandle {
        let cancel = Arc::new(AtomicBool::new(false));
        let cache = Arc::clone(self);
        let flag = Arc::clone(&cancel);
        let task = tokio::task::spawn_blocking(move || cache.preload_window(&flag));
        PreloadHandle { cancel, task }
    }

    fn max_size(&self) -> usize {
        self.config.max_size.max(1)
    }

    /// Look up or decode `line`; the flag reports whether it was already cached
    fn fetch(&self, line: u64, record: bool) -> Result<(Arc<str>, bool)> {
        let (start, end) = self
            .index
            .line_range(line)
            .ok_or(RlsiftError::LineOutOfRange {
                line,
                total: self.index.total_lines(),
            })?;

        {
            let mut state = self.state.lock();
            if let Some(text) = state.lines.get(&line) {
                let text = Arc::clone(text);
                if record {
                    state.hits += 1;
                }
                return Ok((text, true));
            }
            if record {
                state.misses += 1;
            }
        }

        let text: Arc<str> = Arc::from(self.decoder.decode_line(self.bytes.slice(start, end)));

        let mut state = self.state.lock();
        // Another caller may have decoded the same line while we were unlocked
        if let Some(existing) = state.lines.get(&line) {
            return Ok((Arc::clone(existing), false));
        }
        if state.lines.len() >= self.max_size() {
            self.evict(&mut state);
        }
        state.lines.put(line, Arc::clone(&text));
        Ok((text, false))
    }

    /// Make room for one more entry
    fn evict(&self, state: &mut CacheState) {
        let margin = self.config.margin;
        let keep_from = state.window_start.saturating_sub(margin);
        let keep_to = state
            .window_start
            .saturating_add(state.window_count)
            .saturating_add(margin);

        let outside: Vec<u64> = state
            .lines
            .iter()
            .map(|(&line, _)| line)
            .filter(|&line| line < keep_from || line > keep_to)
            .collect();
        for line in &outside {
            state.lines.pop(line);
        }

        let max = self.max_size();
        while state.lines.len() >= max {
            if state.lines.pop_lru().is_none() {
                break;
            }
        }
        log::trace!(
            "evicted {} lines outside {}..={}",
            outside.len(),
            keep_from,
            keep_to
        );
    }
}

impl std::fmt::Debug for LineCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LineCache")
            .field("stats", &self.stats())
            .field("window", &self.window())
            .finish()
    }
}

/// Handle to a background preload
#[derive(Debug)]
pub struct PreloadHandle {
    cancel: Arc<AtomicBool>,
    task: JoinHandle<Result<usize>>,
}

impl PreloadHandle {
    /// Ask the preload to stop; returns immediately
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::Relaxed);
    }

    /// Wait for the preload to end
    pub async fn wait(self) -> Result<usize> {
        self.task
            .await
            .map_err(|e| RlsiftError::invalid_state(format!("preload task failed: {}", e)))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbered_lines(count: usize) -> Vec<u8> {
        (0..count)
            .map(|i| format!("line {}\r\n", i))
            .collect::<String>()
            .into_bytes()
    }

    fn cache_over(data: Vec<u8>, config: CacheConfig) -> LineCache {
        let index = Arc::new(LineIndex::from_bytes(&data));
        LineCache::new(
            Arc::new(ByteSource::InMemory(data)),
            index,
            TextDecoder::utf8(),
            config,
        )
    }

    fn small_config(max_size: usize, margin: u64) -> CacheConfig {
        CacheConfig {
            max_size,
            margin,
            preload_margin: margin,
        }
    }

    #[test]
    fn test_get_line_strips_terminators_and_is_idempotent() {
        let cache = cache_over(numbered_lines(5), CacheConfig::default());
        let first = cache.get_line(3).unwrap();
        let second = cache.get_line(3).unwrap();
        assert_eq!(&*first, "line 3");
        assert_eq!(first, second);

        let stats = cache.stats();
        assert_eq!(stats.len, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hits, 1);
    }

    #[test]
    fn test_get_line_out_of_range() {
        let cache = cache_over(numbered_lines(2), CacheConfig::default());
        assert!(matches!(
            cache.get_line(2),
            Err(RlsiftError::LineOutOfRange { line: 2, total: 2 })
        ));
    }

    #[test]
    fn test_get_lines_clamps_to_end() {
        let cache = cache_over(numbered_lines(4), CacheConfig::default());
        let lines = cache.get_lines(2, 10).unwrap();
        let lines: Vec<&str> = lines.iter().map(|l| &**l).collect();
        assert_eq!(lines, vec!["line 2", "line 3"]);
    }

    #[test]
    fn test_eviction_keeps_window_and_margin() {
        let cache = cache_over(numbered_lines(200), small_config(10, 2));
        cache.set_window(0, 5);
        for line in 0..10 {
            cache.get_line(line).unwrap();
        }
        assert_eq!(cache.stats().len, 10);

        cache.get_line(100).unwrap();
        for line in 0..=7 {
            assert!(cache.is_cached(line), "line {line} should survive");
        }
        assert!(!cache.is_cached(8));
        assert!(!cache.is_cached(9));
        assert!(cache.is_cached(100));
    }

    #[test]
    fn test_size_never_exceeds_budget() {
        let cache = cache_over(numbered_lines(500), small_config(16, 4));
        cache.set_window(10, 100); // window larger than the budget
        for line in (0..500).rev() {
            cache.get_line(line).unwrap();
            assert!(cache.stats().len <= 16);
        }
    }

    #[test]
    fn test_invalidate_clears_everything() {
        let cache = cache_over(numbered_lines(10), CacheConfig::default());
        cache.get_line(1).unwrap();
        cache.get_line(1).unwrap();
        cache.invalidate();
        assert_eq!(
            cache.stats(),
            CacheStats {
                len: 0,
                hits: 0,
                misses: 0,
                max_size: 1000
            }
        );
        assert_eq!(&*cache.get_line(1).unwrap(), "line 1");
    }

    #[test]
    fn test_preload_window_fills_margin() {
        let cache = cache_over(numbered_lines(100), small_config(100, 3));
        cache.set_window(10, 5);
        let loaded = cache.preload_window(&AtomicBool::new(false)).unwrap();
        assert_eq!(loaded, 11); // 7..18
        assert!(cache.is_cached(7));
        assert!(cache.is_cached(17));
        assert!(!cache.is_cached(18));

        // Preloading does not count as viewer traffic
        assert_eq!(cache.stats().misses, 0);
        cache.get_line(12).unwrap();
        assert_eq!(cache.stats().hits, 1);
    }

    #[test]
    fn test_preload_respects_cancel() {
        let cache = cache_over(numbered_lines(100), CacheConfig::default());
        cache.set_window(0, 50);
        let result = cache.preload_window(&AtomicBool::new(true));
        assert!(matches!(result, Err(RlsiftError::Cancelled)));
        assert_eq!(cache.stats().len, 0);
    }

    #[tokio::test]
    async fn test_spawn_preload() {
        let cache = Arc::new(cache_over(numbered_lines(30), small_config(100, 0)));
        cache.set_window(5, 10);
        let handle = cache.spawn_preload();
        assert_eq!(handle.wait().await.unwrap(), 10);
        assert!(cache.is_cached(5));
        assert!(cache.is_cached(14));
    }

    #[test]
    fn test_concurrent_readers() {
        let cache = Arc::new(cache_over(numbered_lines(300), small_config(64, 8)));
        let threads: Vec<_> = (0..4)
            .map(|t| {
                let cache = Arc::clone(&cache);
                std::thread::spawn(move || {
                    for line in (t..300).step_by(4) {
                        assert_eq!(&*cache.get_line(line).unwrap(), format!("line {line}"));
                    }
                })
            })
            .collect();
        for thread in threads {
            thread.join().unwrap();
        }
        assert!(cache.stats().len <= 64);
    }
}
