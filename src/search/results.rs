//! Ordered, thread-safe collection of search hits with a navigation cursor.
//!
//! Workers finish chunks in arbitrary order; sorting on insert keeps the store in
//! `(line_number, column_start)` order regardless.

use crate::error::{Result, RlsiftError};
use crate::search::protocol::SearchHit;
use parking_lot::Mutex;

#[derive(Debug, Default)]
struct StoreInner {
    hits: Vec<SearchHit>,
    /// `None` until the first navigation after a clear
    cursor: Option<usize>,
}

impl StoreInner {
    fn insert(&mut self, hit: SearchHit) {
        let key = hit.sort_key();
        let at = self.hits.partition_point(|h| h.sort_key() <= key);
        self.hits.insert(at, hit);
        // Keep the cursor on the hit it was pointing at
        if let Some(cursor) = self.cursor.as_mut() {
            if at <= *cursor {
                *cursor += 1;
            }
        }
    }

    fn select(&mut self, index: usize) -> SearchHit {
        self.cursor = Some(index);
        self.hits[index].clone()
    }
}

/// Hits of the current search, sorted by line then column
#[derive(Debug, Default)]
pub struct ResultStore {
    inner: Mutex<StoreInner>,
}

impl ResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert one hit at its sorted position
    pub fn add(&self, hit: SearchHit) {
        self.inner.lock().insert(hit);
    }

    /// Insert several hits under a single lock acquisition
    pub fn add_batch(&self, hits: impl IntoIterator<Item = SearchHit>) {
        let mut inner = self.inner.lock();
        for hit in hits {
            inner.insert(hit);
        }
    }

    /// Remove every hit and reset the cursor
    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.hits.clear();
        inner.cursor = None;
    }

    /// Advance the cursor, wrapping from the last hit to the first
    pub fn next(&self) -> Result<SearchHit> {
        let mut inner = self.inner.lock();
        let len = inner.hits.len();
        if len == 0 {
            return Err(RlsiftError::Empty);
        }
        let index = match inner.cursor {
            None => 0,
            Some(cursor) => (cursor + 1) % len,
        };
        Ok(inner.select(index))
    }

    /// Move the cursor back, wrapping from the first hit to the last
    pub fn previous(&self) -> Result<SearchHit> {
        let mut inner = self.inner.lock();
        let len = inner.hits.len();
        if len == 0 {
            return Err(RlsiftError::Empty);
        }
        let index = match inner.cursor {
            None => len - 1,
            Some(cursor) => (cursor + len - 1) % len,
        };
        Ok(inner.select(index))
    }

    /// Put the cursor on `index`
    pub fn jump_to(&self, index: usize) -> Result<SearchHit> {
        let mut inner = self.inner.lock();
        let len = inner.hits.len();
        if index >= len {
            return Err(RlsiftError::OutOfRange { index, len });
        }
        Ok(inner.select(index))
    }

    /// Hit under the cursor
    pub fn current(&self) -> Option<SearchHit> {
        let inner = self.inner.lock();
        inner.cursor.and_then(|cursor| inner.hits.get(cursor).cloned())
    }

    pub fn cursor(&self) -> Option<usize> {
        self.inner.lock().cursor
    }

    pub fn get(&self, index: usize) -> Option<SearchHit> {
        self.inner.lock().hits.get(index).cloned()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().hits.len()
    }

    /// Alias of [`len`](Self::len)
    pub fn count(&self) -> usize {
        self.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().hits.is_empty()
    }

    /// Copy of every hit, in order
    pub fn snapshot(&self) -> Vec<SearchHit> {
        self.inner.lock().hits.clone()
    }

    /// All hits on `line_number`, in column order (for highlighting)
    pub fn hits_on_line(&self, line_number: u64) -> Vec<SearchHit> {
        let inner = self.inner.lock();
        let start = inner.hits.partition_point(|h| h.line_number < line_number);
        let end = inner.hits.partition_point(|h| h.line_number <= line_number);
        inner.hits[start..end].to_vec()
    }
}
