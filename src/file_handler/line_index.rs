//! Byte-offset line index built with a single block-wise scan
//!
//! The index stores the byte offset where every line starts plus one trailing sentinel
//! equal to the file length, so line `n` always spans `offsets[n]..offsets[n + 1]`
//! without special-casing the last line. Newlines are located with memchr, one bounded
//! block at a time, so building the index never needs the whole file in memory.

use crate::config::IndexConfig;
use crate::error::{Result, RlsiftError};
use memchr::memchr_iter;
use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

/// Progress snapshot emitted while an index is being built
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexProgress {
    /// Lines discovered so far
    pub lines: u64,
    /// Bytes consumed from the source so far
    pub bytes_scanned: u64,
}

/// Immutable table of line start offsets
///
/// - `line_offsets[0] == 0`
/// - `line_offsets[n]` is the byte after the `n`th newline
/// - the last entry equals the file length
/// - number of lines = `line_offsets.len() - 1`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineIndex {
    line_offsets: Vec<u64>,
}

impl LineIndex {
    /// Scan `reader` to the end in `config.block_size` blocks
    ///
    /// `cancel` is checked between blocks; once set the build stops with
    /// [`RlsiftError::Cancelled`] and no partial index is returned. `on_progress` is
    /// called every `config.progress_interval` lines and once after the final block.
    pub fn build<R, F>(
        mut reader: R,
        config: &IndexConfig,
        cancel: Option<&AtomicBool>,
        mut on_progress: F,
    ) -> Result<Self>
    where
        R: Read,
        F: FnMut(IndexProgress),
    {
        let block_size = config.block_size.max(1);
        let interval = config.progress_interval.max(1);
        let mut block = vec![0u8; block_size];
        let mut line_offsets = vec![0u64];
        let mut scanned: u64 = 0;
        let mut next_report = interval;

        loop {
            if cancel.is_some_and(|flag| flag.load(Ordering::Relaxed)) {
                return Err(RlsiftError::Cancelled);
            }

            let read = match reader.read(&mut block) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(RlsiftError::file_error("Failed to read while indexing", e)),
            };

            for pos in memchr_iter(b'\n', &block[..read]) {
                line_offsets.push(scanned + pos as u64 + 1);
            }
            scanned += read as u64;

            let lines = (line_offsets.len() - 1) as u64;
            if lines >= next_report {
                on_progress(IndexProgress {
                    lines,
                    bytes_scanned: scanned,
                });
                next_report = (lines / interval + 1) * interval;
            }
        }

        // Unterminated final line still needs its end sentinel
        if line_offsets.last().copied() != Some(scanned) {
            line_offsets.push(scanned);
        }

        let index = Self { line_offsets };
        on_progress(IndexProgress {
            lines: index.total_lines(),
            bytes_scanned: scanned,
        });
        Ok(index)
    }

    /// Open `path` and build its index
    pub fn build_from_path<F>(
        path: &Path,
        config: &IndexConfig,
        cancel: Option<&AtomicBool>,
        on_progress: F,
    ) -> Result<Self>
    where
        F: FnMut(IndexProgress),
    {
        let file = File::open(path).map_err(|e| {
            RlsiftError::file_error(format!("Failed to open file: {}", path.display()), e)
        })?;
        Self::build(file, config, cancel, on_progress)
    }

    /// Index an in-memory buffer in one pass
    pub fn from_bytes(data: &[u8]) -> Self {
        let mut line_offsets = Vec::with_capacity(data.len() / 64 + 2);
        line_offsets.push(0);
        line_offsets.extend(memchr_iter(b'\n', data).map(|pos| pos as u64 + 1));
        if line_offsets.last().copied() != Some(data.len() as u64) {
            line_offsets.push(data.len() as u64);
        }
        Self { line_offsets }
    }

    /// Number of lines in the file
    pub fn total_lines(&self) -> u64 {
        (self.line_offsets.len() - 1) as u64
    }

    /// Total indexed bytes (the sentinel offset)
    pub fn file_size(&self) -> u64 {
        self.line_offsets[self.line_offsets.len() - 1]
    }

    pub fn is_empty(&self) -> bool {
        self.total_lines() == 0
    }

    pub fn offsets(&self) -> &[u64] {
        &self.line_offsets
    }

    /// Byte offset where `line` starts
    pub fn line_start(&self, line: u64) -> Option<u64> {
        if line < self.total_lines() {
            Some(self.line_offsets[line as usize])
        } else {
            None
        }
    }

    /// Byte range `[start, end)` of `line`, terminator included
    pub fn line_range(&self, line: u64) -> Option<(u64, u64)> {
        if line < self.total_lines() {
            let idx = line as usize;
            Some((self.line_offsets[idx], self.line_offsets[idx + 1]))
        } else {
            None
        }
    }

    /// Line containing the absolute byte `offset` (binary search)
    pub fn line_at_offset(&self, offset: u64) -> Result<u64> {
        let file_size = self.file_size();
        if offset >= file_size {
            return Err(RlsiftError::NotFound { offset, file_size });
        }
        // offsets[0] == 0 <= offset, so the partition point is at least 1
        let upper = self.line_offsets.partition_point(|&start| start <= offset);
        Ok((upper - 1) as u64)
    }
}
