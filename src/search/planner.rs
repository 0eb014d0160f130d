//! Splits the line-number space into chunks for the worker pool.

use crate::config::SearchConfig;
use std::ops::Range;

/// Chunk sizing policy
///
/// Targets about two chunks per worker so that a slow chunk does not leave the rest of
/// the pool idle, bounded by `[min_chunk, max_chunk]` lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkPlanner {
    pub min_chunk: u64,
    pub max_chunk: u64,
    pub small_file_threshold: u64,
}

impl Default for ChunkPlanner {
    fn default() -> Self {
        Self::from_config(&SearchConfig::default())
    }
}

impl ChunkPlanner {
    pub fn from_config(config: &SearchConfig) -> Self {
        Self {
            min_chunk: config.min_chunk,
            max_chunk: config.max_chunk,
            small_file_threshold: config.small_file_threshold,
        }
    }

    /// Lines per chunk for a file of `total_lines` searched by `workers`
    pub fn chunk_size(&self, total_lines: u64, workers: usize) -> u64 {
        let min = self.min_chunk.max(1);
        let max = self.max_chunk.max(min);
        let target = total_lines / (workers.max(1) as u64 * 2);
        target.max(min).min(max)
    }

    /// Contiguous, non-overlapping `[start, end)` ranges covering `[0, total_lines)`
    pub fn plan(&self, total_lines: u64, workers: usize) -> Vec<Range<u64>> {
        if total_lines == 0 {
            return Vec::new();
        }
        if total_lines < self.small_file_threshold {
            return vec![0..total_lines];
        }

        let size = self.chunk_size(total_lines, workers);
        let mut chunks = Vec::with_capacity(total_lines.div_ceil(size) as usize);
        let mut start = 0;
        while start < total_lines {
            let end = start.saturating_add(size).min(total_lines);
            chunks.push(start..end);
            start = end;
        }
        chunks
    }

    /// Evenly spread subset of `plan` for sampled previews
    ///
    /// Keeps `ceil(ratio * len)` chunks (at least one), always including the first.
    pub fn sample(plan: Vec<Range<u64>>, ratio: f64) -> Vec<Range<u64>> {
        let total = plan.len();
        if total == 0 || ratio >= 1.0 {
            return plan;
        }
        let keep = ((ratio * total as f64).ceil() as usize).clamp(1, total);
        let picked: Vec<usize> = (0..keep).map(|i| i * total / keep).collect();

        plan.into_iter()
            .enumerate()
            .filter(|(i, _)| picked.binary_search(i).is_ok())
            .map(|(_, chunk)| chunk)
            .collect()
    }
}
