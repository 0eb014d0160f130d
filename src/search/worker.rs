use crate::error::RlsiftError;
use crate::file_handler::{LineIndex, LineReader, LineSource, TextDecoder};
use crate::search::matcher::CompiledMatcher;
use crate::search::protocol::SearchHit;
use crate::search::results::ResultStore;
use std::ops::Range;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;

/// Flags and counters shared by every task of one run.
#[derive(Debug)]
pub struct ScanControl {
    cancelled: AtomicBool,
    cap_reached: AtomicBool,
    hits: AtomicUsize,
    cap: Option<usize>,
}

impl ScanControl {
    pub fn new(cap: Option<usize>) -> Self {
        Self {
            cancelled: AtomicBool::new(false),
            cap_reached: AtomicBool::new(false),
            hits: AtomicUsize::new(0),
            cap,
        }
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    pub fn cap_reached(&self) -> bool {
        self.cap_reached.load(Ordering::Relaxed)
    }

    /// Workers stop at their next check once either flag is set
    pub fn should_stop(&self) -> bool {
        self.is_cancelled() || self.cap_reached()
    }

    pub fn hit_count(&self) -> usize {
        self.hits.load(Ordering::Acquire)
    }

    /// Claim a slot for one hit; false once the cap is exhausted
    fn try_reserve(&self) -> bool {
        let Some(cap) = self.cap else {
            self.hits.fetch_add(1, Ordering::AcqRel);
            return true;
        };

        match self
            .hits
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                (n < cap).then_some(n + 1)
            }) {
            Ok(previous) => {
                if previous + 1 >= cap {
                    self.cap_reached.store(true, Ordering::Relaxed);
                }
                true
            }
            Err(_) => {
                self.cap_reached.store(true, Ordering::Relaxed);
                false
            }
        }
    }
}

/// Reports from pool workers to the coordinator.
#[derive(Debug)]
pub enum WorkerMessage {
    /// Hits already added to the result store, in line order within the batch
    Hits(Vec<SearchHit>),
    /// `completed` is false when the chunk was abandoned because of cancel or cap
    ChunkDone { chunk: usize, completed: bool },
    /// `open` distinguishes a reader that could not be opened from a mid-chunk read error
    ChunkFailed {
        chunk: usize,
        open: bool,
        error: RlsiftError,
    },
}

/// Everything a pool worker needs, shared read-only across the pool.
pub struct ScanContext {
    pub index: Arc<LineIndex>,
    pub source: Arc<dyn LineSource>,
    pub decoder: TextDecoder,
    pub matcher: CompiledMatcher,
    pub results: Arc<ResultStore>,
    pub control: Arc<ScanControl>,
    pub chunks: Vec<Range<u64>>,
    /// Lines between stop checks
    pub check_interval: u64,
    next_chunk: AtomicUsize,
}

impl ScanContext {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        index: Arc<LineIndex>,
        source: Arc<dyn LineSource>,
        decoder: TextDecoder,
        matcher: CompiledMatcher,
        results: Arc<ResultStore>,
        control: Arc<ScanControl>,
        chunks: Vec<Range<u64>>,
        check_interval: u64,
    ) -> Self {
        Self {
            index,
            source,
            decoder,
            matcher,
            results,
            control,
            chunks,
            check_interval: check_interval.max(1),
            next_chunk: AtomicUsize::new(0),
        }
    }

    /// Claim the next unscanned chunk
    fn claim_chunk(&self) -> Option<usize> {
        let chunk = self.next_chunk.fetch_add(1, Ordering::Relaxed);
        (chunk < self.chunks.len()).then_some(chunk)
    }
}

/// Body of one pool worker: pull chunks until none are left or the run is stopped.
pub fn run_worker(ctx: &ScanContext, tx: &UnboundedSender<WorkerMessage>) {
    while !ctx.control.should_stop() {
        let Some(chunk) = ctx.claim_chunk() else {
            break;
        };
        scan_chunk(ctx, chunk, tx);
    }
}

fn scan_chunk(ctx: &ScanContext, chunk: usize, tx: &UnboundedSender<WorkerMessage>) {
    let range = ctx.chunks[chunk].clone();
    log::debug!("scanning chunk {} (lines {}..{})", chunk, range.start, range.end);

    let mut reader: Box<dyn LineReader> = match ctx.source.open_reader() {
        Ok(reader) => reader,
        Err(error) => {
            let _ = tx.send(WorkerMessage::ChunkFailed {
                chunk,
                open: true,
                error,
            });
            return;
        }
    };

    let mut buf = Vec::new();
    let mut batch = Vec::new();
    for line in range.clone() {
        if (line - range.start) % ctx.check_interval == 0 {
            flush(ctx, &mut batch, tx);
            if ctx.control.should_stop() {
                let _ = tx.send(WorkerMessage::ChunkDone {
                    chunk,
                    completed: false,
                });
                return;
            }
        }

        if let Err(error) = reader.read_line(line, &mut buf) {
            flush(ctx, &mut batch, tx);
            let _ = tx.send(WorkerMessage::ChunkFailed {
                chunk,
                open: false,
                error,
            });
            return;
        }

        let text = ctx.decoder.decode_line(&buf);
        let Some(spans) = ctx.matcher.match_line(&text) else {
            continue;
        };

        let line_start = ctx.index.line_start(line).unwrap_or_default();
        for hit in build_hits(line, line_start, text, &spans) {
            if !ctx.control.try_reserve() {
                flush(ctx, &mut batch, tx);
                let _ = tx.send(WorkerMessage::ChunkDone {
                    chunk,
                    completed: false,
                });
                return;
            }
            batch.push(hit);
        }
    }

    flush(ctx, &mut batch, tx);
    let _ = tx.send(WorkerMessage::ChunkDone {
        chunk,
        completed: true,
    });
}

/// Publish `batch` to the store and the coordinator; a cancelled run publishes nothing
fn flush(ctx: &ScanContext, batch: &mut Vec<SearchHit>, tx: &UnboundedSender<WorkerMessage>) {
    if ctx.control.is_cancelled() {
        batch.clear();
        return;
    }
    if batch.is_empty() {
        return;
    }
    let hits = std::mem::take(batch);
    ctx.results.add_batch(hits.iter().cloned());
    let _ = tx.send(WorkerMessage::Hits(hits));
}

/// One hit per byte span, or a single whole-line hit when there are no spans
pub fn build_hits(
    line_number: u64,
    line_start: u64,
    text: String,
    spans: &[Range<usize>],
) -> Vec<SearchHit> {
    let content: Arc<str> = Arc::from(text);

    if spans.is_empty() {
        let column_end = content.chars().count();
        return vec![SearchHit {
            line_number,
            column_start: 0,
            column_end,
            matched_text: content.to_string(),
            line_content: content,
            byte_offset: line_start,
        }];
    }

    spans
        .iter()
        .map(|span| {
            let column_start = content[..span.start].chars().count();
            let column_end = column_start + content[span.clone()].chars().count();
            SearchHit {
                line_number,
                column_start,
                column_end,
                matched_text: content[span.clone()].to_string(),
                line_content: Arc::clone(&content),
                byte_offset: line_start + column_start as u64,
            }
        })
        .collect()
}
