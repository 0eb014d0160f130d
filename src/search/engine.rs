//! Parallel chunked search over an indexed file.
//!
//! A run is driven by one coordinator task. It spawns a fixed pool of blocking workers
//! that pull chunks from a shared plan, forwards their hits and throttled progress to the
//! caller's [`SearchHandle`], and closes the stream with exactly one terminal event.
//!
//! ```text
//! start() -> compile matcher -> stop prior run -> clear results -> plan chunks
//!         -> coordinator -> N x spawn_blocking(run_worker) -> WorkerMessage
//!         -> SearchEvent::{Hit, Progress}* -> Finished | Cancelled | Failed
//! ```

use crate::config::SearchConfig;
use crate::error::Result;
use crate::file_handler::{LineIndex, LineSource, TextDecoder};
use crate::search::criteria::SearchCriteria;
use crate::search::matcher::CompiledMatcher;
use crate::search::planner::ChunkPlanner;
use crate::search::protocol::{SearchEvent, SearchProgress, SearchState, SearchSummary};
use crate::search::results::ResultStore;
use crate::search::worker::{run_worker, ScanContext, ScanControl, WorkerMessage};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;

struct ActiveRun {
    control: Arc<ScanControl>,
    task: JoinHandle<()>,
}

/// Search orchestrator for one opened file
///
/// Owns the run lifecycle `Idle -> Running -> {Finished | Cancelled | Failed}`. Starting a
/// new run cancels and joins the previous one first, so at most one run touches the
/// result store at a time. Concurrent `start` calls are serialized on `active`.
pub struct SearchEngine {
    index: Arc<LineIndex>,
    source: Arc<dyn LineSource>,
    decoder: TextDecoder,
    results: Arc<ResultStore>,
    config: SearchConfig,
    state: Arc<Mutex<SearchState>>,
    /// Held from stopping the prior run until the new one is recorded
    active: tokio::sync::Mutex<Option<ActiveRun>>,
    /// Control of the latest run, for synchronous `cancel`
    current: Mutex<Option<Arc<ScanControl>>>,
}

impl SearchEngine {
    pub fn new(
        index: Arc<LineIndex>,
        source: Arc<dyn LineSource>,
        decoder: TextDecoder,
        results: Arc<ResultStore>,
        config: SearchConfig,
    ) -> Self {
        Self {
            index,
            source,
            decoder,
            results,
            config,
            state: Arc::new(Mutex::new(SearchState::Idle)),
            active: tokio::sync::Mutex::new(None),
            current: Mutex::new(None),
        }
    }

    /// Start a run with the configured worker count
    pub async fn start(&self, criteria: SearchCriteria) -> Result<SearchHandle> {
        self.start_with_workers(criteria, self.config.effective_workers())
            .await
    }

    /// Start a run with an explicit worker count (clamped to the pool limits)
    ///
    /// Pattern errors are returned here, before any task is spawned, and leave the engine
    /// state untouched.
    pub async fn start_with_workers(
        &self,
        criteria: SearchCriteria,
        workers: usize,
    ) -> Result<SearchHandle> {
        let matcher = CompiledMatcher::compile(&criteria)?;
        let workers = SearchConfig {
            workers,
            ..self.config.clone()
        }
        .effective_workers();

        let mut active = self.active.lock().await;
        Self::stop_run(active.take()).await;
        self.results.clear();

        let planner = ChunkPlanner::from_config(&self.config);
        let mut chunks = planner.plan(self.index.total_lines(), workers);
        if let Some(ratio) = criteria.sampling_ratio {
            chunks = ChunkPlanner::sample(chunks, ratio);
        }

        log::info!(
            "search {} over {} lines: {} chunks, {} workers, mode {:?}",
            criteria.describe(),
            self.index.total_lines(),
            chunks.len(),
            workers,
            criteria.mode()
        );

        let control = Arc::new(ScanControl::new(criteria.result_cap));
        let ctx = Arc::new(ScanContext::new(
            Arc::clone(&self.index),
            Arc::clone(&self.source),
            self.decoder.clone(),
            matcher,
            Arc::clone(&self.results),
            Arc::clone(&control),
            chunks,
            self.config.check_interval,
        ));

        let (tx, events) = mpsc::unbounded_channel();
        *self.state.lock() = SearchState::Running;
        let task = tokio::spawn(coordinate(
            ctx,
            workers,
            tx,
            Arc::clone(&self.state),
            self.config.progress_throttle(),
        ));

        *self.current.lock() = Some(Arc::clone(&control));
        *active = Some(ActiveRun {
            control: Arc::clone(&control),
            task,
        });

        Ok(SearchHandle { events, control })
    }

    /// Cancel the current run, if any; returns immediately
    pub fn cancel(&self) {
        if let Some(control) = self.current.lock().as_ref() {
            control.cancel();
        }
    }

    /// Cancel the current run and wait until its tasks have ended
    pub async fn shutdown(&self) {
        let mut active = self.active.lock().await;
        Self::stop_run(active.take()).await;
    }

    pub fn state(&self) -> SearchState {
        *self.state.lock()
    }

    pub fn results(&self) -> &Arc<ResultStore> {
        &self.results
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    async fn stop_run(run: Option<ActiveRun>) {
        if let Some(run) = run {
            run.control.cancel();
            if let Err(e) = run.task.await {
                log::warn!("search coordinator ended abnormally: {}", e);
            }
        }
    }
}

impl Drop for SearchEngine {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl std::fmt::Debug for SearchEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchEngine")
            .field("total_lines", &self.index.total_lines())
            .field("state", &self.state())
            .field("config", &self.config)
            .finish()
    }
}

/// Caller's end of one run
#[derive(Debug)]
pub struct SearchHandle {
    events: UnboundedReceiver<SearchEvent>,
    control: Arc<ScanControl>,
}

impl SearchHandle {
    /// Request a cooperative stop; safe from any thread, returns immediately
    ///
    /// The run still delivers its terminal [`SearchEvent::Cancelled`].
    pub fn cancel(&self) {
        self.control.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.control.is_cancelled()
    }

    /// Hits produced so far
    pub fn hit_count(&self) -> usize {
        self.control.hit_count()
    }

    /// Next event; `None` after the terminal event has been received
    ///
    /// Once the run is cancelled, queued `Hit` and `Progress` events are dropped and only
    /// the terminal event is delivered.
    pub async fn next_event(&mut self) -> Option<SearchEvent> {
        loop {
            let event = self.events.recv().await?;
            if event.is_terminal() || !self.control.is_cancelled() {
                return Some(event);
            }
        }
    }

    /// Skip to the terminal event
    pub async fn wait(mut self) -> SearchEvent {
        while let Some(event) = self.next_event().await {
            if event.is_terminal() {
                return event;
            }
        }
        SearchEvent::Failed {
            message: "search ended without a terminal event".to_string(),
        }
    }
}

async fn coordinate(
    ctx: Arc<ScanContext>,
    workers: usize,
    tx: UnboundedSender<SearchEvent>,
    state: Arc<Mutex<SearchState>>,
    throttle: Duration,
) {
    let started = Instant::now();
    let control = Arc::clone(&ctx.control);
    let total_units = ctx.chunks.len();

    let summary = |completed_units: usize| SearchSummary {
        total_hits: control.hit_count(),
        elapsed: started.elapsed(),
        completed_units,
        total_units,
        cap_reached: control.cap_reached(),
    };

    if control.is_cancelled() {
        *state.lock() = SearchState::Cancelled;
        let _ = tx.send(SearchEvent::Cancelled(summary(0)));
        return;
    }

    let (worker_tx, mut worker_rx) = mpsc::unbounded_channel();
    let pool: Vec<_> = (0..workers.min(total_units))
        .map(|_| {
            let ctx = Arc::clone(&ctx);
            let worker_tx = worker_tx.clone();
            tokio::task::spawn_blocking(move || run_worker(&ctx, &worker_tx))
        })
        .collect();
    drop(worker_tx);

    let mut completed = 0;
    let mut attempted = 0;
    let mut open_failures = 0;
    let mut last_open_error = None;
    let mut last_progress = started;

    while let Some(message) = worker_rx.recv().await {
        match message {
            WorkerMessage::Hits(hits) => {
                if !control.is_cancelled() {
                    for hit in hits {
                        let _ = tx.send(SearchEvent::Hit(hit));
                    }
                }
                continue;
            }
            WorkerMessage::ChunkDone {
                chunk,
                completed: done,
            } => {
                attempted += 1;
                if done {
                    completed += 1;
                } else {
                    log::debug!("chunk {} stopped early", chunk);
                }
            }
            WorkerMessage::ChunkFailed { chunk, open, error } => {
                attempted += 1;
                log::warn!("chunk {} produced no further hits: {}", chunk, error);
                if open {
                    open_failures += 1;
                    last_open_error = Some(error.to_string());
                }
            }
        }

        if !control.is_cancelled() && last_progress.elapsed() >= throttle {
            last_progress = Instant::now();
            let _ = tx.send(SearchEvent::Progress(SearchProgress {
                completed_units: completed,
                total_units,
                hits_so_far: control.hit_count(),
            }));
        }
    }

    for worker in pool {
        if let Err(e) = worker.await {
            log::warn!("search worker panicked, its chunk yields no hits: {}", e);
        }
    }

    let summary = summary(completed);
    if control.is_cancelled() {
        log::info!("search cancelled after {} hits", summary.total_hits);
        *state.lock() = SearchState::Cancelled;
        let _ = tx.send(SearchEvent::Cancelled(summary));
    } else if open_failures > 0 && open_failures == attempted {
        let message = last_open_error.unwrap_or_else(|| "could not open file".to_string());
        log::warn!("search failed: {}", message);
        *state.lock() = SearchState::Failed;
        let _ = tx.send(SearchEvent::Failed { message });
    } else {
        log::info!(
            "search finished: {} hits, {}/{} chunks in {:?}",
            summary.total_hits,
            summary.completed_units,
            summary.total_units,
            summary.elapsed
        );
        let _ = tx.send(SearchEvent::Progress(SearchProgress {
            completed_units: summary.completed_units,
            total_units,
            hits_so_far: summary.total_hits,
        }));
        *state.lock() = SearchState::Finished;
        let _ = tx.send(SearchEvent::Finished(summary));
    }
}
