//! Background line indexing.
//!
//! Indexing a multi-gigabyte file takes seconds, so it runs on tokio's blocking pool and
//! reports through a channel. Exactly one terminal event ends the stream.

use crate::config::IndexConfig;
use crate::error::{Result, RlsiftError};
use crate::file_handler::line_index::{IndexProgress, LineIndex};
use crate::file_handler::validation::validate_file_path;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tokio::task::JoinHandle;

/// Events streamed by a background indexing run
#[derive(Debug)]
pub enum IndexEvent {
    Progress(IndexProgress),
    Finished(LineIndex),
    Failed(RlsiftError),
    Cancelled,
}

/// Handle to a running index build
#[derive(Debug)]
pub struct IndexingHandle {
    events: UnboundedReceiver<IndexEvent>,
    cancel: Arc<AtomicBool>,
    task: JoinHandle<()>,
}

/// Start indexing `path` on the blocking pool
///
/// Must be called from within a tokio runtime.
pub fn spawn_indexing(path: impl AsRef<Path>, config: IndexConfig) -> IndexingHandle {
    let path: PathBuf = path.as_ref().to_path_buf();
    let (tx, events) = mpsc::unbounded_channel();
    let cancel = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&cancel);

    let task = tokio::task::spawn_blocking(move || {
        let progress_tx = tx.clone();
        let result = validate_file_path(&path).and_then(|_| {
            LineIndex::build_from_path(&path, &config, Some(flag.as_ref()), |progress| {
                // A dropped receiver just means nobody is watching
                let _ = progress_tx.send(IndexEvent::Progress(progress));
            })
        });

        let event = match result {
            Ok(index) => {
                log::info!(
                    "indexed {} lines ({} bytes) in {}",
                    index.total_lines(),
                    index.file_size(),
                    path.display()
                );
                IndexEvent::Finished(index)
            }
            Err(RlsiftError::Cancelled) => {
                log::debug!("indexing of {} cancelled", path.display());
                IndexEvent::Cancelled
            }
            Err(e) => {
                log::warn!("indexing of {} failed: {}", path.display(), e);
                IndexEvent::Failed(e)
            }
        };
        let _ = tx.send(event);
    });

    IndexingHandle {
        events,
        cancel,
        task,
    }
}

impl IndexingHandle {
    /// Request a cooperative stop; the run ends with [`IndexEvent::Cancelled`]
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::Relaxed);
    }

    /// Next event, or `None` once the terminal event has been consumed
    pub async fn next_event(&mut self) -> Option<IndexEvent> {
        self.events.recv().await
    }

    /// Drain progress and return the finished index
    pub async fn wait(mut self) -> Result<LineIndex> {
        let outcome = loop {
            match self.events.recv().await {
                Some(IndexEvent::Progress(_)) => continue,
                Some(IndexEvent::Finished(index)) => break Ok(index),
                Some(IndexEvent::Failed(e)) => break Err(e),
                Some(IndexEvent::Cancelled) => break Err(RlsiftError::Cancelled),
                None => {
                    break Err(RlsiftError::invalid_state(
                        "indexing task ended without a result",
                    ))
                }
            }
        };
        if let Err(e) = self.task.await {
            log::warn!("indexing task did not shut down cleanly: {}", e);
        }
        outcome
    }
}
