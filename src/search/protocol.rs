//! Values exchanged between the search engine and its caller.

use std::sync::Arc;
use std::time::Duration;

/// One matched location
///
/// Columns are character (not byte) offsets into the decoded line, half-open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
    pub line_number: u64,
    pub column_start: usize,
    pub column_end: usize,
    pub matched_text: String,
    /// Whole decoded line; shared between the hits of the same line
    pub line_content: Arc<str>,
    /// Line start offset plus `column_start`
    pub byte_offset: u64,
}

impl SearchHit {
    /// Ordering key used by the result store
    pub fn sort_key(&self) -> (u64, usize) {
        (self.line_number, self.column_start)
    }
}

/// Progress snapshot; units are chunks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SearchProgress {
    pub completed_units: usize,
    pub total_units: usize,
    pub hits_so_far: usize,
}

/// Totals reported with a terminal event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchSummary {
    pub total_hits: usize,
    pub elapsed: Duration,
    /// Chunks scanned to the end
    pub completed_units: usize,
    /// Chunks planned for the run (after sampling)
    pub total_units: usize,
    pub cap_reached: bool,
}

/// Event stream of one run: zero or more `Progress`/`Hit`, then exactly one terminal event
#[derive(Debug, Clone, PartialEq)]
pub enum SearchEvent {
    Progress(SearchProgress),
    Hit(SearchHit),
    Finished(SearchSummary),
    Cancelled(SearchSummary),
    Failed { message: String },
}

impl SearchEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SearchEvent::Finished(_) | SearchEvent::Cancelled(_) | SearchEvent::Failed { .. }
        )
    }
}

/// Lifecycle of the engine's most recent run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchState {
    #[default]
    Idle,
    Running,
    Finished,
    Cancelled,
    Failed,
}

impl SearchState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            SearchState::Finished | SearchState::Cancelled | SearchState::Failed
        )
    }
}
