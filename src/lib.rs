//! # rlsift - Large File Indexing and Parallel Search
//!
//! Core of a viewer for multi-gigabyte text and log files: the file is indexed once, lines
//! are served to a viewport from a bounded cache, and include/exclude keyword searches run
//! in parallel chunks with streamed results and cooperative cancellation.
//!
//! ## Features
//!
//! - **Line Index**: one block-wise memchr scan records every line start offset
//! - **Viewport Cache**: bounded, window-aware cache over in-memory or memory-mapped bytes
//! - **Encoding Detection**: per-file detection with lossy per-line fallback, never fails
//! - **Parallel Search**: chunked worker pool built on ripgrep's regex matcher
//! - **Preview Mode**: result caps and even chunk sampling for low latency on huge files
//!
//! ## Architecture
//!
//! - [`error`] - Centralized error types and handling
//! - [`config`] - Index, cache and search tuning
//! - [`file_handler`] - Line index, backing bytes, decoding and the viewport cache
//! - [`search`] - Criteria, matcher, chunk planner, engine and result store
//! - [`app`] - Per-file session wiring the components together
//! - [`export`] - Saving matched lines and a search summary

// Core modules
pub mod config;
pub mod error;
pub mod file_handler;

// Core components
pub mod app;
pub mod export;
pub mod search;

// Re-export commonly used types for convenience
pub use error::{Result, RlsiftError};

// Public API surface for external usage
pub use app::Session;
pub use config::ViewerConfig;
pub use file_handler::{LineCache, LineIndex};
pub use search::{ResultStore, SearchCriteria, SearchEngine, SearchEvent, SearchHandle, SearchHit};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
