//! File access for very large text files.
//!
//! Opening a file produces three shared, read-only pieces: a [`LineIndex`] of line start
//! offsets, a [`ByteSource`] holding the bytes (in memory or memory-mapped), and a
//! [`TextDecoder`] for the file's detected encoding. The [`LineCache`] serves decoded
//! lines to a viewer on top of them; search workers read through [`LineSource`] instead.

pub mod encoding;
pub mod factory;
pub mod indexer;
pub mod line_cache;
pub mod line_index;
pub mod source;
pub mod validation;

pub use encoding::TextDecoder;
pub use factory::{ByteSource, ByteSourceFactory};
pub use indexer::{spawn_indexing, IndexEvent, IndexingHandle};
pub use line_cache::{CacheStats, LineCache, PreloadHandle};
pub use line_index::{IndexProgress, LineIndex};
pub use source::{FileLineSource, LineReader, LineSource, SharedBytesSource};
pub use validation::validate_file_path;
