//! Independent line readers for search workers.
//!
//! The interactive [`LineCache`](crate::file_handler::LineCache) is shared and locked;
//! search workers instead each open their own reader so that scanning never contends
//! with viewport reads and no two tasks share a seek position.

use crate::error::{Result, RlsiftError};
use crate::file_handler::factory::ByteSource;
use crate::file_handler::line_index::LineIndex;
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Buffer size for sequential line reads
const READ_BUFFER_SIZE: usize = 256 * 1024;

/// Something search tasks can open private readers on
pub trait LineSource: Send + Sync {
    /// Open a fresh reader; called once per task
    fn open_reader(&self) -> Result<Box<dyn LineReader>>;
}

/// A private cursor over the raw bytes of indexed lines
pub trait LineReader: Send {
    /// Replace `buf` with the raw bytes of `line`, terminator included
    fn read_line(&mut self, line: u64, buf: &mut Vec<u8>) -> Result<()>;
}

/// Opens a new file handle per reader and seeks using the line index
#[derive(Debug, Clone)]
pub struct FileLineSource {
    path: PathBuf,
    index: Arc<LineIndex>,
}

impl FileLineSource {
    pub fn new(path: impl AsRef<Path>, index: Arc<LineIndex>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            index,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl LineSource for FileLineSource {
    fn open_reader(&self) -> Result<Box<dyn LineReader>> {
        let file = File::open(&self.path).map_err(|e| {
            RlsiftError::file_error(format!("Failed to open file: {}", self.path.display()), e)
        })?;
        Ok(Box::new(FileLineReader {
            file: BufReader::with_capacity(READ_BUFFER_SIZE, file),
            index: Arc::clone(&self.index),
            position: 0,
        }))
    }
}

struct FileLineReader {
    file: BufReader<File>,
    index: Arc<LineIndex>,
    /// Byte position of the underlying cursor
    position: u64,
}

impl LineReader for FileLineReader {
    fn read_line(&mut self, line: u64, buf: &mut Vec<u8>) -> Result<()> {
        let (start, end) = self
            .index
            .line_range(line)
            .ok_or(RlsiftError::LineOutOfRange {
                line,
                total: self.index.total_lines(),
            })?;

        // Consecutive lines need no seek, which keeps the BufReader buffer warm
        if self.position != start {
            self.file
                .seek(SeekFrom::Start(start))
                .map_err(|e| RlsiftError::file_error("Failed to seek to line", e))?;
        }

        buf.clear();
        buf.resize((end - start) as usize, 0);
        self.file
            .read_exact(buf)
            .map_err(|e| RlsiftError::file_error(format!("Failed to read line {}", line), e))?;
        self.position = end;
        Ok(())
    }
}

/// Serves lines from an already opened [`ByteSource`]; readers are free to create
#[derive(Debug, Clone)]
pub struct SharedBytesSource {
    bytes: Arc<ByteSource>,
    index: Arc<LineIndex>,
}

impl SharedBytesSource {
    pub fn new(bytes: Arc<ByteSource>, index: Arc<LineIndex>) -> Self {
        Self { bytes, index }
    }
}

impl LineSource for SharedBytesSource {
    fn open_reader(&self) -> Result<Box<dyn LineReader>> {
        Ok(Box::new(self.clone()))
    }
}

impl LineReader for SharedBytesSource {
    fn read_line(&mut self, line: u64, buf: &mut Vec<u8>) -> Result<()> {
        let (start, end) = self
            .index
            .line_range(line)
            .ok_or(RlsiftError::LineOutOfRange {
                line,
                total: self.index.total_lines(),
            })?;
        buf.clear();
        buf.extend_from_slice(self.bytes.slice(start, end));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const CONTENT: &[u8] = b"first\nsecond\r\nthird";

    fn create_test_file(content: &[u8]) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("Failed to create temp file");
        file.write_all(content).expect("Failed to write test data");
        file.flush().expect("Failed to flush test data");
        file
    }

    fn read_all(source: &dyn LineSource, lines: &[u64]) -> Vec<Vec<u8>> {
        let mut reader = source.open_reader().unwrap();
        let mut buf = Vec::new();
        lines
            .iter()
            .map(|&line| {
                reader.read_line(line, &mut buf).unwrap();
                buf.clone()
            })
            .collect()
    }

    #[test]
    fn test_file_reader_sequential_and_random() {
        let file = create_test_file(CONTENT);
        let index = Arc::new(LineIndex::from_bytes(CONTENT));
        let source = FileLineSource::new(file.path(), index);

        let lines = read_all(&source, &[0, 1, 2, 0, 2]);
        assert_eq!(lines[0], b"first\n");
        assert_eq!(lines[1], b"second\r\n");
        assert_eq!(lines[2], b"third");
        assert_eq!(lines[3], b"first\n");
        assert_eq!(lines[4], b"third");
    }

    #[test]
    fn test_readers_are_independent() {
        let file = create_test_file(CONTENT);
        let index = Arc::new(LineIndex::from_bytes(CONTENT));
        let source = FileLineSource::new(file.path(), index);

        let mut a = source.open_reader().unwrap();
        let mut b = source.open_reader().unwrap();
        let mut buf = Vec::new();
        a.read_line(2, &mut buf).unwrap();
        b.read_line(0, &mut buf).unwrap();
        assert_eq!(buf, b"first\n");
        a.read_line(1, &mut buf).unwrap();
        assert_eq!(buf, b"second\r\n");
    }

    #[test]
    fn test_out_of_range_line() {
        let index = Arc::new(LineIndex::from_bytes(CONTENT));
        let source = SharedBytesSource::new(
            Arc::new(ByteSource::InMemory(CONTENT.to_vec())),
            index,
        );
        let mut reader = source.open_reader().unwrap();
        let mut buf = Vec::new();
        assert!(matches!(
            reader.read_line(3, &mut buf),
            Err(RlsiftError::LineOutOfRange { line: 3, total: 3 })
        ));
    }

    #[test]
    fn test_open_fails_after_file_removed() {
        let file = create_test_file(CONTENT);
        let path = file.path().to_path_buf();
        let index = Arc::new(LineIndex::from_bytes(CONTENT));
        drop(file);

        let source = FileLineSource::new(&path, index);
        assert!(matches!(
            source.open_reader(),
            Err(RlsiftError::FileError { .. })
        ));
    }
}
