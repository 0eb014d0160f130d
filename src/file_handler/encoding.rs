//! Per-file encoding detection and never-failing line decoding.
//!
//! The encoding is guessed once from a leading sample of the file (BOM, then UTF-8
//! validity, then chardetng), and every line is decoded with it. A line the detected
//! encoding rejects is retried against a short list of legacy encodings and, if all of
//! them refuse it, decoded as lossy UTF-8. Falling back is a diagnostic, not an error.

use bstr::ByteSlice;
use chardetng::EncodingDetector;
use encoding_rs::{Encoding, GBK, UTF_8, WINDOWS_1252};
use std::borrow::Cow;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Bytes inspected when guessing a file's encoding
pub const DETECTION_SAMPLE_BYTES: usize = 64 * 1024;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Ordered fallbacks tried after the detected encoding fails
const LEGACY_FALLBACKS: [&Encoding; 3] = [UTF_8, GBK, WINDOWS_1252];

/// Decodes raw line bytes into display text
///
/// Cheap to clone; clones share the fallback counter.
#[derive(Debug, Clone)]
pub struct TextDecoder {
    primary: &'static Encoding,
    fallbacks: Vec<&'static Encoding>,
    fallback_count: Arc<AtomicU64>,
}

impl TextDecoder {
    /// Decoder for a known encoding
    pub fn with_encoding(primary: &'static Encoding) -> Self {
        let fallbacks = LEGACY_FALLBACKS
            .iter()
            .copied()
            .filter(|enc| *enc != primary)
            .collect();
        Self {
            primary,
            fallbacks,
            fallback_count: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn utf8() -> Self {
        Self::with_encoding(UTF_8)
    }

    /// Guess the encoding from the first bytes of a file
    pub fn detect(data: &[u8]) -> Self {
        let sample = &data[..data.len().min(DETECTION_SAMPLE_BYTES)];

        // Lines are split on the 0x0A byte, so only ASCII-compatible encodings are usable.
        if let Some((encoding, _)) = Encoding::for_bom(sample) {
            if encoding == UTF_8 {
                return Self::utf8();
            }
        }

        match std::str::from_utf8(sample) {
            Ok(_) => return Self::utf8(),
            // The sample may end in the middle of a multi-byte sequence
            Err(e) if e.error_len().is_none() => return Self::utf8(),
            Err(_) => {}
        }

        let mut detector = EncodingDetector::new();
        detector.feed(sample, sample.len() == data.len());
        let guess = detector.guess(None, true);
        if guess.is_ascii_compatible() {
            log::debug!("detected file encoding {}", guess.name());
            Self::with_encoding(guess)
        } else {
            Self::utf8()
        }
    }

    pub fn encoding(&self) -> &'static Encoding {
        self.primary
    }

    pub fn encoding_name(&self) -> &'static str {
        self.primary.name()
    }

    /// Number of lines that needed a fallback decode so far
    pub fn fallback_count(&self) -> u64 {
        self.fallback_count.load(Ordering::Relaxed)
    }

    /// Decode one line and strip its trailing `\n`/`\r` characters
    pub fn decode_line(&self, raw: &[u8]) -> String {
        let mut bytes = strip_terminators(raw);
        if self.primary == UTF_8 {
            bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
        }

        if let Some(text) = self
            .primary
            .decode_without_bom_handling_and_without_replacement(bytes)
        {
            return text.into_owned();
        }

        self.fallback_count.fetch_add(1, Ordering::Relaxed);
        for encoding in &self.fallbacks {
            if let Some(text) = encoding.decode_without_bom_handling_and_without_replacement(bytes)
            {
                log::debug!(
                    "line not valid {}, decoded as {}",
                    self.primary.name(),
                    encoding.name()
                );
                return text.into_owned();
            }
        }

        log::debug!("line not decodable, using lossy UTF-8");
        match bytes.to_str_lossy() {
            Cow::Borrowed(text) => text.to_string(),
            Cow::Owned(text) => text,
        }
    }
}

impl Default for TextDecoder {
    fn default() -> Self {
        Self::utf8()
    }
}

/// Trim any run of `\n` / `\r` bytes from the end of a line
pub fn strip_terminators(raw: &[u8]) -> &[u8] {
    let end = raw
        .iter()
        .rposition(|&b| b != b'\n' && b != b'\r')
        .map_or(0, |pos| pos + 1);
    &raw[..end]
}
