// crates/core/src/envelope.rs
//! Envelope filter: log bytes → assistant text blocks.
//!
//! The log is one JSON envelope per line. Lines that fail to decode are
//! skipped (and counted), never fatal. Only assistant envelopes whose
//! flattened text carries both table markers are yielded.

use std::path::Path;
use tracing::debug;

use crate::error::ExtractError;
use crate::types::{LogEnvelope, TextBlock, NAME_COLUMN, STATUS_COLUMN};

/// Substrings every genuine table header contains.
pub const PREFILTER_MARKERS: [&str; 2] = [NAME_COLUMN, STATUS_COLUMN];

/// Read the whole log into memory. This is the only fatal failure point of
/// a scan.
pub async fn read_log(path: &Path) -> Result<Vec<u8>, ExtractError> {
    tokio::fs::read(path)
        .await
        .map_err(|e| ExtractError::io(path, e))
}

/// Counters maintained while the filter is drained.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FilterStats {
    pub envelopes: usize,
    pub decode_errors: usize,
    pub assistant_envelopes: usize,
    pub text_blocks: usize,
}

/// Lazy iterator of [`TextBlock`]s over raw log bytes.
pub struct EnvelopeFilter<'a> {
    data: &'a [u8],
    pos: usize,
    line_number: usize,
    stats: FilterStats,
}

impl<'a> EnvelopeFilter<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            pos: 0,
            line_number: 0,
            stats: FilterStats::default(),
        }
    }

    pub fn stats(&self) -> FilterStats {
        self.stats
    }

    fn next_line(&mut self) -> Option<&'a [u8]> {
        if self.pos >= self.data.len() {
            return None;
        }
        let rest = &self.data[self.pos..];
        let end = memchr::memchr(b'\n', rest).unwrap_or(rest.len());
        self.pos += end + 1;
        self.line_number += 1;
        let line = &rest[..end];
        Some(line.strip_suffix(b"\r").unwrap_or(line))
    }

    fn decode(&mut self, line: &[u8]) -> Option<LogEnvelope> {
        let text = match std::str::from_utf8(line) {
            Ok(t) => t,
            Err(e) => {
                debug!(line = self.line_number, error = %e, "Skipping envelope with invalid UTF-8");
                self.stats.decode_errors += 1;
                return None;
            }
        };
        match serde_json::from_str::<LogEnvelope>(text) {
            Ok(envelope) => Some(envelope),
            Err(e) => {
                debug!(line = self.line_number, error = %e, "Skipping undecodable envelope");
                self.stats.decode_errors += 1;
                None
            }
        }
    }
}

impl Iterator for EnvelopeFilter<'_> {
    type Item = TextBlock;

    fn next(&mut self) -> Option<TextBlock> {
        while let Some(line) = self.next_line() {
            if line.iter().all(u8::is_ascii_whitespace) {
                continue;
            }
            self.stats.envelopes += 1;

            let Some(envelope) = self.decode(line) else {
                continue;
            };
            if !envelope.is_assistant() {
                continue;
            }
            self.stats.assistant_envelopes += 1;

            let text = envelope.flatten_text();
            if !looks_like_table(&text) {
                continue;
            }
            self.stats.text_blocks += 1;
            return Some(TextBlock {
                line: self.line_number,
                text,
            });
        }
        None
    }
}

/// Cheap pre-filter: does the text carry every header marker?
pub fn looks_like_table(text: &str) -> bool {
    PREFILTER_MARKERS.iter().all(|marker| text.contains(marker))
}
