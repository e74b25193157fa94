//! Byte-level framing.
//!
//! A [`FrameReader`] accumulates bytes until the buffer ends with the port's
//! terminator, then emits the preceding bytes as one decoded, right-trimmed line.
//! Invalid UTF-8 is replaced rather than rejected so a noisy instrument never
//! takes its port down. A frame that grows past [`MAX_FRAME_LEN`] without a
//! terminator is discarded and reported as [`FrameOverflow`].

use crate::config::Terminator;
use std::borrow::Cow;
use thiserror::Error;
use tracing::debug;

/// Longest frame, terminator included, held before the buffer is discarded.
pub const MAX_FRAME_LEN: usize = 4096;

/// A frame hit [`MAX_FRAME_LEN`] without a terminator.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("no terminator within {limit} bytes, frame discarded")]
pub struct FrameOverflow {
    /// Limit that was exceeded.
    pub limit: usize,
}

/// Accumulates one in-progress record.
#[derive(Debug, Clone)]
pub struct FrameReader {
    terminator: &'static [u8],
    buffer: Vec<u8>,
    limit: usize,
}

impl FrameReader {
    /// Create a reader for `terminator` bounded by [`MAX_FRAME_LEN`].
    pub fn new(terminator: Terminator) -> Self {
        Self::with_limit(terminator, MAX_FRAME_LEN)
    }

    /// Create a reader holding at most `limit` bytes per frame.
    pub fn with_limit(terminator: Terminator, limit: usize) -> Self {
        let terminator = terminator.as_bytes();
        Self {
            terminator,
            buffer: Vec::with_capacity(128),
            limit: limit.max(terminator.len()),
        }
    }

    /// Append one byte. Returns the decoded line when the terminator completes.
    ///
    /// On overflow the partial frame is dropped and reading starts afresh.
    pub fn feed(&mut self, byte: u8) -> Result<Option<String>, FrameOverflow> {
        self.buffer.push(byte);
        if !self.buffer.ends_with(self.terminator) {
            if self.buffer.len() >= self.limit {
                self.buffer.clear();
                return Err(FrameOverflow { limit: self.limit });
            }
            return Ok(None);
        }

        let body = &self.buffer[..self.buffer.len() - self.terminator.len()];
        let line = match String::from_utf8_lossy(body) {
            Cow::Borrowed(text) => text.trim_end().to_string(),
            Cow::Owned(text) => {
                debug!(
                    bytes = body.len(),
                    "replaced malformed byte sequence in frame"
                );
                text.trim_end().to_string()
            }
        };
        self.buffer.clear();
        Ok(Some(line))
    }

    /// Drop any partial frame.
    pub fn reset(&mut self) {
        self.buffer.clear();
    }

    /// Bytes held for the in-progress frame.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed_all(reader: &mut FrameReader, bytes: &[u8]) -> Vec<String> {
        bytes.iter().filter_map(|b| reader.feed(*b).unwrap()).collect()
    }

    #[test]
    fn emits_line_on_newline() {
        let mut reader = FrameReader::new(Terminator::Lf);
        assert_eq!(feed_all(&mut reader, b"12.3\n"), vec!["12.3"]);
        assert_eq!(reader.pending(), 0);
    }

    #[test]
    fn two_byte_terminator_needs_both_bytes_in_order() {
        let mut reader = FrameReader::new(Terminator::LfCr);
        assert!(feed_all(&mut reader, b"a\r\nb").is_empty());
        assert_eq!(feed_all(&mut reader, b"\n\r"), vec!["a\r\nb"]);
    }

    #[test]
    fn carriage_return_terminator() {
        let mut reader = FrameReader::new(Terminator::Cr);
        assert_eq!(feed_all(&mut reader, b"x=1\ry=2\r"), vec!["x=1", "y=2"]);
    }

    #[test]
    fn trims_trailing_whitespace_only() {
        let mut reader = FrameReader::new(Terminator::Lf);
        assert_eq!(feed_all(&mut reader, b"  7.5 \t\r\n"), vec!["  7.5"]);
    }

    #[test]
    fn replaces_invalid_utf8() {
        let mut reader = FrameReader::new(Terminator::Lf);
        let lines = feed_all(&mut reader, b"T=\xff21\n");
        assert_eq!(lines, vec!["T=\u{FFFD}21"]);
    }

    #[test]
    fn empty_frame_yields_empty_line() {
        let mut reader = FrameReader::new(Terminator::Lf);
        assert_eq!(feed_all(&mut reader, b"\n"), vec![""]);
    }

    #[test]
    fn reset_discards_partial_frame() {
        let mut reader = FrameReader::new(Terminator::Lf);
        assert!(feed_all(&mut reader, b"garbage").is_empty());
        reader.reset();
        assert_eq!(feed_all(&mut reader, b"ok\n"), vec!["ok"]);
    }

    #[test]
    fn overlong_frame_is_discarded() {
        let mut reader = FrameReader::with_limit(Terminator::LfCr, 8);
        for byte in b"xxxxxxx" {
            assert_eq!(reader.feed(*byte), Ok(None));
        }
        assert_eq!(reader.feed(b'x'), Err(FrameOverflow { limit: 8 }));
        assert_eq!(reader.pending(), 0);
        assert_eq!(feed_all(&mut reader, b"ok\n\r"), vec!["ok"]);
    }

    #[test]
    fn frame_of_exactly_the_limit_is_accepted() {
        let mut reader = FrameReader::with_limit(Terminator::Lf, 4);
        assert_eq!(feed_all(&mut reader, b"abc\n"), vec!["abc"]);
    }

    #[test]
    fn default_limit_bounds_memory() {
        let mut reader = FrameReader::new(Terminator::Lf);
        let overflows = std::iter::repeat(b'x')
            .take(MAX_FRAME_LEN * 3)
            .filter(|b| reader.feed(*b).is_err())
            .count();
        assert_eq!(overflows, 3);
        assert!(reader.pending() < MAX_FRAME_LEN);
    }

    #[test]
    fn every_terminated_payload_round_trips() {
        let payloads: [&[u8]; 4] = [b"", b"1,2,3", b"temp 21.5 C", b"\x00\x01binary"];
        for terminator in [Terminator::Cr, Terminator::Lf, Terminator::LfCr] {
            for payload in payloads {
                let mut reader = FrameReader::new(terminator);
                let mut bytes = payload.to_vec();
                bytes.extend_from_slice(terminator.as_bytes());
                let expected = String::from_utf8_lossy(payload).trim_end().to_string();
                assert_eq!(feed_all(&mut reader, &bytes), vec![expected]);
            }
        }
    }
}
