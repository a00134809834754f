// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Newline framing of the device byte stream.

/// The byte that terminates every protocol line.
pub const LINE_TERMINATOR: u8 = b'\n';

/// Largest partial line kept before it is discarded.
///
/// Device lines are well under 200 bytes; 8192 is generous headroom.
pub const DEFAULT_MAX_LINE_LENGTH: usize = 8192;

/// Splits received byte chunks into complete protocol lines.
///
/// Bytes are buffered until a `\n` arrives, so a line is never emitted before
/// it has been fully received. Emitted lines are decoded as UTF-8 (invalid
/// sequences are replaced), trimmed, and dropped if empty. A line that grows
/// past the limit is dropped whole, up to and including its terminator.
///
/// # Examples
///
/// ```
/// use laserctl_lib::protocol::FrameReader;
///
/// let mut frames = FrameReader::new();
/// assert!(frames.push(b"STA").is_empty());
/// assert_eq!(frames.push(b"TUS OK\r\n\nnext"), vec!["STATUS OK"]);
/// assert_eq!(frames.pending(), 4);
/// ```
#[derive(Debug, Clone)]
pub struct FrameReader {
    buffer: Vec<u8>,
    max_line_length: usize,
    discarding: bool,
}

impl Default for FrameReader {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameReader {
    /// Creates a frame reader with the default line limit.
    #[must_use]
    pub fn new() -> Self {
        Self::with_max_line_length(DEFAULT_MAX_LINE_LENGTH)
    }

    /// Creates a frame reader that discards partial lines longer than
    /// `max_line_length` bytes.
    #[must_use]
    pub fn with_max_line_length(max_line_length: usize) -> Self {
        Self {
            buffer: Vec::new(),
            max_line_length,
            discarding: false,
        }
    }

    /// Appends a chunk and returns every line it completed, in order.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        let mut chunk = chunk;
        if self.discarding {
            match chunk.iter().position(|&b| b == LINE_TERMINATOR) {
                Some(end) => {
                    self.discarding = false;
                    chunk = &chunk[end + 1..];
                }
                None => return Vec::new(),
            }
        }

        self.buffer.extend_from_slice(chunk);

        let mut lines = Vec::new();
        let mut start = 0;
        while let Some(offset) = self.buffer[start..]
            .iter()
            .position(|&b| b == LINE_TERMINATOR)
        {
            let end = start + offset;
            let line = String::from_utf8_lossy(&self.buffer[start..end]);
            let line = line.trim();
            if !line.is_empty() {
                lines.push(line.to_string());
            }
            start = end + 1;
        }
        self.buffer.drain(..start);

        if self.buffer.len() > self.max_line_length {
            tracing::warn!(
                len = self.buffer.len(),
                max = self.max_line_length,
                "Partial line exceeds limit, discarding until next terminator"
            );
            self.buffer.clear();
            self.discarding = true;
        }

        lines
    }

    /// Returns the number of buffered bytes awaiting a terminator.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    /// Drops any partial line.
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.discarding = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn complete_lines_in_one_chunk() {
        let mut frames = FrameReader::new();
        let lines = frames.push(b"one\ntwo\nthree\n");
        assert_eq!(lines, vec!["one", "two", "three"]);
        assert_eq!(frames.pending(), 0);
    }

    #[test]
    fn line_split_across_chunks_waits_for_terminator() {
        let mut frames = FrameReader::new();
        assert!(frames.push(b"{\"type\":\"heart").is_empty());
        assert!(frames.push(b"beat\"}").is_empty());
        assert_eq!(frames.push(b"\n"), vec![r#"{"type":"heartbeat"}"#]);
    }

    #[test]
    fn chunk_boundaries_do_not_change_output() {
        let stream = b"Laser State: ON\nLaser Brightness: 40%\n\nFW: v1.2\n";
        let expected: Vec<String> = stream
            .split(|&b| b == b'\n')
            .filter(|s| !s.is_empty())
            .map(|s| String::from_utf8_lossy(s).into_owned())
            .collect();

        for size in 1..stream.len() {
            let mut frames = FrameReader::new();
            let lines: Vec<String> = stream.chunks(size).flat_map(|c| frames.push(c)).collect();
            assert_eq!(lines, expected, "chunk size {size}");
        }
    }

    #[test]
    fn whitespace_and_empty_lines() {
        let mut frames = FrameReader::new();
        let lines = frames.push(b"  padded \r\n\r\n   \n\tdone\n");
        assert_eq!(lines, vec!["padded", "done"]);
    }

    #[test]
    fn multibyte_character_split_across_chunks() {
        let mut frames = FrameReader::new();
        let text = "Temp: 25\u{b0}C\n".as_bytes();
        let split = text.iter().position(|&b| b == 0xC2).unwrap() + 1;
        assert!(frames.push(&text[..split]).is_empty());
        assert_eq!(frames.push(&text[split..]), vec!["Temp: 25\u{b0}C"]);
    }

    #[test]
    fn oversized_partial_line_is_discarded() {
        let mut frames = FrameReader::with_max_line_length(8);
        assert!(frames.push(b"0123456789").is_empty());
        assert_eq!(frames.pending(), 0);
        assert_eq!(frames.push(b"ok\nnext\n"), vec!["next"]);
    }

    #[test]
    fn tail_of_oversized_line_is_not_emitted() {
        let mut frames = FrameReader::with_max_line_length(16);
        assert!(frames.push(b"xxxxxxxxxxxxxxxxxxxx").is_empty());
        assert!(frames.push(b" Laser State: ON, ").is_empty());
        assert!(frames.push(b"Laser Brightness: 40%").is_empty());
        assert_eq!(frames.push(b"\nFW: v1.2\n"), vec!["FW: v1.2"]);
        assert_eq!(frames.pending(), 0);
    }

    #[test]
    fn clear_drops_partial_line() {
        let mut frames = FrameReader::new();
        frames.push(b"partial");
        frames.clear();
        assert_eq!(frames.push(b"\n"), Vec::<String>::new());
    }
}
