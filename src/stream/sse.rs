//! Incremental Server-Sent Events decoder.
//!
//! Only `data:` fields matter for the progress channel. Bytes arrive in
//! arbitrary chunks from the transport, so partial lines are buffered until
//! their terminator shows up, up to `MAX_LINE_LEN` bytes.

use std::error::Error as StdError;
use std::fmt;

/// Longest partial line kept while waiting for its terminator.
pub const MAX_LINE_LEN: usize = 64 * 1024;

/// The peer sent more than `MAX_LINE_LEN` bytes without a line break.
#[derive(Debug, PartialEq, Eq)]
pub struct LineTooLong {
    pub pending: usize,
}

impl fmt::Display for LineTooLong {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Event stream line exceeds {} bytes ({} pending)",
            MAX_LINE_LEN, self.pending
        )
    }
}

impl StdError for LineTooLong {}

#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    data: Vec<String>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds a chunk and returns the payload of every event it completed.
    /// The decoder is reset when the unterminated tail grows past the limit.
    pub fn feed(&mut self, chunk: &[u8]) -> Result<Vec<String>, LineTooLong> {
        self.buffer.extend_from_slice(chunk);

        let mut events = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let mut line: Vec<u8> = self.buffer.drain(..=pos).collect();
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }

            let line = String::from_utf8_lossy(&line);
            if let Some(event) = self.process_line(&line) {
                events.push(event);
            }
        }

        if self.buffer.len() > MAX_LINE_LEN {
            let pending = self.buffer.len();
            self.buffer.clear();
            self.data.clear();
            return Err(LineTooLong { pending });
        }
        Ok(events)
    }

    fn process_line(&mut self, line: &str) -> Option<String> {
        if line.is_empty() {
            if self.data.is_empty() {
                return None;
            }
            let payload = self.data.join("\n");
            self.data.clear();
            return Some(payload);
        }

        if line.starts_with(':') {
            return None;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };

        if field == "data" {
            self.data.push(value.to_string());
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_single_event() {
        let mut decoder = SseDecoder::new();
        let events = decoder.feed(b"data: {\"FileName\":\"a.csv\"}\n\n").unwrap();
        assert_eq!(events, vec!["{\"FileName\":\"a.csv\"}".to_string()]);
    }

    #[test]
    fn buffers_partial_chunks() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.feed(b"data: {\"Proc").unwrap().is_empty());
        assert!(decoder.feed(b"essed\":1}\r\n").unwrap().is_empty());
        let events = decoder.feed(b"\r\ndata: second\n\n").unwrap();
        assert_eq!(events, vec!["{\"Processed\":1}".to_string(), "second".to_string()]);
    }

    #[test]
    fn joins_multiline_data_and_skips_other_fields() {
        let mut decoder = SseDecoder::new();
        let events = decoder
            .feed(b": keepalive\nevent: progress\nid: 4\ndata: one\ndata:two\n\n")
            .unwrap();
        assert_eq!(events, vec!["one\ntwo".to_string()]);
    }

    #[test]
    fn blank_lines_without_data_dispatch_nothing() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.feed(b"\n\n\r\n").unwrap().is_empty());
    }

    #[test]
    fn unterminated_line_past_the_limit_is_rejected() {
        let mut decoder = SseDecoder::new();
        let chunk = vec![b'x'; MAX_LINE_LEN / 2];
        assert!(decoder.feed(b"data: ").unwrap().is_empty());
        assert!(decoder.feed(&chunk).unwrap().is_empty());

        let err = decoder.feed(&chunk).unwrap_err();
        assert_eq!(err.pending, MAX_LINE_LEN + 6);

        // The oversized tail is gone, later events decode normally.
        let events = decoder.feed(b"\ndata: ok\n\n").unwrap();
        assert_eq!(events, vec!["ok".to_string()]);
    }

    #[test]
    fn long_chunk_of_complete_lines_is_fine() {
        let mut decoder = SseDecoder::new();
        let line = format!("data: {}\n\n", "7".repeat(1000));
        let chunk = line.repeat(70);
        assert!(chunk.len() > MAX_LINE_LEN);

        let events = decoder.feed(chunk.as_bytes()).unwrap();
        assert_eq!(events.len(), 70);
    }
}
