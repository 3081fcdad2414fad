//! Incremental decoder for `text/event-stream` bodies.

use super::HubError;

/// Longest partial line buffered before the stream is rejected.
pub const MAX_LINE_LEN: usize = 1 << 20;

/// Keep-alive payload the hub sends on idle streams.
const PING: &str = "ping";

/// Buffers response chunks and yields the `data` payload of each complete event.
///
/// Multi-line `data` fields are joined with `\n`; `event`, `id`, `retry` and
/// comment lines are ignored.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    data: Vec<String>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Buffer a chunk of the response body.
    ///
    /// Fails once an unterminated line grows past [`MAX_LINE_LEN`].
    pub fn push(&mut self, chunk: &[u8]) -> Result<(), HubError> {
        self.buffer.extend_from_slice(chunk);

        let pending = match self.buffer.iter().rposition(|&b| b == b'\n') {
            Some(end) => self.buffer.len() - end - 1,
            None => self.buffer.len(),
        };
        if pending > MAX_LINE_LEN {
            self.buffer.clear();
            self.data.clear();
            return Err(HubError::LineTooLong {
                limit: MAX_LINE_LEN,
            });
        }
        Ok(())
    }

    /// The next complete event payload, skipping keep-alives.
    ///
    /// Returns `None` when more input is needed.
    pub fn next_data(&mut self) -> Option<String> {
        loop {
            let end = self.buffer.iter().position(|&b| b == b'\n')?;
            let raw: Vec<u8> = self.buffer.drain(..=end).collect();
            let line = String::from_utf8_lossy(&raw);
            let line = line.trim_end_matches(['\n', '\r']);

            if line.is_empty() {
                if self.data.is_empty() {
                    continue;
                }
                let payload = self.data.join("\n");
                self.data.clear();
                if payload == PING {
                    continue;
                }
                return Some(payload);
            }

            if line.starts_with(':') {
                continue;
            }

            let (field, value) = line.split_once(':').unwrap_or((line, ""));
            if field == "data" {
                self.data
                    .push(value.strip_prefix(' ').unwrap_or(value).to_string());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_event() {
        let mut decoder = SseDecoder::new();
        decoder.push(b"data: {\"a\":1}\n\n").unwrap();
        assert_eq!(decoder.next_data().as_deref(), Some("{\"a\":1}"));
        assert_eq!(decoder.next_data(), None);
    }

    #[test]
    fn test_event_split_across_chunks() {
        let mut decoder = SseDecoder::new();
        decoder.push(b"da").unwrap();
        assert_eq!(decoder.next_data(), None);
        decoder.push(b"ta: hel").unwrap();
        assert_eq!(decoder.next_data(), None);
        decoder.push(b"lo\r\n").unwrap();
        assert_eq!(decoder.next_data(), None);
        decoder.push(b"\r\n").unwrap();
        assert_eq!(decoder.next_data().as_deref(), Some("hello"));
    }

    #[test]
    fn test_skips_ping_and_comments() {
        let mut decoder = SseDecoder::new();
        decoder.push(b": keep-alive\n\ndata: ping\n\nevent: message\nid: 7\ndata: x\n\n").unwrap();
        assert_eq!(decoder.next_data().as_deref(), Some("x"));
        assert_eq!(decoder.next_data(), None);
    }

    #[test]
    fn test_multi_line_data_and_several_events() {
        let mut decoder = SseDecoder::new();
        decoder.push(b"data: one\ndata: two\n\ndata:three\n\n").unwrap();
        assert_eq!(decoder.next_data().as_deref(), Some("one\ntwo"));
        assert_eq!(decoder.next_data().as_deref(), Some("three"));
        assert_eq!(decoder.next_data(), None);
    }

    #[test]
    fn test_unterminated_line_is_capped() {
        let mut decoder = SseDecoder::new();
        decoder.push(b"data: ok\n\n").unwrap();
        let chunk = vec![b'x'; MAX_LINE_LEN / 2 + 1];
        decoder.push(b"data: ").unwrap();
        decoder.push(&chunk).unwrap();
        assert!(matches!(
            decoder.push(&chunk),
            Err(HubError::LineTooLong { limit: MAX_LINE_LEN })
        ));
    }

    #[test]
    fn test_long_stream_of_short_lines_is_accepted() {
        let mut decoder = SseDecoder::new();
        let event = b"data: {\"event_type\":\"state_changed\"}\n\n";
        let chunk: Vec<u8> = event.iter().copied().cycle().take(event.len() * 40_000).collect();
        assert!(chunk.len() > MAX_LINE_LEN);
        decoder.push(&chunk).unwrap();
        assert!(decoder.next_data().is_some());
    }
}
