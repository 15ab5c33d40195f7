//! Streaming reply decoder
//!
//! The chat endpoint answers with newline-delimited `data: {json}` records.
//! Network chunks do not respect line boundaries, so bytes are buffered until
//! a `\n` arrives. Splitting happens on raw bytes: `\n` never appears inside
//! a multi-byte UTF-8 sequence, so a character cut between two chunks is
//! reassembled before the line is decoded.
//!
//! Each `content` value is the full reply so far (a snapshot, not a delta).

use serde::Deserialize;
use serde_json::Value as JsonValue;

const DATA_PREFIX: &str = "data:";

/// One parsed `data:` record
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct StreamFrame {
    /// Cumulative reply text
    #[serde(default)]
    pub content: Option<String>,
    /// Server-reported failure
    #[serde(default)]
    pub error: Option<String>,
    /// Set on the final record by some backends; informational only
    #[serde(default)]
    pub done: Option<bool>,
}

/// Outcome of decoding one complete line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodedLine {
    Frame(StreamFrame),
    /// Blank line or another SSE field
    Ignored,
    /// A `data:` line that could not be used; the stream continues
    Malformed { line: String, reason: String },
}

/// Decode one complete line (without its terminator)
pub fn parse_line(line: &str) -> DecodedLine {
    let line = line.strip_suffix('\r').unwrap_or(line);
    let Some(payload) = line.strip_prefix(DATA_PREFIX) else {
        return DecodedLine::Ignored;
    };
    let payload = payload.strip_prefix(' ').unwrap_or(payload);

    let malformed = |reason: String| DecodedLine::Malformed {
        line: line.to_string(),
        reason,
    };

    let value: JsonValue = match serde_json::from_str(payload) {
        Ok(value) => value,
        Err(e) => return malformed(format!("invalid JSON: {e}")),
    };
    if !value.is_object() {
        return malformed("record is not a JSON object".to_string());
    }
    match serde_json::from_value::<StreamFrame>(value) {
        Ok(frame) if frame.content.is_none() && frame.error.is_none() => {
            malformed("record has neither content nor error".to_string())
        }
        Ok(frame) => DecodedLine::Frame(frame),
        Err(e) => malformed(format!("unexpected field type: {e}")),
    }
}

/// Reassembles lines across chunk boundaries
#[derive(Debug, Default, Clone)]
pub struct LineDecoder {
    pending: Vec<u8>,
}

impl LineDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one network chunk; returns every line it completed, in order
    pub fn push(&mut self, chunk: &[u8]) -> Vec<DecodedLine> {
        self.pending.extend_from_slice(chunk);

        let Some(last_newline) = self.pending.iter().rposition(|&b| b == b'\n') else {
            return Vec::new();
        };
        let rest = self.pending.split_off(last_newline + 1);
        let complete = std::mem::replace(&mut self.pending, rest);

        complete[..last_newline]
            .split(|&b| b == b'\n')
            .map(|raw| match std::str::from_utf8(raw) {
                Ok(line) => parse_line(line),
                Err(e) => DecodedLine::Malformed {
                    line: String::from_utf8_lossy(raw).into_owned(),
                    reason: format!("invalid UTF-8: {e}"),
                },
            })
            .collect()
    }

    /// End of stream: drop any unterminated line, returning its length
    pub fn finish(&mut self) -> usize {
        let discarded = self.pending.len();
        self.pending.clear();
        discarded
    }

    /// Bytes waiting for a line terminator
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn content(line: &DecodedLine) -> Option<&str> {
        match line {
            DecodedLine::Frame(frame) => frame.content.as_deref(),
            _ => None,
        }
    }

    #[test]
    fn test_record_split_mid_json() {
        let mut decoder = LineDecoder::new();
        assert!(decoder.push(b"data: {\"cont").is_empty());
        let lines = decoder.push(b"ent\": \"Hello\"}\n");
        assert_eq!(lines.len(), 1);
        assert_eq!(content(&lines[0]), Some("Hello"));
        assert_eq!(decoder.finish(), 0);
    }

    #[test]
    fn test_multibyte_char_split_across_chunks() {
        let bytes = "data: {\"content\": \"caf\u{e9} \u{1f600}\"}\n".as_bytes();
        // Cut inside the 4-byte emoji
        let cut = bytes.len() - 5;
        let mut decoder = LineDecoder::new();
        assert!(decoder.push(&bytes[..cut]).is_empty());
        let lines = decoder.push(&bytes[cut..]);
        assert_eq!(content(&lines[0]), Some("caf\u{e9} \u{1f600}"));
    }

    #[test]
    fn test_sse_framing_and_crlf() {
        let mut decoder = LineDecoder::new();
        let lines = decoder.push(b"event: message\r\ndata:{\"content\":\"a\"}\r\n\r\n");
        assert_eq!(
            lines.iter().filter(|l| **l == DecodedLine::Ignored).count(),
            2
        );
        assert_eq!(content(&lines[1]), Some("a"));
    }

    #[test]
    fn test_error_and_done_fields() {
        let DecodedLine::Frame(frame) = parse_line(r#"data: {"error": "quota exceeded"}"#) else {
            panic!("expected a frame");
        };
        assert_eq!(frame.error.as_deref(), Some("quota exceeded"));
        assert_eq!(frame.content, None);

        let DecodedLine::Frame(frame) = parse_line(r#"data: {"content": "x", "done": true}"#) else {
            panic!("expected a frame");
        };
        assert_eq!(frame.done, Some(true));
    }

    #[test]
    fn test_malformed_records_do_not_stop_decoding() {
        let mut decoder = LineDecoder::new();
        let lines = decoder.push(
            b"data: {not json}\ndata: [1,2]\ndata: {\"other\": 1}\ndata: {\"content\": \"ok\"}\n",
        );
        assert_eq!(lines.len(), 4);
        assert!(lines[..3]
            .iter()
            .all(|l| matches!(l, DecodedLine::Malformed { .. })));
        assert_eq!(content(&lines[3]), Some("ok"));
    }

    #[test]
    fn test_unterminated_tail_discarded() {
        let mut decoder = LineDecoder::new();
        decoder.push(b"data: {\"content\": \"a\"}\ndata: {\"content\": \"ab");
        assert_eq!(decoder.pending_len(), 21);
        assert_eq!(decoder.finish(), 21);
        assert_eq!(decoder.pending_len(), 0);
    }
}
