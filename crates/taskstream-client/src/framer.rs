use tracing::debug;

use crate::envelope::{self, EventEnvelope};

/// Marker prefix for data lines. Everything else (heartbeats, blank
/// separators) is ignored.
const DATA_MARKER: &str = "data:";

/// Incremental decoder for the newline-delimited event stream.
///
/// Accepts raw byte chunks in arrival order and emits complete envelopes.
/// A partial trailing line is carried over to the next chunk; splitting on
/// the `\n` byte is safe across UTF-8 multi-byte boundaries because no
/// continuation byte equals `0x0A`.
#[derive(Debug, Default)]
pub struct EventFramer {
    buf: Vec<u8>,
    decoded: u64,
    dropped: u64,
}

impl EventFramer {
    /// Feeds one chunk and drains every complete envelope.
    ///
    /// A data line that fails to parse is skipped and counted, never fatal.
    pub fn push_chunk(&mut self, chunk: &[u8]) -> Vec<EventEnvelope> {
        self.buf.extend_from_slice(chunk);
        let mut envelopes = Vec::new();

        while let Some(newline) = self.buf.iter().position(|byte| *byte == b'\n') {
            let line = String::from_utf8_lossy(&self.buf[..newline]).into_owned();
            self.buf.drain(..=newline);

            let line = line.trim_end_matches('\r');
            let Some(rest) = line.strip_prefix(DATA_MARKER) else {
                continue;
            };
            let payload = rest.trim_start();
            if payload.is_empty() {
                continue;
            }
            match envelope::decode_wire(payload) {
                Ok(envelope) => {
                    self.decoded += 1;
                    envelopes.push(envelope);
                }
                Err(error) => {
                    self.dropped += 1;
                    debug!(dropped = self.dropped, %error, "skipping malformed data line");
                }
            }
        }

        envelopes
    }

    /// True when a partial line is still buffered.
    pub fn has_residual(&self) -> bool {
        !self.buf.is_empty()
    }

    pub fn residual_len(&self) -> usize {
        self.buf.len()
    }

    /// Envelopes decoded so far.
    pub fn decoded(&self) -> u64 {
        self.decoded
    }

    /// Data lines skipped because they failed to parse.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::EventKind;

    const STREAM: &str = concat!(
        "data: {\"type\":\"step_start\",\"level\":\"info\",\"message\":\"Starting step 1\",\"step\":1}\n",
        "\n",
        ": heartbeat\n",
        "data: {\"type\":\"step_action\",\"level\":\"info\",\"message\":\"Executing: click\",\"step\":1,\"data\":{\"action\":\"click\"}}\n",
        "\n",
        "data: {\"type\":\"done\",\"level\":\"success\",\"message\":\"finished\",\"data\":{\"success\":true}}\n",
        "\n",
    );

    fn kinds(envelopes: &[EventEnvelope]) -> Vec<EventKind> {
        envelopes.iter().map(|e| e.kind.clone()).collect()
    }

    #[test]
    fn decodes_complete_stream_in_order() {
        let mut framer = EventFramer::default();
        let envelopes = framer.push_chunk(STREAM.as_bytes());
        assert_eq!(
            kinds(&envelopes),
            vec![EventKind::StepStarted, EventKind::StepAction, EventKind::Done]
        );
        assert_eq!(framer.decoded(), 3);
        assert_eq!(framer.dropped(), 0);
        assert!(!framer.has_residual());
    }

    #[test]
    fn framing_is_split_invariant() {
        let reference = EventFramer::default().push_chunk(STREAM.as_bytes());
        let bytes = STREAM.as_bytes();
        for split in 0..=bytes.len() {
            let mut framer = EventFramer::default();
            let mut envelopes = framer.push_chunk(&bytes[..split]);
            envelopes.extend(framer.push_chunk(&bytes[split..]));
            assert_eq!(envelopes, reference, "split at byte {split}");
        }
    }

    #[test]
    fn partial_line_carries_over_chunk_boundary() {
        let mut framer = EventFramer::default();
        let first = framer.push_chunk(b"data: {\"type\":\"progress\",\"lev");
        assert!(first.is_empty());
        assert!(framer.has_residual());
        let second = framer.push_chunk(b"el\":\"info\",\"message\":\"working\"}\n");
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].message, "working");
    }

    #[test]
    fn multibyte_codepoint_split_across_chunks_decodes_intact() {
        let line = "data: {\"type\":\"progress\",\"level\":\"info\",\"message\":\"Seite geöffnet ✓\"}\n";
        let bytes = line.as_bytes();
        // Split inside the two-byte "ö".
        let split = line.find('ö').expect("umlaut") + 1;
        let mut framer = EventFramer::default();
        assert!(framer.push_chunk(&bytes[..split]).is_empty());
        let envelopes = framer.push_chunk(&bytes[split..]);
        assert_eq!(envelopes.len(), 1);
        assert_eq!(envelopes[0].message, "Seite geöffnet ✓");
    }

    #[test]
    fn malformed_line_is_dropped_not_fatal() {
        let mut framer = EventFramer::default();
        let stream = concat!(
            "data: {\"type\":\"step_start\",\"message\":\"a\"}\n",
            "data: {not json at all\n",
            "data: {\"type\":\"step_result\",\"message\":\"b\"}\n",
        );
        let envelopes = framer.push_chunk(stream.as_bytes());
        assert_eq!(envelopes.len(), 2);
        assert_eq!(framer.dropped(), 1);
        assert_eq!(framer.decoded(), 2);
    }

    #[test]
    fn non_data_lines_are_ignored_silently() {
        let mut framer = EventFramer::default();
        let envelopes = framer.push_chunk(b": heartbeat\n\nretry: 3000\n");
        assert!(envelopes.is_empty());
        assert_eq!(framer.dropped(), 0);
    }

    #[test]
    fn crlf_line_endings_are_accepted() {
        let mut framer = EventFramer::default();
        let envelopes =
            framer.push_chunk(b"data: {\"type\":\"progress\",\"message\":\"x\"}\r\n\r\n");
        assert_eq!(envelopes.len(), 1);
    }

    #[test]
    fn dangling_partial_line_is_never_emitted() {
        let mut framer = EventFramer::default();
        let envelopes = framer.push_chunk(b"data: {\"type\":\"done\",\"message\":\"no newline\"}");
        assert!(envelopes.is_empty());
        assert!(framer.has_residual());
        assert_eq!(framer.residual_len(), 44);
    }
}
