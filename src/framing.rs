//! Incremental frame extraction from a chunked byte stream
//!
//! Frames are bare JSON objects written back to back with no length
//! prefix and no delimiter. Boundaries are recovered by counting braces:
//! a depth counter goes up on `{` and down on `}`, and a frame ends on
//! the `}` that returns the depth to zero. Characters inside JSON string
//! values are excluded from the count via a quote flag that honors
//! backslash escapes, so braces or quotes in payload strings cannot
//! break a frame apart.
//!
//! The scanner is incremental: bytes are pushed as they arrive off the
//! socket, and complete frames come out as soon as their closing brace
//! does, however the stream was chunked. It works on bytes rather than
//! chars (the structural characters of JSON are all ASCII), so a
//! multi-byte UTF-8 sequence split across two reads cannot desynchronize
//! the scan.
//!
//! A `}` seen at depth zero cannot belong to any well-formed frame; the
//! scanner flushes everything up to and including it as a (garbage)
//! frame, which the caller's JSON parse then rejects. That trades one
//! lost frame for a resynchronized stream.

/// Incremental brace-counting frame scanner.
///
/// One instance per connection; it owns the carry-over buffer between
/// socket reads.
#[derive(Debug, Default)]
pub struct FrameScanner {
    buf: Vec<u8>,
    /// Resume offset of the scan within `buf`.
    pos: usize,
    depth: usize,
    in_str: bool,
    escaped: bool,
}

impl FrameScanner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed newly received bytes, returning every frame completed by
    /// them, in arrival order. Bytes of a still-incomplete frame stay
    /// buffered for the next call.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<Vec<u8>> {
        self.buf.extend_from_slice(chunk);

        let mut frames = Vec::new();
        let mut cut = 0;

        while self.pos < self.buf.len() {
            let byte = self.buf[self.pos];
            if self.in_str {
                if self.escaped {
                    self.escaped = false;
                } else if byte == b'\\' {
                    self.escaped = true;
                } else if byte == b'"' {
                    self.in_str = false;
                }
            } else {
                match byte {
                    b'"' => self.in_str = true,
                    b'{' => self.depth += 1,
                    b'}' => {
                        self.depth = self.depth.saturating_sub(1);
                        if self.depth == 0 {
                            frames.push(self.buf[cut..=self.pos].to_vec());
                            cut = self.pos + 1;
                        }
                    }
                    _ => {}
                }
            }
            self.pos += 1;
        }

        if cut > 0 {
            self.buf.drain(..cut);
            self.pos -= cut;
        }
        frames
    }

    /// Bytes buffered for a frame whose closing brace has not arrived.
    pub fn pending(&self) -> &[u8] {
        &self.buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frames_as_strings(frames: Vec<Vec<u8>>) -> Vec<String> {
        frames
            .into_iter()
            .map(|raw| String::from_utf8(raw).unwrap())
            .collect()
    }

    #[test]
    fn test_single_frame_single_push() {
        let mut scanner = FrameScanner::new();
        let frames = scanner.push(br#"{"type":"on","eventName":"ping"}"#);
        assert_eq!(
            frames_as_strings(frames),
            vec![r#"{"type":"on","eventName":"ping"}"#]
        );
        assert!(scanner.pending().is_empty());
    }

    #[test]
    fn test_multiple_frames_one_push() {
        let mut scanner = FrameScanner::new();
        let frames = scanner.push(br#"{"a":1}{"b":{"c":2}}{"d":3}"#);
        assert_eq!(
            frames_as_strings(frames),
            vec![r#"{"a":1}"#, r#"{"b":{"c":2}}"#, r#"{"d":3}"#]
        );
    }

    #[test]
    fn test_frame_split_across_pushes() {
        let mut scanner = FrameScanner::new();
        assert!(scanner.push(br#"{"type":"emit","da"#).is_empty());
        assert_eq!(scanner.pending(), br#"{"type":"emit","da"#);

        let frames = scanner.push(br#"ta":{"n":1}}"#);
        assert_eq!(
            frames_as_strings(frames),
            vec![r#"{"type":"emit","data":{"n":1}}"#]
        );
        assert!(scanner.pending().is_empty());
    }

    #[test]
    fn test_brace_and_quote_inside_string() {
        let mut scanner = FrameScanner::new();
        let frames = scanner.push(br#"{"msg":"a { b } c \" d { e"}"#);
        assert_eq!(
            frames_as_strings(frames),
            vec![r#"{"msg":"a { b } c \" d { e"}"#]
        );
    }

    #[test]
    fn test_escape_split_across_chunks() {
        // Backslash is the last byte of the first chunk, the escaped
        // quote the first byte of the second.
        let mut scanner = FrameScanner::new();
        assert!(scanner.push(b"{\"msg\":\"x\\").is_empty());
        let frames = scanner.push(b"\"}\"}");
        assert_eq!(frames_as_strings(frames), vec![r#"{"msg":"x\"}"}"#]);
    }

    #[test]
    fn test_utf8_split_mid_character() {
        let text = r#"{"msg":"héllo — ßtream"}"#.as_bytes();
        // Split inside the two-byte encoding of 'é'.
        let split = text.iter().position(|&b| b == 0xC3).unwrap() + 1;
        let mut scanner = FrameScanner::new();
        assert!(scanner.push(&text[..split]).is_empty());
        let frames = scanner.push(&text[split..]);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0], text);
    }

    #[test]
    fn test_chunk_boundary_independence() {
        let stream = concat!(
            r#"{"type":"emit","eventName":"sendPacket","data":{"packet":"0000002A01"},"id":"a-1"}"#,
            r#"{"type":"return","eventName":"sendPacket","data":"ok {\"nested\"} \\ done","id":"a-1"}"#,
            r#"{"type":"error","msg":"no subscriber for event: héllo"}"#,
        )
        .as_bytes();

        let mut whole = FrameScanner::new();
        let expected = whole.push(stream);
        assert_eq!(expected.len(), 3);

        for split in 0..=stream.len() {
            let mut scanner = FrameScanner::new();
            let mut frames = scanner.push(&stream[..split]);
            frames.extend(scanner.push(&stream[split..]));
            assert_eq!(frames, expected, "split at byte {}", split);
            assert!(scanner.pending().is_empty());
        }

        // Degenerate chunking: one byte at a time.
        let mut scanner = FrameScanner::new();
        let mut frames = Vec::new();
        for byte in stream {
            frames.extend(scanner.push(&[*byte]));
        }
        assert_eq!(frames, expected);
    }

    #[test]
    fn test_stray_close_brace_flushed_as_garbage() {
        let mut scanner = FrameScanner::new();
        let frames = scanner.push(br#"}{"ok":true}"#);
        // The stray brace comes out as its own (unparseable) frame; the
        // real frame behind it is intact.
        assert_eq!(frames_as_strings(frames), vec!["}", r#"{"ok":true}"#]);
    }

    #[test]
    fn test_garbage_prefix_attaches_to_next_frame() {
        let mut scanner = FrameScanner::new();
        let frames = scanner.push(br#"noise{"ok":true}"#);
        assert_eq!(frames_as_strings(frames), vec![r#"noise{"ok":true}"#]);
    }

    #[test]
    fn test_interleaved_whitespace_between_frames() {
        let mut scanner = FrameScanner::new();
        let frames = scanner.push(b"{\"a\":1}\n  {\"b\":2}");
        assert_eq!(
            frames_as_strings(frames),
            vec![r#"{"a":1}"#, "\n  {\"b\":2}"]
        );
    }

    #[test]
    fn test_empty_push_yields_nothing() {
        let mut scanner = FrameScanner::new();
        assert!(scanner.push(b"").is_empty());
        assert!(scanner.pending().is_empty());
    }
}
