//! Incremental byte-to-line decoding.
//!
//! Network chunks arrive at arbitrary boundaries: a multi-byte UTF-8
//! character or a line may be split across two reads. [`LineDecoder`] keeps
//! the undecoded byte tail and the unterminated text tail between calls so
//! that feeding a body in pieces yields exactly the same lines as feeding it
//! in one go.

/// Stateful UTF-8 decoder and `\n` line splitter.
#[derive(Debug, Default)]
pub struct LineDecoder {
    /// Trailing bytes of an incomplete UTF-8 sequence
    pending_bytes: Vec<u8>,
    /// Decoded text not yet terminated by a newline
    line_buffer: String,
}

impl LineDecoder {
    /// Create a new decoder with empty buffers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk of bytes, returning every line it completes.
    ///
    /// Lines are returned without their `\n` terminator; a trailing `\r` is
    /// stripped as well so CRLF streams parse the same as LF streams. Text
    /// after the last newline is retained and prefixed onto the next call.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<String> {
        self.decode(chunk);

        let mut lines = Vec::new();
        let mut consumed = 0;
        for (pos, _) in self.line_buffer.match_indices('\n') {
            let line = &self.line_buffer[consumed..pos];
            lines.push(line.strip_suffix('\r').unwrap_or(line).to_string());
            consumed = pos + 1;
        }
        self.line_buffer.drain(..consumed);
        lines
    }

    /// Drain the final partial line at end of stream.
    ///
    /// An incomplete UTF-8 sequence left at end of stream is emitted as
    /// U+FFFD rather than dropped.
    pub fn flush(&mut self) -> Option<String> {
        if !self.pending_bytes.is_empty() {
            self.pending_bytes.clear();
            self.line_buffer.push(char::REPLACEMENT_CHARACTER);
        }

        if self.line_buffer.is_empty() {
            return None;
        }

        let mut line = std::mem::take(&mut self.line_buffer);
        if line.ends_with('\r') {
            line.pop();
        }
        Some(line)
    }

    /// Text received after the last newline.
    pub fn buffered(&self) -> &str {
        &self.line_buffer
    }

    /// Whether the decoder holds undispatched bytes or text.
    pub fn has_pending(&self) -> bool {
        !self.pending_bytes.is_empty() || !self.line_buffer.is_empty()
    }

    /// Append `chunk` to the byte tail and move every decodable prefix into
    /// the line buffer. Invalid sequences become U+FFFD; an incomplete
    /// sequence at the end stays in `pending_bytes` for the next chunk.
    fn decode(&mut self, chunk: &[u8]) {
        self.pending_bytes.extend_from_slice(chunk);

        let mut start = 0;
        while start < self.pending_bytes.len() {
            match std::str::from_utf8(&self.pending_bytes[start..]) {
                Ok(text) => {
                    self.line_buffer.push_str(text);
                    start = self.pending_bytes.len();
                }
                Err(err) => {
                    let valid_end = start + err.valid_up_to();
                    self.line_buffer
                        .push_str(&String::from_utf8_lossy(&self.pending_bytes[start..valid_end]));
                    match err.error_len() {
                        Some(invalid_len) => {
                            self.line_buffer.push(char::REPLACEMENT_CHARACTER);
                            start = valid_end + invalid_len;
                        }
                        None => {
                            start = valid_end;
                            break;
                        }
                    }
                }
            }
        }

        self.pending_bytes.drain(..start);
    }
}
