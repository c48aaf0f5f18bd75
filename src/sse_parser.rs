//! SSE (Server-Sent Events) record decoder for run streams.
//!
//! Handles:
//! - Byte buffering with UTF-8 boundary carryover
//! - Line splitting (handles both `\n` and `\r\n`)
//! - Field parsing (`data:`, `event:`, `id:`, `retry:`, comments)
//! - Record assembly (fields accumulated until a blank line)
//!
//! The decoder is pure and incremental: callers push chunks in arrival
//! order and get back every record that became complete, in order. A
//! record is complete only once its terminating blank line has been seen.
//! Partial input is carried verbatim as the remainder, so any chunking of
//! the byte stream yields the same record sequence as the unsplit stream.
//!
//! # Design Decision
//!
//! This is a custom decoder rather than `eventsource-stream` or
//! `reqwest-eventsource` because those crates flush partial events at end
//! of input and add reconnection machinery. Replay-equivalence requires
//! the opposite: an unterminated record must never be emitted, and
//! connection lifecycle is owned by the session controller.

/// An SSE line extracted from the stream.
#[derive(Debug, Clone, PartialEq)]
pub enum SseLine {
    /// A `data:` line with the payload (prefix stripped).
    Data(String),
    /// An `event:` line with the event type.
    Event(String),
    /// An `id:` line with the event ID.
    Id(String),
    /// A `retry:` line with reconnection time (ms).
    Retry(u64),
    /// An empty line (record boundary in SSE).
    Empty,
    /// A comment line (starts with `:`).
    Comment(String),
}

/// A complete SSE record assembled from one or more lines.
#[derive(Debug, Clone, PartialEq)]
pub struct SseRecord {
    /// Event type from the `event:` line, if one was present.
    pub event: Option<String>,
    /// Data payload; multiple `data:` lines are joined with `\n`.
    pub data: String,
}

fn parse_line(line: &str) -> SseLine {
    if line.is_empty() {
        return SseLine::Empty;
    }

    if let Some(data) = line.strip_prefix("data:") {
        let data = data.strip_prefix(' ').unwrap_or(data);
        return SseLine::Data(data.to_string());
    }

    if let Some(event) = line.strip_prefix("event:") {
        let event = event.strip_prefix(' ').unwrap_or(event);
        return SseLine::Event(event.to_string());
    }

    if let Some(id) = line.strip_prefix("id:") {
        let id = id.strip_prefix(' ').unwrap_or(id);
        return SseLine::Id(id.to_string());
    }

    if let Some(retry) = line.strip_prefix("retry:") {
        let retry = retry.strip_prefix(' ').unwrap_or(retry).trim();
        if let Ok(value) = retry.parse::<u64>() {
            return SseLine::Retry(value);
        }
        return SseLine::Comment(line.to_string());
    }

    if let Some(comment) = line.strip_prefix(':') {
        let comment = comment.strip_prefix(' ').unwrap_or(comment);
        return SseLine::Comment(comment.to_string());
    }

    // Unknown field, treat as comment
    SseLine::Comment(line.to_string())
}

#[derive(Default)]
struct RecordBuilder {
    data_lines: Vec<String>,
    event: Option<String>,
}

impl RecordBuilder {
    fn push_line(&mut self, line: SseLine) {
        match line {
            SseLine::Data(data) => self.data_lines.push(data),
            SseLine::Event(event) => self.event = Some(event),
            // IDs and retry hints are valid framing but carry nothing the
            // conversation engine consumes.
            SseLine::Id(_) | SseLine::Retry(_) => {}
            SseLine::Empty | SseLine::Comment(_) => {}
        }
    }

    fn has_content(&self) -> bool {
        !self.data_lines.is_empty() || self.event.is_some()
    }

    fn build(&mut self) -> SseRecord {
        let data = self.data_lines.join("\n");
        let event = self.event.take();
        self.data_lines.clear();
        SseRecord { event, data }
    }
}

/// Decode every blank-line-terminated record at the front of `buffer`.
///
/// Returns the records in framing order together with the unconsumed
/// remainder. Lines belonging to a record whose blank-line terminator has
/// not arrived yet are left in the remainder verbatim, so a later call on
/// `remainder + more_input` completes them. Comment lines, `id:`/`retry:`
/// fields, and lines that match no SSE field are ignored.
#[must_use]
pub fn decode_records(buffer: &str) -> (Vec<SseRecord>, &str) {
    let mut records = Vec::new();
    let mut builder = RecordBuilder::default();
    let mut consumed = 0;
    let mut pos = 0;

    while let Some(newline) = buffer[pos..].find('\n') {
        let mut line = &buffer[pos..pos + newline];
        pos += newline + 1;

        if let Some(stripped) = line.strip_suffix('\r') {
            line = stripped;
        }

        match parse_line(line) {
            SseLine::Empty => {
                if builder.has_content() {
                    records.push(builder.build());
                }
                // Only a record boundary moves the consumption point; any
                // lines after it stay buffered until their own boundary.
                consumed = pos;
            }
            other => builder.push_line(other),
        }
    }

    (records, &buffer[consumed..])
}

/// Incremental SSE decoder holding partial input between chunks.
///
/// Byte pushes tolerate chunk splits anywhere, including inside a UTF-8
/// multi-byte sequence: the incomplete suffix is held back until the
/// remaining bytes arrive.
#[derive(Debug, Default)]
pub struct SseDecoder {
    /// Undecoded byte tail (an incomplete UTF-8 sequence, at most 3 bytes).
    raw: Vec<u8>,
    /// Text not yet consumed by a complete record.
    buffer: String,
}

impl SseDecoder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Push a chunk of bytes and return every record it completed.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<SseRecord> {
        self.raw.extend_from_slice(chunk);

        loop {
            match std::str::from_utf8(&self.raw) {
                Ok(text) => {
                    self.buffer.push_str(text);
                    self.raw.clear();
                    break;
                }
                Err(e) => {
                    let valid = e.valid_up_to();
                    self.buffer
                        .push_str(&String::from_utf8_lossy(&self.raw[..valid]));
                    match e.error_len() {
                        Some(len) => {
                            // Genuinely invalid bytes: replace and move on.
                            self.buffer.push('\u{FFFD}');
                            self.raw.drain(..valid + len);
                        }
                        None => {
                            // Incomplete trailing sequence: keep for the
                            // next chunk.
                            self.raw.drain(..valid);
                            break;
                        }
                    }
                }
            }
        }

        self.drain_records()
    }

    /// Push an already-decoded text chunk.
    pub fn push_str(&mut self, chunk: &str) -> Vec<SseRecord> {
        self.buffer.push_str(chunk);
        self.drain_records()
    }

    /// Text held back waiting for the rest of its record.
    #[must_use]
    pub fn remainder(&self) -> &str {
        &self.buffer
    }

    fn drain_records(&mut self) -> Vec<SseRecord> {
        let (records, rest) = decode_records(&self.buffer);
        let consumed = self.buffer.len() - rest.len();
        self.buffer.drain(..consumed);
        records
    }
}
