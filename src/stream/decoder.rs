//! Incremental Server-Sent Events decoder.
//!
//! Chunks arrive from the transport at arbitrary byte boundaries, so the
//! decoder keeps a line buffer and a pending event between calls to
//! [`SseDecoder::feed`].

use std::time::Duration;

use tracing::{trace, warn};

/// Kind label used when a frame carries no `event:` field.
pub const DEFAULT_KIND: &str = "message";

/// Longest line kept in the buffer. Longer lines are dropped whole.
pub const MAX_LINE_LENGTH: usize = 1024 * 1024;

/// A fully dispatched SSE frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseFrame {
    /// Event kind label (`message` when the server sent none).
    pub kind: String,
    /// Data payload, lines joined with `\n`.
    pub data: String,
    /// Last event id in effect when this frame was dispatched.
    pub last_event_id: Option<String>,
}

/// Pending event fields between blank lines.
#[derive(Debug, Default)]
struct EventBuf {
    kind: Option<String>,
    data: Vec<String>,
    /// `id:` seen in this event; becomes the last event id on dispatch.
    id: Option<String>,
}

#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    pending: EventBuf,
    last_event_id: Option<String>,
    retry: Option<Duration>,
    bom_checked: bool,
    skip_lf: bool,
    /// Dropping the rest of an over-long line.
    overflowed: bool,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decoder that resumes from a previously seen event id.
    pub fn with_last_event_id(last_event_id: Option<String>) -> Self {
        Self {
            last_event_id: last_event_id.filter(|id| !id.is_empty()),
            ..Self::default()
        }
    }

    /// Id of the last dispatched event. Ids of partially received events
    /// are not reported.
    pub fn last_event_id(&self) -> Option<&str> {
        self.last_event_id.as_deref()
    }

    /// Reconnection delay announced by the server via `retry:`.
    pub fn retry(&self) -> Option<Duration> {
        self.retry
    }

    /// Feed a chunk of bytes and return every frame completed by it.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<SseFrame> {
        let mut frames = Vec::new();
        let mut bytes = chunk;

        if !self.bom_checked {
            self.buffer.extend_from_slice(bytes);
            if self.buffer.len() < 3 && b"\xEF\xBB\xBF".starts_with(&self.buffer) {
                return frames;
            }
            self.bom_checked = true;
            if self.buffer.starts_with(b"\xEF\xBB\xBF") {
                self.buffer.drain(..3);
            }
            let pending = std::mem::take(&mut self.buffer);
            self.scan(&pending, &mut frames);
            return frames;
        }

        if self.skip_lf {
            if let Some((&b'\n', rest)) = bytes.split_first() {
                bytes = rest;
            }
            self.skip_lf = false;
        }
        self.scan(bytes, &mut frames);
        frames
    }

    fn scan(&mut self, mut bytes: &[u8], frames: &mut Vec<SseFrame>) {
        while let Some(pos) = bytes.iter().position(|b| *b == b'\n' || *b == b'\r') {
            self.append(&bytes[..pos]);
            let terminator = bytes[pos];
            bytes = &bytes[pos + 1..];

            if terminator == b'\r' {
                match bytes.first() {
                    Some(b'\n') => bytes = &bytes[1..],
                    // CRLF may straddle two chunks.
                    None => self.skip_lf = true,
                    _ => {}
                }
            }

            let line = std::mem::take(&mut self.buffer);
            if std::mem::take(&mut self.overflowed) {
                continue;
            }
            let line = String::from_utf8_lossy(&line);
            if let Some(frame) = self.process_line(&line) {
                frames.push(frame);
            }
        }
        self.append(bytes);
    }

    fn append(&mut self, bytes: &[u8]) {
        if self.overflowed {
            return;
        }
        if self.buffer.len() + bytes.len() > MAX_LINE_LENGTH {
            warn!(
                "dropping SSE line longer than {} bytes",
                MAX_LINE_LENGTH
            );
            self.buffer.clear();
            self.overflowed = true;
            return;
        }
        self.buffer.extend_from_slice(bytes);
    }

    fn process_line(&mut self, line: &str) -> Option<SseFrame> {
        if line.is_empty() {
            return self.dispatch();
        }
        if line.starts_with(':') {
            return None;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };

        match field {
            "event" => self.pending.kind = Some(value.to_string()),
            "data" => self.pending.data.push(value.to_string()),
            "id" => {
                if !value.contains('\0') {
                    self.pending.id = Some(value.to_string());
                }
            }
            "retry" => {
                if !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit()) {
                    if let Ok(ms) = value.parse::<u64>() {
                        self.retry = Some(Duration::from_millis(ms));
                    }
                }
            }
            other => trace!("ignoring unknown SSE field: {}", other),
        }
        None
    }

    fn dispatch(&mut self) -> Option<SseFrame> {
        let pending = std::mem::take(&mut self.pending);
        if let Some(id) = pending.id {
            // An empty id resets the last event id.
            self.last_event_id = Some(id).filter(|id| !id.is_empty());
        }
        if pending.data.is_empty() {
            return None;
        }

        let kind = pending
            .kind
            .filter(|kind| !kind.is_empty())
            .unwrap_or_else(|| DEFAULT_KIND.to_string());

        Some(SseFrame {
            kind,
            data: pending.data.join("\n"),
            last_event_id: self.last_event_id.clone(),
        })
    }
}
