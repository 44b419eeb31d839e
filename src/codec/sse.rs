//! Server-Sent Events line assembler (part of component C2).
//!
//! Implements the WHATWG EventSource field-parsing algorithm: CR?LF lines,
//! a blank line dispatches the accumulated event, `:`-prefixed lines are
//! comments, and `field: value` lines accumulate onto `event`/`data`/`id`/
//! `retry` or an unrecognized-field map. Feeding bytes one at a time must
//! produce the same event sequence as feeding the whole buffer at once —
//! this parser keeps all partial state (the undispatched event and any
//! partial line) across `feed` calls to guarantee that.

use std::collections::HashMap;

/// One dispatched SSE event.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SseEvent {
    pub event_type: String,
    pub data: String,
    pub id: Option<String>,
    pub retry: Option<String>,
    pub fields: HashMap<String, String>,
}

#[derive(Default)]
struct PendingEvent {
    event_type: Option<String>,
    data_lines: Vec<String>,
    id: Option<String>,
    retry: Option<String>,
    fields: HashMap<String, String>,
    touched: bool,
}

impl PendingEvent {
    fn is_empty(&self) -> bool {
        !self.touched
    }

    fn dispatch(self) -> SseEvent {
        SseEvent {
            event_type: self.event_type.unwrap_or_else(|| "message".to_string()),
            data: self.data_lines.join("\n"),
            id: self.id,
            retry: self.retry,
            fields: self.fields,
        }
    }
}

/// Incremental SSE parser. Feed it raw bytes (of any chunking), drain
/// dispatched events after each feed, and call `finish` at end-of-stream
/// to flush a trailing unterminated-but-nonempty event.
#[derive(Default)]
pub struct SseParser {
    line_buf: Vec<u8>,
    pending: PendingEvent,
}

impl SseParser {
    #[must_use]
    pub fn new() -> Self {
        SseParser::default()
    }

    /// Feed more bytes, returning any events dispatched as a result.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<SseEvent> {
        let mut out = Vec::new();
        for &b in bytes {
            if b == b'\n' {
                let mut line = std::mem::take(&mut self.line_buf);
                if line.last() == Some(&b'\r') {
                    line.pop();
                }
                self.process_line(&line, &mut out);
            } else {
                self.line_buf.push(b);
            }
        }
        out
    }

    /// Flush a trailing event at end-of-stream, if any field was set.
    pub fn finish(mut self) -> Option<SseEvent> {
        if !self.line_buf.is_empty() {
            let line = std::mem::take(&mut self.line_buf);
            let mut out = Vec::new();
            self.process_line(&line, &mut out);
            if let Some(e) = out.into_iter().next() {
                return Some(e);
            }
        }
        if self.pending.is_empty() {
            None
        } else {
            Some(self.pending.dispatch())
        }
    }

    fn process_line(&mut self, line: &[u8], out: &mut Vec<SseEvent>) {
        if line.is_empty() {
            if !self.pending.is_empty() {
                let finished = std::mem::take(&mut self.pending);
                out.push(finished.dispatch());
            }
            return;
        }

        let line = String::from_utf8_lossy(line);
        if line.starts_with(':') {
            return;
        }

        let (field, value) = match line.find(':') {
            Some(idx) => {
                let value = &line[idx + 1..];
                let value = value.strip_prefix(' ').unwrap_or(value);
                (&line[..idx], value)
            }
            None => (line.as_ref(), ""),
        };

        self.pending.touched = true;
        match field {
            "event" => self.pending.event_type = Some(value.to_string()),
            "data" => self.pending.data_lines.push(value.to_string()),
            "id" => self.pending.id = Some(value.to_string()),
            "retry" => self.pending.retry = Some(value.to_string()),
            other => {
                self.pending.fields.insert(other.to_string(), value.to_string());
            }
        }
    }
}
