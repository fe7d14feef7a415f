//! Server-sent-event decoding for the chat-to-generate-code stream.
//!
//! DESIGN
//! ======
//! `SseParser` is a pure line-oriented decoder fed with raw chunks, so it can
//! be tested without a socket. Chunks are split on byte boundaries and only
//! complete lines are decoded, which keeps multi-byte UTF-8 sequences intact
//! across chunk edges.

#[cfg(test)]
#[path = "sse_test.rs"]
mod sse_test;

use std::collections::VecDeque;
use std::pin::Pin;

use futures::{Stream, StreamExt};

use crate::error::ApiError;

/// One dispatched server-sent event.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SseEvent {
    /// `event:` field; `None` means the default `message` type.
    pub event: Option<String>,
    /// `data:` lines joined with `\n`.
    pub data: String,
    pub id: Option<String>,
}

impl SseEvent {
    /// Event type with the default applied.
    #[must_use]
    pub fn kind(&self) -> &str {
        self.event.as_deref().unwrap_or("message")
    }
}

#[derive(Debug, Default)]
pub struct SseParser {
    buffer: Vec<u8>,
    event: Option<String>,
    data: Vec<String>,
    id: Option<String>,
}

impl SseParser {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a raw chunk, returning every event completed by it.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        self.buffer.extend_from_slice(chunk);
        let mut events = Vec::new();
        while let Some(newline) = self.buffer.iter().position(|b| *b == b'\n') {
            let mut line: Vec<u8> = self.buffer.drain(..=newline).collect();
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            if let Some(event) = self.process_line(&String::from_utf8_lossy(&line)) {
                events.push(event);
            }
        }
        events
    }

    /// Flush a trailing event that was not terminated by a blank line.
    pub fn finish(&mut self) -> Option<SseEvent> {
        if !self.buffer.is_empty() {
            let line = std::mem::take(&mut self.buffer);
            let text = String::from_utf8_lossy(&line);
            if let Some(event) = self.process_line(text.trim_end_matches('\r')) {
                return Some(event);
            }
        }
        self.dispatch()
    }

    fn process_line(&mut self, line: &str) -> Option<SseEvent> {
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
            "event" => self.event = Some(value.to_owned()),
            "data" => self.data.push(value.to_owned()),
            "id" => self.id = Some(value.to_owned()),
            _ => {}
        }
        None
    }

    fn dispatch(&mut self) -> Option<SseEvent> {
        let event = self.event.take();
        let id = self.id.take();
        if self.data.is_empty() {
            return None;
        }
        let data = std::mem::take(&mut self.data).join("\n");
        Some(SseEvent { event, data, id })
    }
}

type ChunkStream = Pin<Box<dyn Stream<Item = Result<Vec<u8>, ApiError>> + Send>>;

/// Event stream for one chat turn.
pub struct ChatStream {
    chunks: ChunkStream,
    parser: SseParser,
    queue: VecDeque<SseEvent>,
    finished: bool,
}

impl ChatStream {
    pub fn new<S>(chunks: S) -> Self
    where
        S: Stream<Item = Result<Vec<u8>, ApiError>> + Send + 'static,
    {
        Self { chunks: Box::pin(chunks), parser: SseParser::new(), queue: VecDeque::new(), finished: false }
    }

    /// Next decoded event; `None` once the backend closed the stream.
    pub async fn next_event(&mut self) -> Option<Result<SseEvent, ApiError>> {
        loop {
            if let Some(event) = self.queue.pop_front() {
                return Some(Ok(event));
            }
            if self.finished {
                return None;
            }
            match self.chunks.next().await {
                Some(Ok(chunk)) => self.queue.extend(self.parser.feed(&chunk)),
                Some(Err(e)) => {
                    self.finished = true;
                    tracing::warn!(error = %e, "chat stream dropped");
                    return Some(Err(e));
                }
                None => {
                    self.finished = true;
                    self.queue.extend(self.parser.finish());
                }
            }
        }
    }

    /// Drain the stream, concatenating the data of every `message` event.
    ///
    /// # Errors
    ///
    /// Returns the first transport error raised while reading.
    pub async fn collect_text(mut self) -> Result<String, ApiError> {
        let mut text = String::new();
        while let Some(event) = self.next_event().await {
            let event = event?;
            if event.kind() == "message" {
                text.push_str(&event.data);
            }
        }
        Ok(text)
    }
}
