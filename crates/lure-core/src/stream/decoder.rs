//! Incremental decoder for OpenAI-style SSE completion streams.
//!
//! The inference service answers a streaming request with lines of the form
//!
//! ```text
//! data: {"choices":[{"delta":{"content":"Oh my"}}]}
//! data: [DONE]
//! ```
//!
//! Network chunks are not line-aligned: a chunk may end inside a line,
//! inside a JSON value, or inside a multi-byte UTF-8 character. The decoder
//! keeps one growing text buffer and only acts on complete lines. A `data:`
//! line whose JSON is cut short is pushed back onto the buffer (terminator
//! restored) and the record continues on the following line.

use futures_util::{Stream, StreamExt};
use serde::Deserialize;
use std::pin::Pin;

use lure_types::llm::LlmError;

const DATA_PREFIX: &str = "data:";
const DONE_SENTINEL: &str = "[DONE]";

/// Text deltas decoded from a completion stream.
pub type DeltaStream = Pin<Box<dyn Stream<Item = Result<String, LlmError>> + Send + 'static>>;

#[derive(Debug, Deserialize)]
struct ChunkRecord {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
}

#[derive(Debug, Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: Option<ChunkDelta>,
}

#[derive(Debug, Deserialize)]
struct ChunkDelta {
    #[serde(default)]
    content: Option<String>,
}

/// What one complete line contributed.
#[derive(Debug, PartialEq)]
enum Line {
    /// Comment, keep-alive, foreign field, or a record without content.
    Skip,
    Delta(String),
    /// The `[DONE]` sentinel.
    Done,
    /// A `data:` record whose JSON ended early.
    Incomplete,
}

/// Stateful SSE line decoder. One instance per response body.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: String,
    /// Trailing bytes of an unfinished UTF-8 sequence.
    pending_bytes: Vec<u8>,
    /// Length of a pushed-back record fragment at the start of `buffer`,
    /// including its restored `\n`.
    carried: usize,
    done: bool,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the `[DONE]` sentinel has been seen.
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Feed one network chunk and return the deltas it completed.
    ///
    /// After `[DONE]` every further chunk is ignored.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        let mut deltas = Vec::new();
        if self.done {
            return deltas;
        }
        self.decode_utf8(chunk);
        self.drain_lines(&mut deltas);
        deltas
    }

    /// Signal end of input. An unterminated trailing line is discarded.
    pub fn finish(&mut self) {
        if !self.buffer.is_empty() || !self.pending_bytes.is_empty() {
            tracing::debug!(
                buffered = self.buffer.len(),
                "discarding unterminated trailing SSE data"
            );
        }
        self.buffer.clear();
        self.pending_bytes.clear();
        self.carried = 0;
    }

    fn decode_utf8(&mut self, chunk: &[u8]) {
        self.pending_bytes.extend_from_slice(chunk);

        let mut start = 0;
        loop {
            match std::str::from_utf8(&self.pending_bytes[start..]) {
                Ok(text) => {
                    self.buffer.push_str(text);
                    start = self.pending_bytes.len();
                    break;
                }
                Err(err) => {
                    let valid_end = start + err.valid_up_to();
                    self.buffer.push_str(
                        std::str::from_utf8(&self.pending_bytes[start..valid_end])
                            .unwrap_or_default(),
                    );
                    match err.error_len() {
                        Some(len) => {
                            self.buffer.push(char::REPLACEMENT_CHARACTER);
                            start = valid_end + len;
                        }
                        // Sequence continues in the next chunk.
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

    fn drain_lines(&mut self, deltas: &mut Vec<String>) {
        while let Some(offset) = self.buffer[self.carried..].find('\n') {
            let end = self.carried + offset;
            let fragment_len = std::mem::take(&mut self.carried);
            let mut raw: String = self.buffer.drain(..=end).collect();
            raw.pop();

            let line = if fragment_len > 0 && starts_new_line(&raw[fragment_len..]) {
                tracing::warn!(
                    fragment_len,
                    "dropping incomplete SSE record superseded by a new line"
                );
                raw.split_off(fragment_len)
            } else {
                raw
            };

            match classify(&line) {
                Line::Skip => {}
                Line::Delta(text) => deltas.push(text),
                Line::Done => {
                    self.done = true;
                    self.buffer.clear();
                    self.pending_bytes.clear();
                    return;
                }
                Line::Incomplete => {
                    self.buffer.insert(0, '\n');
                    self.buffer.insert_str(0, &line);
                    self.carried = line.len() + 1;
                }
            }
        }
    }
}

/// Whether a continuation line is really the start of something else, in
/// which case a carried fragment can never complete.
fn starts_new_line(continuation: &str) -> bool {
    let trimmed = continuation.trim_end_matches('\r');
    trimmed.trim().is_empty() || trimmed.starts_with(':') || trimmed.starts_with(DATA_PREFIX)
}

fn classify(line: &str) -> Line {
    let line = line.strip_suffix('\r').unwrap_or(line);
    if line.trim().is_empty() || line.starts_with(':') {
        return Line::Skip;
    }
    let Some(rest) = line.strip_prefix(DATA_PREFIX) else {
        return Line::Skip;
    };

    let payload = rest.trim();
    if payload.is_empty() {
        return Line::Skip;
    }
    if payload == DONE_SENTINEL {
        return Line::Done;
    }

    match serde_json::from_str::<ChunkRecord>(payload) {
        Ok(record) => record
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.delta)
            .and_then(|delta| delta.content)
            .filter(|text| !text.is_empty())
            .map_or(Line::Skip, Line::Delta),
        Err(err) if err.is_eof() => Line::Incomplete,
        Err(err) => {
            tracing::warn!(error = %err, "discarding malformed SSE data line");
            Line::Skip
        }
    }
}

/// Decode a raw completion body into a stream of text deltas.
///
/// The returned stream ends at `[DONE]` (without draining the rest of the
/// body) or when the byte stream is exhausted. Transport errors from the
/// byte stream are forwarded and end the stream.
pub fn decode_stream<S>(bytes: S) -> DeltaStream
where
    S: Stream<Item = Result<Vec<u8>, LlmError>> + Send + Unpin + 'static,
{
    Box::pin(async_stream::stream! {
        let mut decoder = SseDecoder::new();
        let mut bytes = bytes;

        while let Some(chunk) = bytes.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(err) => {
                    yield Err(err);
                    return;
                }
            };
            for delta in decoder.push(&chunk) {
                yield Ok(delta);
            }
            if decoder.is_done() {
                break;
            }
        }

        decoder.finish();
    })
}
