//! Decoding of the upstream's streamed response.
//!
//! The upstream answers with newline-delimited records, usually server-sent
//! event `data:` lines carrying JSON.  [`RecordDecoder`] turns raw byte chunks
//! into [`StreamEvent`]s and [`decode_stream`] wraps it around a byte stream.
//!
//! A record that cannot be parsed becomes a [`StreamEvent::Error`] and decoding
//! carries on with the next one.

use std::collections::VecDeque;

use bytes::Bytes;
use futures::stream::{self, Stream, StreamExt};
use serde::Deserialize;
use serde_json::Value;

use crate::error::Result;
use crate::observability::{
    STREAM_BYTES, STREAM_DECODE_ERRORS, STREAM_DROPPED_THINKING, STREAM_EVENTS,
};
use crate::types::{ImageEvent, SearchEvent, SearchResult, StreamEvent};

/// Terminal sentinel sent as the last `data:` payload.
const DONE_SENTINEL: &str = "[DONE]";

/// Fields an upstream record body may carry.
///
/// Z.AI nests these under `data`; generic tagged records carry them at the top
/// level.  Fields whose shape varies between producers are kept as [`Value`].
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RecordBody {
    phase: Option<String>,
    delta_content: Option<String>,
    text: Option<Value>,
    content: Option<Value>,
    delta: Option<Value>,
    done: Option<bool>,
    query: Option<String>,
    results: Option<Vec<SearchResult>>,
    prompt: Option<String>,
    url: Option<String>,
    image_url: Option<String>,
    error: Option<Value>,
    message: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ChoiceDelta {
    content: Option<String>,
    reasoning_content: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Choice {
    delta: Option<ChoiceDelta>,
}

#[derive(Debug, Deserialize)]
struct UpstreamRecord {
    #[serde(rename = "type", default)]
    record_type: Option<String>,
    #[serde(default)]
    data: Option<RecordBody>,
    #[serde(default)]
    choices: Option<Vec<Choice>>,
    #[serde(flatten)]
    body: RecordBody,
}

/// What a record's tag says about its payload.
#[derive(Debug, PartialEq, Eq)]
enum Tag {
    Text,
    Thinking,
    Search,
    Image,
    Done,
    Error,
    Ignored,
    Unknown(String),
}

fn classify(tag: &str) -> Tag {
    match tag.to_ascii_lowercase().as_str() {
        "answer" | "text" | "content" | "text_delta" => Tag::Text,
        "thinking" | "reasoning" | "thinking_delta" | "reasoning_delta" => Tag::Thinking,
        "search" | "web_search" | "tool_call" => Tag::Search,
        "image" | "image_generation" => Tag::Image,
        "done" | "finish" | "stop" => Tag::Done,
        "error" => Tag::Error,
        "other" | "usage" | "ping" | "heartbeat" | "chat:completion" => Tag::Ignored,
        other => Tag::Unknown(other.to_string()),
    }
}

fn value_text(value: &Option<Value>) -> Option<&str> {
    match value {
        Some(Value::String(s)) => Some(s.as_str()),
        _ => None,
    }
}

impl RecordBody {
    fn text(&self) -> Option<&str> {
        self.delta_content
            .as_deref()
            .or_else(|| value_text(&self.text))
            .or_else(|| value_text(&self.content))
            .or_else(|| value_text(&self.delta))
    }

    fn has_known_field(&self) -> bool {
        self.text().is_some()
            || self.done.is_some()
            || self.query.is_some()
            || self.results.is_some()
            || self.prompt.is_some()
            || self.url.is_some()
            || self.image_url.is_some()
            || self.message.is_some()
    }

    fn error_message(&self) -> Option<String> {
        match &self.error {
            None | Some(Value::Null) | Some(Value::Bool(false)) => None,
            Some(Value::String(s)) => Some(s.clone()),
            Some(Value::Object(obj)) => Some(
                obj.get("message")
                    .or_else(|| obj.get("detail"))
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .unwrap_or_else(|| Value::Object(obj.clone()).to_string()),
            ),
            Some(other) => Some(other.to_string()),
        }
    }
}

/// Incremental decoder from raw bytes to stream events.
///
/// Bytes are buffered until a full line arrived, so neither records nor UTF-8
/// sequences need to align with chunk boundaries.  After the first
/// [`StreamEvent::Done`] the decoder is finished and ignores further input.
#[derive(Debug)]
pub struct RecordDecoder {
    buffer: Vec<u8>,
    thinking_enabled: bool,
    finished: bool,
}

impl RecordDecoder {
    /// Creates a decoder.  Thinking deltas are dropped unless `thinking_enabled`.
    pub fn new(thinking_enabled: bool) -> Self {
        Self {
            buffer: Vec::new(),
            thinking_enabled,
            finished: false,
        }
    }

    /// Returns true once `Done` has been produced or the decoder was aborted.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Stops decoding without producing `Done`.
    pub fn abort(&mut self) {
        self.finished = true;
        self.buffer.clear();
    }

    /// Feeds a chunk and returns the events completed by it, in order.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<StreamEvent> {
        let mut out = Vec::new();
        if self.finished {
            return out;
        }
        self.buffer.extend_from_slice(chunk);
        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            self.decode_line(&line[..line.len() - 1], &mut out);
            if self.finished {
                self.buffer.clear();
                break;
            }
        }
        out
    }

    /// Signals the end of input: decodes any unterminated trailing line and
    /// produces `Done` if it has not been produced yet.
    pub fn finish(&mut self) -> Vec<StreamEvent> {
        let mut out = Vec::new();
        if self.finished {
            return out;
        }
        let rest = std::mem::take(&mut self.buffer);
        if !rest.is_empty() {
            self.decode_line(&rest, &mut out);
        }
        if !self.finished {
            self.emit(StreamEvent::Done, &mut out);
        }
        out
    }

    fn emit(&mut self, event: StreamEvent, out: &mut Vec<StreamEvent>) {
        if self.finished {
            return;
        }
        match &event {
            StreamEvent::Done => self.finished = true,
            StreamEvent::Error(_) => STREAM_DECODE_ERRORS.click(),
            _ => {}
        }
        STREAM_EVENTS.click();
        out.push(event);
    }

    fn decode_line(&mut self, line: &[u8], out: &mut Vec<StreamEvent>) {
        let line = match std::str::from_utf8(line) {
            Ok(line) => line,
            Err(e) => {
                let lossy = String::from_utf8_lossy(line).into_owned();
                self.emit(
                    StreamEvent::Error(format!("invalid UTF-8 in record ({e}): {lossy}")),
                    out,
                );
                return;
            }
        };
        let line = line.trim();
        if line.is_empty() || line.starts_with(':') {
            return;
        }
        let payload = if let Some(data) = line.strip_prefix("data:") {
            data.trim()
        } else if line.starts_with("event:") || line.starts_with("id:") || line.starts_with("retry:")
        {
            return;
        } else {
            line
        };
        if payload.is_empty() {
            return;
        }
        if payload == DONE_SENTINEL {
            self.emit(StreamEvent::Done, out);
            return;
        }
        self.decode_record(payload, out);
    }

    fn decode_record(&mut self, raw: &str, out: &mut Vec<StreamEvent>) {
        let record = match serde_json::from_str::<UpstreamRecord>(raw) {
            Ok(record) => record,
            Err(e) => {
                self.emit(StreamEvent::Error(format!("malformed record ({e}): {raw}")), out);
                return;
            }
        };

        if let Some(choices) = record.choices {
            for delta in choices.into_iter().filter_map(|c| c.delta) {
                if let Some(reasoning) = delta.reasoning_content {
                    self.thinking(reasoning, out);
                }
                if let Some(content) = delta.content {
                    self.text(content, out);
                }
            }
            return;
        }

        let nested = record.data.is_some();
        let body = record.data.unwrap_or(record.body);
        if let Some(message) = body.error_message() {
            self.emit(StreamEvent::Error(message), out);
            return;
        }

        let envelope = nested && record.record_type.is_some();
        let tag = body
            .phase
            .clone()
            .or_else(|| record.record_type.filter(|t| !(nested && t.contains(':'))));
        let tag = match tag {
            Some(tag) => classify(&tag),
            None if body.has_known_field() => Tag::Text,
            None if envelope => Tag::Ignored,
            None => {
                self.emit(StreamEvent::Error(format!("unrecognized record: {raw}")), out);
                return;
            }
        };
        let text = body.text().map(str::to_string);

        match tag {
            Tag::Text => {
                if let Some(text) = text {
                    self.text(text, out);
                }
            }
            Tag::Thinking => {
                if let Some(text) = text {
                    self.thinking(text, out);
                }
            }
            Tag::Search => {
                if let Some(results) = body.results.filter(|r| !r.is_empty()) {
                    self.emit(StreamEvent::Search(SearchEvent::Results { results }), out);
                } else if let Some(query) = body.query.filter(|q| !q.is_empty()) {
                    self.emit(StreamEvent::Search(SearchEvent::Query { query }), out);
                }
            }
            Tag::Image => {
                if let Some(url) = body.url.or(body.image_url).filter(|u| !u.is_empty()) {
                    self.emit(StreamEvent::Image(ImageEvent::Url { url }), out);
                } else if let Some(prompt) = body.prompt.filter(|p| !p.is_empty()) {
                    self.emit(StreamEvent::Image(ImageEvent::Prompt { prompt }), out);
                }
            }
            Tag::Done => {
                if let Some(text) = text {
                    self.text(text, out);
                }
                self.emit(StreamEvent::Done, out);
                return;
            }
            Tag::Error => {
                let message = body
                    .message
                    .or(text)
                    .unwrap_or_else(|| "upstream reported an error".to_string());
                self.emit(StreamEvent::Error(message), out);
                return;
            }
            Tag::Ignored => {}
            Tag::Unknown(tag) => {
                self.emit(
                    StreamEvent::Error(format!("unrecognized record type '{tag}': {raw}")),
                    out,
                );
            }
        }

        if body.done == Some(true) {
            self.emit(StreamEvent::Done, out);
        }
    }

    fn text(&mut self, text: String, out: &mut Vec<StreamEvent>) {
        if !text.is_empty() {
            self.emit(StreamEvent::TextDelta(text), out);
        }
    }

    fn thinking(&mut self, text: String, out: &mut Vec<StreamEvent>) {
        if text.is_empty() {
            return;
        }
        if self.thinking_enabled {
            self.emit(StreamEvent::ThinkingDelta(text), out);
        } else {
            STREAM_DROPPED_THINKING.click();
        }
    }
}

/// Decodes a byte stream into a stream of events.
///
/// The result yields events in arrival order and ends after exactly one
/// [`StreamEvent::Done`].  An `Err` from the byte stream is passed through and
/// ends the sequence without `Done`.
///
/// ```
/// use bytes::Bytes;
/// use futures::StreamExt;
/// use zchat::{StreamEvent, decode_stream};
///
/// # tokio_test::block_on(async {
/// let chunks = vec![
///     Ok(Bytes::from_static(b"data: {\"data\":{\"phase\":\"answer\",")),
///     Ok(Bytes::from_static(b"\"delta_content\":\"Hi\"}}\ndata: [DONE]\n")),
/// ];
/// let events: Vec<_> = decode_stream(futures::stream::iter(chunks), true)
///     .map(|event| event.unwrap())
///     .collect()
///     .await;
/// assert_eq!(
///     events,
///     vec![StreamEvent::TextDelta("Hi".to_string()), StreamEvent::Done]
/// );
/// # });
/// ```
pub fn decode_stream<S>(
    byte_stream: S,
    thinking_enabled: bool,
) -> impl Stream<Item = Result<StreamEvent>> + Send
where
    S: Stream<Item = Result<Bytes>> + Unpin + Send + 'static,
{
    let decoder = RecordDecoder::new(thinking_enabled);
    let pending: VecDeque<StreamEvent> = VecDeque::new();

    stream::unfold(
        (byte_stream, decoder, pending),
        move |(mut stream, mut decoder, mut pending)| async move {
            loop {
                if let Some(event) = pending.pop_front() {
                    return Some((Ok(event), (stream, decoder, pending)));
                }
                if decoder.is_finished() {
                    return None;
                }
                match stream.next().await {
                    Some(Ok(bytes)) => {
                        STREAM_BYTES.count(bytes.len() as u64);
                        pending.extend(decoder.push(&bytes));
                    }
                    Some(Err(e)) => {
                        decoder.abort();
                        return Some((Err(e), (stream, decoder, pending)));
                    }
                    None => {
                        pending.extend(decoder.finish());
                    }
                }
            }
        },
    )
}
