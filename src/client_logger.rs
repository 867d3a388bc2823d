//! Logging hooks for chat turns.
//!
//! This module provides the [`ClientLogger`] trait that allows users to capture
//! every request a [`ChatSession`](crate::chat::ChatSession) sends, every event
//! it decodes, and every message it finalizes.  [`JsonlLogger`] writes them to
//! a file, one JSON object per line.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Mutex;

use serde::Serialize;

use crate::error::{Error, Result};
use crate::types::{ChatRequest, Message, StreamEvent};

/// A trait for logging chat session activity.
///
/// # Example
///
/// ```rust,ignore
/// use zchat::{ClientLogger, ChatRequest, Message, StreamEvent};
///
/// struct StderrLogger;
///
/// impl ClientLogger for StderrLogger {
///     fn log_request(&self, request: &ChatRequest) {
///         eprintln!("request {} ({})", request.chat_id, request.model);
///     }
///
///     fn log_stream_event(&self, event: &StreamEvent) {
///         eprintln!("event {:?}", event);
///     }
///
///     fn log_message(&self, message: &Message) {
///         eprintln!("message #{}: {}", message.ordinal, message.content);
///     }
/// }
/// ```
pub trait ClientLogger: Send + Sync {
    /// Log a request just before it is handed to the transport.
    fn log_request(&self, request: &ChatRequest);

    /// Log a decoded stream event, including ones that are not displayed.
    fn log_stream_event(&self, event: &StreamEvent);

    /// Log an assistant message once it is finalized.
    fn log_message(&self, message: &Message);
}

#[derive(Serialize)]
#[serde(tag = "record", rename_all = "snake_case")]
enum LogRecord<'a> {
    Request { request: &'a ChatRequest },
    Event { event: &'a StreamEvent },
    Message { message: &'a Message },
}

/// Appends session activity to a file as JSON lines.
pub struct JsonlLogger {
    writer: Mutex<BufWriter<File>>,
}

impl JsonlLogger {
    /// Opens `path` for appending, creating it if needed.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path.as_ref())
            .map_err(|err| Error::io("failed to open log file", err))?;
        Ok(Self {
            writer: Mutex::new(BufWriter::new(file)),
        })
    }

    fn write(&self, record: LogRecord<'_>) {
        let Ok(mut writer) = self.writer.lock() else {
            return;
        };
        // Write errors are dropped.
        if serde_json::to_writer(&mut *writer, &record).is_ok() {
            let _ = writer.write_all(b"\n");
            let _ = writer.flush();
        }
    }
}

impl ClientLogger for JsonlLogger {
    fn log_request(&self, request: &ChatRequest) {
        self.write(LogRecord::Request { request });
    }

    fn log_stream_event(&self, event: &StreamEvent) {
        self.write(LogRecord::Event { event });
    }

    fn log_message(&self, message: &Message) {
        self.write(LogRecord::Message { message });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn writes_one_record_per_line() {
        let path = std::env::temp_dir().join(format!(
            "zchat-logger-{}.jsonl",
            uuid::Uuid::new_v4()
        ));
        let logger = JsonlLogger::open(&path).unwrap();
        logger.log_stream_event(&StreamEvent::TextDelta("hi".to_string()));
        logger.log_message(&Message::user("hello", 0));
        drop(logger);

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<Value> = content
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["record"], "event");
        assert_eq!(lines[0]["event"]["data"], "hi");
        assert_eq!(lines[1]["record"], "message");
        assert_eq!(lines[1]["message"]["content"], "hello");
        let _ = std::fs::remove_file(&path);
    }
}
