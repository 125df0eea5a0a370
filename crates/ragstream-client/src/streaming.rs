use std::pin::Pin;

use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};

use crate::buffer_utils::{LineBuffer, Utf8Decoder};
use crate::error::{MalformedRecord, Result, StreamError};
use crate::types::Source;

/// One JSON Lines record of a `/query/stream` response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    Chunk {
        content: String,
    },

    Final {
        #[serde(default)]
        sources: Vec<Source>,
    },

    Images {
        #[serde(default)]
        content: Vec<String>,
    },

    Error {
        message: String,
    },

    /// Any `type` this client does not know about
    #[serde(other)]
    Unknown,
}

/// Finite, single-use sequence of decoded events.
pub type EventStream = Pin<Box<dyn Stream<Item = Result<StreamEvent>> + Send>>;

/// Parse one line of the stream into a record.
pub fn parse_record(line: &str) -> std::result::Result<StreamEvent, MalformedRecord> {
    serde_json::from_str(line).map_err(|source| MalformedRecord {
        line: line.to_string(),
        source,
    })
}

/// Resolve one complete line into what the session should do with it.
///
/// `None` means skip: blank, malformed, or of an unknown type.
fn interpret_line(line: &str) -> Option<Result<StreamEvent>> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    match parse_record(line) {
        Ok(StreamEvent::Error { message }) => Some(Err(StreamError::ServerReported(message))),
        Ok(StreamEvent::Unknown) => {
            tracing::debug!(line, "Ignoring stream record of unknown type");
            None
        }
        Ok(event) => Some(Ok(event)),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to parse JSONL line");
            None
        }
    }
}

/// Decode a body byte stream into events.
///
/// Reads are decoded with a stateful UTF-8 decoder, split on `\n`, and every
/// complete line is parsed as it becomes available. An unterminated trailing
/// record is parsed once the body ends. The sequence stops after the first
/// `Err` item.
///
/// A read failure before any body bytes arrived is a `Connection` error;
/// once bytes have been received it is a `Transport` error.
pub fn decode_events<S, B, E>(bytes: S) -> EventStream
where
    S: Stream<Item = std::result::Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Into<Box<dyn std::error::Error + Send + Sync>> + Send + 'static,
{
    Box::pin(async_stream::stream! {
        let mut byte_chunks = Box::pin(bytes);
        let mut decoder = Utf8Decoder::new();
        let mut buffer = LineBuffer::with_capacity(4096);
        let mut received = false;

        while let Some(chunk_result) = byte_chunks.next().await {
            match chunk_result {
                Ok(chunk) => {
                    let chunk = chunk.as_ref();
                    received |= !chunk.is_empty();
                    buffer.push_str(&decoder.decode(chunk));

                    while let Some(line) = buffer.next_line() {
                        if let Some(item) = interpret_line(&line) {
                            let fatal = item.is_err();
                            yield item;
                            if fatal {
                                return;
                            }
                        }
                    }
                }
                Err(e) if !received => {
                    let e: Box<dyn std::error::Error + Send + Sync> = e.into();
                    yield Err(StreamError::Connection {
                        status: None,
                        message: format!("Failed to read response: {}", e),
                    });
                    return;
                }
                Err(e) => {
                    yield Err(StreamError::Transport(e.into()));
                    return;
                }
            }
        }

        tracing::debug!("Stream completed");

        buffer.push_str(&decoder.finish());
        let trailing = buffer.take_remainder();
        if !trailing.trim().is_empty() {
            tracing::debug!(bytes = trailing.len(), "Processing unterminated trailing record");
            if let Some(item) = interpret_line(&trailing) {
                yield item;
            }
        }
    })
}
