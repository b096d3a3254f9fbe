//! Decoding of an upstream chat-completion event stream
//!
//! The upstream sends `data: {json}` lines and a final `data: [DONE]`.
//! Network chunks may split a line anywhere, so bytes are buffered until a
//! full line is available.

use futures::stream::{Stream, StreamExt};
use serde::Deserialize;
use std::fmt::Display;
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpstreamEvent {
    Content(String),
    Done,
}

#[derive(Debug, Deserialize)]
struct CompletionChunk {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
}

#[derive(Debug, Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: ChunkDelta,
}

#[derive(Debug, Default, Deserialize)]
struct ChunkDelta {
    #[serde(default)]
    content: Option<String>,
}

/// Line-buffering decoder for upstream event bytes
#[derive(Debug, Default)]
pub struct ChunkDecoder {
    buffer: Vec<u8>,
}

impl ChunkDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed raw bytes, returning every event completed by them
    pub fn push(&mut self, chunk: &[u8]) -> Vec<UpstreamEvent> {
        self.buffer.extend_from_slice(chunk);

        let mut events = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            if let Some(event) = parse_line(&String::from_utf8_lossy(&line)) {
                events.push(event);
            }
        }
        events
    }

    /// Decode whatever is left once the upstream closes
    pub fn finish(&mut self) -> Option<UpstreamEvent> {
        let rest = std::mem::take(&mut self.buffer);
        parse_line(&String::from_utf8_lossy(&rest))
    }
}

/// Parse one line; non-data lines and malformed payloads are ignored
fn parse_line(line: &str) -> Option<UpstreamEvent> {
    let data = line.trim_end_matches(['\r', '\n']).strip_prefix("data:")?.trim_start();
    if data == "[DONE]" {
        return Some(UpstreamEvent::Done);
    }

    let chunk: CompletionChunk = match serde_json::from_str(data) {
        Ok(chunk) => chunk,
        Err(e) => {
            debug!("Ignoring malformed upstream line: {}", e);
            return None;
        }
    };
    chunk
        .choices
        .into_iter()
        .next()?
        .delta
        .content
        .filter(|c| !c.is_empty())
        .map(UpstreamEvent::Content)
}

/// Turn an upstream byte stream into text chunks
///
/// Ends on `[DONE]`, on upstream EOF or error, or when no bytes arrive for
/// `idle_timeout`.
pub fn content_stream<S, B, E>(
    bytes: S,
    idle_timeout: Duration,
) -> impl Stream<Item = String> + Send + 'static
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Display + Send + 'static,
{
    async_stream::stream! {
        let mut bytes = Box::pin(bytes);
        let mut decoder = ChunkDecoder::new();
        let mut done = false;

        while !done {
            let next = match tokio::time::timeout(idle_timeout, bytes.next()).await {
                Ok(next) => next,
                Err(_) => {
                    warn!("Upstream stream idle for {:?}, closing", idle_timeout);
                    break;
                }
            };

            match next {
                None => {
                    if let Some(UpstreamEvent::Content(content)) = decoder.finish() {
                        yield content;
                    }
                    break;
                }
                Some(Err(e)) => {
                    warn!("Upstream stream error: {}", e);
                    break;
                }
                Some(Ok(chunk)) => {
                    for event in decoder.push(chunk.as_ref()) {
                        match event {
                            UpstreamEvent::Content(content) => yield content,
                            UpstreamEvent::Done => {
                                done = true;
                                break;
                            }
                        }
                    }
                }
            }
        }
        debug!("Upstream stream finished");
    }
}
