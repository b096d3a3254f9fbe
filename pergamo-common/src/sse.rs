//! Server-Sent Events (SSE) utilities
//!
//! Shared SSE helpers for Pergamo services that stream text to the browser.

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::{Stream, StreamExt};
use serde::Serialize;
use std::convert::Infallible;
use std::time::Duration;
use tracing::debug;

/// Keep-alive interval for long-lived streams
pub const KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(15);

/// Payload of a streamed text chunk
#[derive(Debug, Serialize)]
struct ContentChunk<'a> {
    content: &'a str,
}

/// Build a `data: {"content": "..."}` event
pub fn content_event(content: &str) -> Event {
    // Serialization of a single &str field cannot fail
    let json = serde_json::to_string(&ContentChunk { content }).unwrap_or_default();
    Event::default().data(json)
}

/// Wrap a stream of text chunks into an SSE response
///
/// Each chunk becomes one `content_event`. Dropping the response (client
/// disconnect) drops the source stream, which stops any upstream reading.
///
/// # Example
/// ```rust,ignore
/// let chunks = futures::stream::iter(vec!["Ol".to_string(), "á".to_string()]);
/// let response = pergamo_common::sse::text_sse_stream("explain", chunks);
/// ```
pub fn text_sse_stream<S>(
    stream_name: &'static str,
    chunks: S,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>>
where
    S: Stream<Item = String> + Send + 'static,
{
    debug!("SSE: {} stream opened", stream_name);

    let events = chunks.map(|chunk| Ok::<_, Infallible>(content_event(&chunk)));

    Sse::new(events).keep_alive(
        KeepAlive::new()
            .interval(KEEP_ALIVE_INTERVAL)
            .text("heartbeat"),
    )
}
