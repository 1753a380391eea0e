//! Wire decode pipeline for chat completion streams.
//!
//! The endpoint replies with newline-delimited frames of the shape
//! `data: <payload>`. Bytes arrive in arbitrary chunks: a frame, or even a
//! single multi-byte character, can be split across chunk boundaries. The
//! pipeline buffers raw bytes and only decodes a line once it is complete, so
//! a character split mid-sequence reconstructs correctly. Decoding each chunk
//! in isolation would garble exactly those splits.
//!
//! Frames that carry no delta (keep-alive blanks, `:` comments, malformed
//! payloads) are skipped, never errors. Upstream implementations interleave
//! such lines with real frames as a matter of course.

use async_stream::try_stream;
use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use serde::Deserialize;
use tokio_util::codec::{FramedRead, LinesCodec};
use tokio_util::io::StreamReader;

use crate::error::ChatError;

/// Marker that introduces a protocol frame.
const DATA_PREFIX: &str = "data:";

/// Payload value signalling that no further frames will arrive.
const DONE_SENTINEL: &str = "[DONE]";

/// One decoded frame of a completion stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// Incremental assistant text, in arrival order.
    Delta(String),
    /// End-of-stream sentinel; consumption stops immediately and any bytes
    /// still buffered behind it are discarded.
    Done,
    /// A line that contributes nothing: blank, comment, or a payload that
    /// did not parse or carried no text.
    Ignored,
}

/// OpenAI-style chunk payload, reduced to the fields we read.
#[derive(Debug, Deserialize)]
struct CompletionChunk {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
}

#[derive(Debug, Deserialize)]
struct ChunkChoice {
    delta: Option<ChunkDelta>,
}

#[derive(Debug, Deserialize)]
struct ChunkDelta {
    content: Option<String>,
}

/// Classify one complete decoded line.
///
/// A line is a protocol frame only if it starts with `data:` after trimming.
/// The `[DONE]` payload is the end sentinel; any other payload is parsed as a
/// chunk object and the delta text taken from its first choice. Payloads that
/// fail to parse are ignored rather than failing the stream.
pub fn parse_frame(line: &str) -> StreamEvent {
    let Some(payload) = line.trim().strip_prefix(DATA_PREFIX) else {
        return StreamEvent::Ignored;
    };
    let payload = payload.trim();

    if payload == DONE_SENTINEL {
        return StreamEvent::Done;
    }

    match serde_json::from_str::<CompletionChunk>(payload) {
        Ok(chunk) => {
            let delta = chunk
                .choices
                .into_iter()
                .next()
                .and_then(|choice| choice.delta)
                .and_then(|delta| delta.content);
            match delta {
                Some(text) if !text.is_empty() => StreamEvent::Delta(text),
                _ => StreamEvent::Ignored,
            }
        }
        Err(e) => {
            tracing::debug!("skipping unparseable frame: {e}");
            StreamEvent::Ignored
        }
    }
}

/// Decode a raw byte stream into [`StreamEvent`]s.
///
/// Generic over the byte source so tests can drive it with hand-split chunks;
/// the session feeds it `reqwest`'s body stream. The stream ends at the
/// `[DONE]` sentinel or when the source completes, whichever comes first. A
/// source that never sends the sentinel still terminates, and a final line
/// without a trailing newline is still processed.
///
/// I/O failures from the source or the codec surface as
/// [`ChatError::Stream`] and end the stream.
pub fn stream_events<S>(bytes: S) -> impl Stream<Item = Result<StreamEvent, ChatError>>
where
    S: Stream<Item = std::io::Result<Bytes>>,
{
    try_stream! {
        let reader = StreamReader::new(Box::pin(bytes));
        let mut lines = FramedRead::new(reader, LinesCodec::new());
        while let Some(line) = lines.next().await {
            let line =
                line.map_err(|e| ChatError::Stream(format!("failed to decode stream: {e}")))?;
            let event = parse_frame(&line);
            let done = matches!(event, StreamEvent::Done);
            yield event;
            if done {
                break;
            }
        }
    }
}
