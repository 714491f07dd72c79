use std::pin::Pin;
use std::task::{Context, Poll};

use eventsource_stream::{EventStreamError, Eventsource};
use futures_util::{Stream, StreamExt};
use serde::Deserialize;

use crate::error::GenerationError;
use crate::request::ProviderId;

/// Payload that ends a chat completion stream.
pub const DONE_SENTINEL: &str = "[DONE]";

/// Lazy, single-pass sequence of chat text deltas.
///
/// Dropping it drops the underlying byte stream and any partially buffered frame.
pub struct DeltaStream {
    inner: Pin<Box<dyn Stream<Item = Result<String, GenerationError>> + Send>>,
}

impl Stream for DeltaStream {
    type Item = Result<String, GenerationError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.as_mut().poll_next(cx)
    }
}

impl DeltaStream {
    /// Drain the stream and concatenate every delta.
    pub async fn collect_text(mut self) -> Result<String, GenerationError> {
        let mut text = String::new();
        while let Some(delta) = self.next().await {
            text.push_str(&delta?);
        }
        Ok(text)
    }
}

// Accepts both the OpenAI chunk shape and a flat `{"delta": "..."}` payload.
#[derive(Deserialize)]
struct Frame {
    #[serde(default)]
    choices: Vec<FrameChoice>,
    #[serde(default)]
    delta: Option<String>,
}

#[derive(Deserialize)]
struct FrameChoice {
    #[serde(default)]
    delta: Option<FrameDelta>,
}

#[derive(Deserialize)]
struct FrameDelta {
    #[serde(default)]
    content: Option<String>,
}

enum FrameOutcome {
    Done,
    Delta(String),
    Empty,
    Malformed(serde_json::Error),
}

fn parse_frame(data: &str) -> FrameOutcome {
    let data = data.trim();
    if data == DONE_SENTINEL {
        return FrameOutcome::Done;
    }
    let frame: Frame = match serde_json::from_str(data) {
        Ok(f) => f,
        Err(e) => return FrameOutcome::Malformed(e),
    };
    let delta = frame.delta.or_else(|| {
        frame
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.delta)
            .and_then(|d| d.content)
    });
    match delta {
        Some(text) if !text.is_empty() => FrameOutcome::Delta(text),
        _ => FrameOutcome::Empty,
    }
}

/// Turn a chunked SSE byte stream into text deltas.
///
/// Frames split across chunks are reassembled before parsing. Malformed frames
/// are logged and skipped; `[DONE]` or end of input ends the sequence; a
/// transport failure yields one error and ends it.
pub fn decode<S, B, E>(provider: ProviderId, bytes: S) -> DeltaStream
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: std::fmt::Display + Send + 'static,
{
    let events = Box::pin(bytes.eventsource());

    let inner = futures_util::stream::unfold(Some(events), move |state| async move {
        let mut events = state?;
        loop {
            match events.next().await {
                None => return None,
                Some(Ok(event)) => match parse_frame(&event.data) {
                    FrameOutcome::Done => return None,
                    FrameOutcome::Delta(text) => return Some((Ok(text), Some(events))),
                    FrameOutcome::Empty => continue,
                    FrameOutcome::Malformed(e) => {
                        tracing::warn!(provider = %provider, "skipping malformed stream frame: {e}");
                        continue;
                    }
                },
                Some(Err(EventStreamError::Transport(e))) => {
                    let err = GenerationError::Transport {
                        provider,
                        message: format!("stream interrupted: {e}"),
                    };
                    return Some((Err(err), None));
                }
                Some(Err(e)) => {
                    tracing::warn!(provider = %provider, "skipping undecodable stream data: {e}");
                    continue;
                }
            }
        }
    });

    DeltaStream {
        inner: Box::pin(inner),
    }
}
