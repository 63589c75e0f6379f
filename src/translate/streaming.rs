//! State machine for reframing Claude stream events as `OpenAI` chunks.
//!
//! The [`StreamReframer`] consumes decoded Messages API events one at a time
//! and yields at most one generic event per input:
//!
//! - `content_block_start` -> nothing (no block boundaries in the generic protocol)
//! - `content_block_delta` -> one delta chunk
//! - `message_stop` -> one finish chunk, then closed
//! - end of input without `message_stop` -> the `[DONE]` sentinel, then closed
//! - anything unrecognized -> nothing, state unchanged
//!
//! Once closed it ignores further input, so a terminal event is produced at
//! most once per stream.

use super::anthropic_types::{Delta, StreamEvent};
use super::openai_types::{ChatCompletionChunk, ChunkChoice, ChunkDelta};
use crate::error::{BridgeError, Result};

/// Literal payload terminating a generic event stream.
pub const DONE_SENTINEL: &str = "[DONE]";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReframeState {
    AwaitingEvent,
    Closed,
}

/// Generic-side stream events.
#[derive(Debug, Clone)]
pub enum GenericStreamEvent {
    Delta(ChatCompletionChunk),
    /// Normal completion reported by the vendor.
    Finish(ChatCompletionChunk),
    /// The vendor stream ended without a stop event.
    Done,
}

impl GenericStreamEvent {
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, GenericStreamEvent::Delta(_))
    }

    /// `data:` payloads for this event, in order. Both terminal variants end
    /// with exactly one `[DONE]`.
    #[must_use]
    pub fn sse_payloads(&self) -> Vec<String> {
        match self {
            GenericStreamEvent::Delta(chunk) => serde_json::to_string(chunk).into_iter().collect(),
            GenericStreamEvent::Finish(chunk) => serde_json::to_string(chunk)
                .into_iter()
                .chain(std::iter::once(DONE_SENTINEL.to_string()))
                .collect(),
            GenericStreamEvent::Done => vec![DONE_SENTINEL.to_string()],
        }
    }
}

#[derive(Debug)]
pub struct StreamReframer {
    model: String,
    chunk_id: String,
    created: i64,
    state: ReframeState,
}

impl StreamReframer {
    /// `model` is echoed in every chunk; it is the id the client asked for.
    pub fn new(model: &str) -> Self {
        Self {
            model: model.to_string(),
            chunk_id: format!("chatcmpl-{}", uuid::Uuid::new_v4().simple()),
            created: chrono::Utc::now().timestamp(),
            state: ReframeState::AwaitingEvent,
        }
    }

    #[must_use]
    pub fn state(&self) -> ReframeState {
        self.state
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.state == ReframeState::Closed
    }

    /// Decode one SSE `data:` payload and process it. A payload that does not
    /// decode closes the reframer without a terminal event.
    pub fn process_data(&mut self, data: &str) -> Result<Option<GenericStreamEvent>> {
        if self.is_closed() {
            return Ok(None);
        }

        let event: StreamEvent = match serde_json::from_str(data) {
            Ok(event) => event,
            Err(e) => {
                self.abort();
                return Err(BridgeError::stream_decode(format!(
                    "undecodable stream event: {e}"
                )));
            }
        };

        self.process_event(&event)
    }

    /// Process a single decoded vendor event.
    pub fn process_event(&mut self, event: &StreamEvent) -> Result<Option<GenericStreamEvent>> {
        if self.is_closed() {
            return Ok(None);
        }

        match event {
            StreamEvent::ContentBlockStart { .. } | StreamEvent::Unknown => {
                tracing::trace!(event = event.event_name(), "Skipping stream event");
                Ok(None)
            }
            StreamEvent::ContentBlockDelta { delta, .. } => {
                Ok(Some(GenericStreamEvent::Delta(self.make_delta(delta.as_ref()))))
            }
            StreamEvent::MessageStop => {
                self.state = ReframeState::Closed;
                Ok(Some(GenericStreamEvent::Finish(self.make_finish())))
            }
            StreamEvent::Error { error } => {
                self.abort();
                Err(BridgeError::Upstream {
                    status: None,
                    body: format!("{}: {}", error.error_type, error.message),
                })
            }
        }
    }

    /// Call when the vendor stream ends. Yields the sentinel unless a terminal
    /// event was already produced or the stream was aborted.
    pub fn finish(&mut self) -> Option<GenericStreamEvent> {
        if self.is_closed() {
            return None;
        }
        self.state = ReframeState::Closed;
        Some(GenericStreamEvent::Done)
    }

    /// Close without emitting anything.
    pub fn abort(&mut self) {
        self.state = ReframeState::Closed;
    }

    fn make_delta(&self, delta: Option<&Delta>) -> ChatCompletionChunk {
        let mut chunk_delta = ChunkDelta {
            role: Some("assistant".to_string()),
            ..ChunkDelta::default()
        };

        match delta {
            Some(d) if d.is_thinking() => {
                chunk_delta.reasoning_content = Some(d.thinking.clone().unwrap_or_default());
            }
            Some(d) => chunk_delta.content = Some(d.text.clone().unwrap_or_default()),
            None => chunk_delta.content = Some(String::new()),
        }

        self.make_chunk(chunk_delta, None)
    }

    fn make_finish(&self) -> ChatCompletionChunk {
        self.make_chunk(ChunkDelta::default(), Some("stop".to_string()))
    }

    fn make_chunk(&self, delta: ChunkDelta, finish_reason: Option<String>) -> ChatCompletionChunk {
        ChatCompletionChunk {
            id: self.chunk_id.clone(),
            object: "chat.completion.chunk".to_string(),
            created: self.created,
            model: self.model.clone(),
            choices: vec![ChunkChoice {
                index: 0,
                delta,
                finish_reason,
            }],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::translate::anthropic_types::ErrorBody;

    fn text_delta(text: &str) -> StreamEvent {
        StreamEvent::ContentBlockDelta {
            index: 0,
            delta: Some(Delta {
                delta_type: "text_delta".to_string(),
                text: Some(text.to_string()),
                thinking: None,
            }),
        }
    }

    fn delta_text(event: &GenericStreamEvent) -> Option<&str> {
        match event {
            GenericStreamEvent::Delta(chunk) => chunk.choices[0].delta.content.as_deref(),
            _ => None,
        }
    }

    fn run(events: &[StreamEvent], reframer: &mut StreamReframer) -> Vec<GenericStreamEvent> {
        let mut out: Vec<GenericStreamEvent> = events
            .iter()
            .filter_map(|e| reframer.process_event(e).unwrap())
            .collect();
        out.extend(reframer.finish());
        out
    }

    #[test]
    fn test_block_start_deltas_then_stop() {
        let mut reframer = StreamReframer::new("claude-sonnet-4-6");
        let events = [
            StreamEvent::ContentBlockStart { index: 0 },
            text_delta("A"),
            text_delta("B"),
            StreamEvent::MessageStop,
        ];

        let out = run(&events, &mut reframer);

        assert_eq!(out.len(), 3);
        assert_eq!(delta_text(&out[0]), Some("A"));
        assert_eq!(delta_text(&out[1]), Some("B"));
        match &out[2] {
            GenericStreamEvent::Finish(chunk) => {
                assert_eq!(chunk.choices[0].finish_reason.as_deref(), Some("stop"));
            }
            other => panic!("expected finish, got {other:?}"),
        }
        assert!(reframer.is_closed());
    }

    #[test]
    fn test_eof_without_stop_yields_one_sentinel() {
        let mut reframer = StreamReframer::new("claude-sonnet-4-6");
        let out = run(&[text_delta("partial")], &mut reframer);

        let terminals: Vec<_> = out.iter().filter(|e| e.is_terminal()).collect();
        assert_eq!(terminals.len(), 1);
        assert!(matches!(terminals[0], GenericStreamEvent::Done));
        assert!(reframer.finish().is_none());
    }

    #[test]
    fn test_input_after_stop_is_ignored() {
        let mut reframer = StreamReframer::new("m");
        reframer.process_event(&StreamEvent::MessageStop).unwrap();

        assert!(reframer.process_event(&text_delta("late")).unwrap().is_none());
        assert!(reframer.process_data("not even json").unwrap().is_none());
        assert!(reframer.finish().is_none());
    }

    #[test]
    fn test_unknown_events_are_skipped() {
        let mut reframer = StreamReframer::new("m");
        assert!(reframer.process_data(r#"{"type":"ping"}"#).unwrap().is_none());
        assert!(reframer
            .process_data(r#"{"type":"message_start","message":{"id":"msg_1"}}"#)
            .unwrap()
            .is_none());
        assert_eq!(reframer.state(), ReframeState::AwaitingEvent);
    }

    #[test]
    fn test_missing_delta_payload_is_empty_text() {
        let mut reframer = StreamReframer::new("m");
        let event = reframer
            .process_data(r#"{"type":"content_block_delta","index":0}"#)
            .unwrap()
            .unwrap();
        assert_eq!(delta_text(&event), Some(""));
    }

    #[test]
    fn test_thinking_delta_goes_to_reasoning_content() {
        let mut reframer = StreamReframer::new("m");
        let event = reframer
            .process_data(
                r#"{"type":"content_block_delta","index":0,"delta":{"type":"thinking_delta","thinking":"hmm"}}"#,
            )
            .unwrap()
            .unwrap();

        match event {
            GenericStreamEvent::Delta(chunk) => {
                assert_eq!(chunk.choices[0].delta.reasoning_content.as_deref(), Some("hmm"));
                assert_eq!(chunk.choices[0].delta.content, None);
            }
            other => panic!("expected delta, got {other:?}"),
        }
    }

    #[test]
    fn test_malformed_payload_closes_without_terminal() {
        let mut reframer = StreamReframer::new("m");
        let err = reframer.process_data("{\"type\":").unwrap_err();

        assert!(matches!(err, BridgeError::StreamDecode { .. }));
        assert!(reframer.is_closed());
        assert!(reframer.finish().is_none());
    }

    #[test]
    fn test_vendor_error_event_aborts() {
        let mut reframer = StreamReframer::new("m");
        let err = reframer
            .process_event(&StreamEvent::Error {
                error: ErrorBody {
                    error_type: "overloaded_error".to_string(),
                    message: "Overloaded".to_string(),
                },
            })
            .unwrap_err();

        assert!(err.to_string().contains("overloaded_error"));
        assert!(reframer.finish().is_none());
    }

    #[test]
    fn test_chunks_share_id_and_echo_model() {
        let mut reframer = StreamReframer::new("claude-haiku-4-5-20251001");
        let first = reframer.process_event(&text_delta("a")).unwrap().unwrap();
        let second = reframer.process_event(&StreamEvent::MessageStop).unwrap().unwrap();

        let (GenericStreamEvent::Delta(a), GenericStreamEvent::Finish(b)) = (first, second) else {
            panic!("unexpected event kinds");
        };
        assert_eq!(a.id, b.id);
        assert!(a.id.starts_with("chatcmpl-"));
        assert_eq!(a.model, "claude-haiku-4-5-20251001");
        assert_eq!(a.object, "chat.completion.chunk");
        assert_eq!(a.choices[0].delta.role.as_deref(), Some("assistant"));
    }

    #[test]
    fn test_sse_payloads_end_with_single_done() {
        let mut reframer = StreamReframer::new("m");
        let finish = reframer.process_event(&StreamEvent::MessageStop).unwrap().unwrap();

        let payloads = finish.sse_payloads();
        assert_eq!(payloads.len(), 2);
        assert!(payloads[0].contains("\"finish_reason\":\"stop\""));
        assert_eq!(payloads[1], DONE_SENTINEL);

        assert_eq!(GenericStreamEvent::Done.sse_payloads(), vec![DONE_SENTINEL]);
    }
}
