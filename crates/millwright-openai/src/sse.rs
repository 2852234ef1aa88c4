// SPDX-FileCopyrightText: 2026 Millwright Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SSE stream parser for Chat Completions streaming responses.
//!
//! Converts a reqwest response byte stream into [`SseEvent`]s using the
//! `eventsource-stream` crate for SSE protocol compliance.

use std::pin::Pin;

use eventsource_stream::Eventsource;
use futures::stream::{Stream, StreamExt};
use millwright_core::MillwrightError;

use crate::types::{ApiErrorResponse, ChatCompletionChunk};

/// Sentinel payload closing a streaming response.
const DONE_SENTINEL: &str = "[DONE]";

/// Events decoded from the streaming protocol.
#[derive(Debug, Clone)]
pub enum SseEvent {
    /// A completion chunk.
    Chunk(ChatCompletionChunk),
    /// The `[DONE]` sentinel.
    Done,
}

/// Parses one `data:` payload.
pub fn parse_data(data: &str) -> Result<SseEvent, MillwrightError> {
    let data = data.trim();
    if data == DONE_SENTINEL {
        return Ok(SseEvent::Done);
    }
    // Mid-stream failures arrive as an `error` object instead of a chunk.
    if let Ok(api_err) = serde_json::from_str::<ApiErrorResponse>(data) {
        return Err(MillwrightError::Provider {
            message: format!("stream error: {}", api_err.error.message),
            source: None,
        });
    }
    serde_json::from_str::<ChatCompletionChunk>(data)
        .map(SseEvent::Chunk)
        .map_err(|e| MillwrightError::Provider {
            message: format!("failed to parse stream chunk: {e}"),
            source: Some(Box::new(e)),
        })
}

/// Parses a reqwest streaming response into a stream of [`SseEvent`]s.
///
/// Empty payloads (keep-alive comments) are skipped.
pub fn parse_sse_stream(
    response: reqwest::Response,
) -> Pin<Box<dyn Stream<Item = Result<SseEvent, MillwrightError>> + Send>> {
    let mapped = response
        .bytes_stream()
        .eventsource()
        .filter_map(|result| async move {
            match result {
                Ok(event) if event.data.trim().is_empty() => None,
                Ok(event) => Some(parse_data(&event.data)),
                Err(e) => Some(Err(MillwrightError::Provider {
                    message: format!("SSE stream error: {e}"),
                    source: None,
                })),
            }
        });

    Box::pin(mapped)
}
