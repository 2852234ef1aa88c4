// SPDX-FileCopyrightText: 2026 Millwright Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Server-Sent Events endpoint for streaming chat.
//!
//! Every orchestrator event becomes one frame:
//! ```text
//! data: {"type":"delta","content":"OEE was "}
//!
//! data: {"type":"done","content":"OEE was 72.4%."}
//! ```

use std::convert::Infallible;

use axum::{
    Json,
    extract::State,
    http::{HeaderName, HeaderValue, header},
    response::{
        IntoResponse, Response,
        sse::{Event, Sse},
    },
};
use futures::stream::{Stream, StreamExt};
use millwright_core::{ChatRequest, StreamEvent};
use tokio_stream::wrappers::ReceiverStream;

use crate::server::GatewayState;

/// Frames one event as an SSE `data:` line.
pub fn to_sse_event(event: &StreamEvent) -> Event {
    Event::default().json_data(event).unwrap_or_else(|e| {
        Event::default().data(
            serde_json::json!({ "type": "error", "content": format!("encoding failed: {e}") })
                .to_string(),
        )
    })
}

fn event_stream(
    events: impl Stream<Item = StreamEvent> + Send + 'static,
) -> impl Stream<Item = Result<Event, Infallible>> + Send + 'static {
    events.map(|event| Ok(to_sse_event(&event)))
}

/// POST /api/chat/stream
pub async fn post_chat_stream(
    State(state): State<GatewayState>,
    Json(body): Json<ChatRequest>,
) -> Response {
    let events = ReceiverStream::new(state.orchestrator.stream(body));
    (
        [
            (header::CACHE_CONTROL, HeaderValue::from_static("no-cache")),
            (
                HeaderName::from_static("x-accel-buffering"),
                HeaderValue::from_static("no"),
            ),
        ],
        Sse::new(event_stream(events)),
    )
        .into_response()
}
