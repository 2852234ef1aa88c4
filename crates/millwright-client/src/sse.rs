// SPDX-FileCopyrightText: 2026 Millwright Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Decodes the gateway's `text/event-stream` body into [`StreamEvent`]s.

use std::fmt::Display;
use std::pin::Pin;

use eventsource_stream::Eventsource;
use futures::stream::{Stream, StreamExt};
use millwright_core::{MillwrightError, StreamEvent};

/// A boxed stream of decoded events.
pub type EventStream = Pin<Box<dyn Stream<Item = Result<StreamEvent, MillwrightError>> + Send>>;

/// Parses one `data:` payload.
pub fn parse_event(data: &str) -> Result<StreamEvent, MillwrightError> {
    serde_json::from_str(data.trim()).map_err(|e| MillwrightError::Gateway {
        message: format!("malformed stream event: {e}"),
        source: Some(Box::new(e)),
    })
}

/// Frames raw body chunks into events. Keep-alive frames are skipped.
pub fn decode_events<S, B, E>(body: S) -> EventStream
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Display + Send + 'static,
{
    let events = body.eventsource().filter_map(|frame| async move {
        match frame {
            Ok(event) if event.data.trim().is_empty() => None,
            Ok(event) => Some(parse_event(&event.data)),
            Err(e) => Some(Err(MillwrightError::Gateway {
                message: format!("event stream error: {e}"),
                source: None,
            })),
        }
    });
    Box::pin(events)
}
