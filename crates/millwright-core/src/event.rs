// SPDX-FileCopyrightText: 2026 Millwright Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Stream events emitted by the orchestrator and carried on the wire.
//!
//! Each event serializes to a flat JSON object tagged by `type`:
//!
//! ```json
//! {"type": "delta", "content": "OEE was "}
//! {"type": "tool_call", "name": "get_oee_metrics"}
//! {"type": "done", "content": "OEE was 72.4% yesterday."}
//! ```
//!
//! Exactly one terminal event (`done` or `error`) ends every stream.

use serde::{Deserialize, Serialize};

/// A single event in a chat response stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// Transient progress hint.
    Status { content: String },
    /// Text fragment to append to the in-progress answer.
    Delta { content: String },
    /// A tool invocation has started.
    ToolCall { name: String },
    /// That tool invocation finished.
    ToolResult { name: String },
    /// Terminal: the authoritative final answer.
    Done { content: String },
    /// Terminal: the request failed.
    Error { content: String },
}

impl StreamEvent {
    pub fn status(content: impl Into<String>) -> Self {
        StreamEvent::Status {
            content: content.into(),
        }
    }

    pub fn delta(content: impl Into<String>) -> Self {
        StreamEvent::Delta {
            content: content.into(),
        }
    }

    pub fn tool_call(name: impl Into<String>) -> Self {
        StreamEvent::ToolCall { name: name.into() }
    }

    pub fn tool_result(name: impl Into<String>) -> Self {
        StreamEvent::ToolResult { name: name.into() }
    }

    pub fn done(content: impl Into<String>) -> Self {
        StreamEvent::Done {
            content: content.into(),
        }
    }

    pub fn error(content: impl Into<String>) -> Self {
        StreamEvent::Error {
            content: content.into(),
        }
    }

    /// Returns true for `done` and `error`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamEvent::Done { .. } | StreamEvent::Error { .. })
    }

    /// The wire name of this event's type.
    pub fn kind(&self) -> &'static str {
        match self {
            StreamEvent::Status { .. } => "status",
            StreamEvent::Delta { .. } => "delta",
            StreamEvent::ToolCall { .. } => "tool_call",
            StreamEvent::ToolResult { .. } => "tool_result",
            StreamEvent::Done { .. } => "done",
            StreamEvent::Error { .. } => "error",
        }
    }
}
