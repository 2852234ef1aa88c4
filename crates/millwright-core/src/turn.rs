// SPDX-FileCopyrightText: 2026 Millwright Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message sequence and chunk types exchanged with the model capability.

use serde::{Deserialize, Serialize};

use crate::types::{Message, Role};

/// A structured tool invocation requested by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallRequest {
    /// Provider-assigned call identifier, echoed back with the result.
    pub id: String,
    /// Requested tool name (not yet checked against the registry).
    pub name: String,
    /// Parsed JSON arguments.
    pub arguments: serde_json::Value,
}

/// A tool description advertised to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    /// JSON Schema of the tool arguments.
    pub parameters: serde_json::Value,
}

/// One entry of the per-request message sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TurnMessage {
    User {
        content: String,
    },
    Assistant {
        content: Option<String>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        tool_calls: Vec<ToolCallRequest>,
    },
    ToolResult {
        call_id: String,
        name: String,
        content: String,
        is_error: bool,
    },
}

impl From<&Message> for TurnMessage {
    fn from(msg: &Message) -> Self {
        match msg.role {
            Role::User => TurnMessage::User {
                content: msg.content.clone(),
            },
            Role::Assistant => TurnMessage::Assistant {
                content: Some(msg.content.clone()),
                tool_calls: Vec::new(),
            },
        }
    }
}

/// A request to the model capability for one turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelRequest {
    /// System preamble with factory and memory context.
    pub system_prompt: String,
    /// History, the new user message, and any prior tool exchanges.
    pub messages: Vec<TurnMessage>,
    /// Full tool schema set.
    pub tools: Vec<ToolDefinition>,
}

/// A single chunk from the model's streamed reply.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelChunk {
    /// Incremental answer text.
    TextDelta(String),
    /// A fully assembled tool invocation request.
    ToolCall(ToolCallRequest),
    /// The reply is complete.
    Finished { stop_reason: Option<String> },
}
