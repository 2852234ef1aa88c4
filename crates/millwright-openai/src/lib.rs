// SPDX-FileCopyrightText: 2026 Millwright Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! OpenAI-compatible provider adapter for the Millwright assistant.
//!
//! This crate implements [`ModelProvider`] on top of the streaming Chat
//! Completions API. Text deltas are forwarded as they arrive; tool call
//! fragments are assembled per index and emitted once the model finishes
//! its turn.

pub mod client;
pub mod sse;
pub mod types;

use std::collections::BTreeMap;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use millwright_config::model::ProviderConfig;
use millwright_core::{
    MillwrightError, ModelChunk, ModelProvider, ModelRequest, ModelStream, ToolCallRequest,
    TurnMessage,
};
use tracing::{info, warn};

use crate::client::OpenAiClient;
use crate::sse::SseEvent;
use crate::types::{
    ApiFunction, ApiFunctionCall, ApiMessage, ApiTool, ApiToolCall, ChatCompletionRequest,
};

/// OpenAI-compatible chat provider implementing [`ModelProvider`].
///
/// API key resolution order: config -> `OPENAI_API_KEY` env var -> error.
pub struct OpenAiProvider {
    client: OpenAiClient,
    max_tokens: Option<u32>,
}

impl OpenAiProvider {
    /// Creates a provider from the `[provider]` configuration section.
    pub fn new(config: &ProviderConfig) -> Result<Self, MillwrightError> {
        let api_key = resolve_api_key(&config.api_key)?;
        let client = OpenAiClient::new(&api_key, &config.base_url, config.model.clone())?;

        info!(model = %config.model, base_url = %config.base_url, "OpenAI provider initialized");

        Ok(Self {
            client,
            max_tokens: config.max_tokens,
        })
    }

    /// Converts a [`ModelRequest`] to a Chat Completions request.
    fn to_chat_request(&self, request: &ModelRequest) -> ChatCompletionRequest {
        let mut messages = Vec::with_capacity(request.messages.len() + 1);
        messages.push(ApiMessage::text("system", request.system_prompt.clone()));
        messages.extend(request.messages.iter().map(convert_message));

        let tools: Vec<ApiTool> = request
            .tools
            .iter()
            .map(|t| ApiTool {
                tool_type: "function".into(),
                function: ApiFunction {
                    name: t.name.clone(),
                    description: t.description.clone(),
                    parameters: t.parameters.clone(),
                },
            })
            .collect();

        ChatCompletionRequest {
            model: self.client.model().to_string(),
            messages,
            tools: (!tools.is_empty()).then_some(tools),
            max_tokens: self.max_tokens,
            stream: true,
        }
    }
}

#[async_trait]
impl ModelProvider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    async fn stream(&self, request: ModelRequest) -> Result<ModelStream, MillwrightError> {
        let api_request = self.to_chat_request(&request);
        let events = self.client.stream_chat(&api_request).await?;

        let mut assembler = ChunkAssembler::default();
        let chunks = events
            .map(move |result| match result {
                Ok(event) => assembler.push(event),
                Err(e) => vec![Err(e)],
            })
            .flat_map(stream::iter);

        Ok(Box::pin(chunks))
    }
}

/// Converts one turn message to the Chat Completions shape.
fn convert_message(message: &TurnMessage) -> ApiMessage {
    match message {
        TurnMessage::User { content } => ApiMessage::text("user", content.clone()),
        TurnMessage::Assistant {
            content,
            tool_calls,
        } => ApiMessage {
            role: "assistant".into(),
            content: content.clone(),
            tool_calls: (!tool_calls.is_empty()).then(|| {
                tool_calls
                    .iter()
                    .map(|call| ApiToolCall {
                        id: call.id.clone(),
                        call_type: "function".into(),
                        function: ApiFunctionCall {
                            name: call.name.clone(),
                            arguments: call.arguments.to_string(),
                        },
                    })
                    .collect()
            }),
            tool_call_id: None,
        },
        TurnMessage::ToolResult {
            call_id, content, ..
        } => ApiMessage {
            role: "tool".into(),
            content: Some(content.clone()),
            tool_calls: None,
            tool_call_id: Some(call_id.clone()),
        },
    }
}

#[derive(Debug, Default)]
struct PartialCall {
    id: Option<String>,
    name: String,
    arguments: String,
}

/// Stateful translation of SSE events into [`ModelChunk`]s.
///
/// Tool call fragments are keyed by their index and flushed, in index order,
/// when a `finish_reason` or the `[DONE]` sentinel arrives.
#[derive(Debug, Default)]
struct ChunkAssembler {
    calls: BTreeMap<usize, PartialCall>,
    finished: bool,
}

impl ChunkAssembler {
    fn push(&mut self, event: SseEvent) -> Vec<Result<ModelChunk, MillwrightError>> {
        if self.finished {
            return Vec::new();
        }

        let mut out = Vec::new();
        match event {
            SseEvent::Chunk(chunk) => {
                for choice in chunk.choices {
                    if let Some(text) = choice.delta.content
                        && !text.is_empty()
                    {
                        out.push(Ok(ModelChunk::TextDelta(text)));
                    }
                    for fragment in choice.delta.tool_calls.unwrap_or_default() {
                        let call = self.calls.entry(fragment.index).or_default();
                        if let Some(id) = fragment.id {
                            call.id = Some(id);
                        }
                        if let Some(function) = fragment.function {
                            if let Some(name) = function.name {
                                call.name.push_str(&name);
                            }
                            if let Some(args) = function.arguments {
                                call.arguments.push_str(&args);
                            }
                        }
                    }
                    if let Some(reason) = choice.finish_reason {
                        self.finish(Some(reason), &mut out);
                    }
                }
            }
            SseEvent::Done => self.finish(None, &mut out),
        }
        out
    }

    fn finish(
        &mut self,
        stop_reason: Option<String>,
        out: &mut Vec<Result<ModelChunk, MillwrightError>>,
    ) {
        for (index, call) in std::mem::take(&mut self.calls) {
            if call.name.is_empty() {
                warn!(index, "dropping tool call fragment without a name");
                continue;
            }
            let arguments = if call.arguments.trim().is_empty() {
                serde_json::Value::Object(serde_json::Map::new())
            } else {
                serde_json::from_str(&call.arguments).unwrap_or_else(|e| {
                    warn!(error = %e, json = %call.arguments, "failed to parse tool call arguments");
                    serde_json::json!({ "_parse_error": e.to_string(), "_raw": call.arguments })
                })
            };
            out.push(Ok(ModelChunk::ToolCall(ToolCallRequest {
                id: call.id.unwrap_or_else(|| format!("call_{index}")),
                name: call.name,
                arguments,
            })));
        }
        out.push(Ok(ModelChunk::Finished { stop_reason }));
        self.finished = true;
    }
}

/// Resolves the API key from config or environment.
fn resolve_api_key(config_key: &Option<String>) -> Result<String, MillwrightError> {
    if let Some(key) = config_key
        && !key.is_empty()
    {
        return Ok(key.clone());
    }

    std::env::var("OPENAI_API_KEY").map_err(|_| {
        MillwrightError::Config(
            "OpenAI API key not found. Set provider.api_key in config or the OPENAI_API_KEY environment variable.".into(),
        )
    })
}
