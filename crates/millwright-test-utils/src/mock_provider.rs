// SPDX-FileCopyrightText: 2026 Millwright Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Scripted model provider for deterministic orchestration tests.
//!
//! Each call to [`ModelProvider::stream`] pops the next [`ScriptedTurn`].
//! When the script runs out a plain "mock response" answer is returned.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use futures::stream;
use serde_json::Value;
use tokio::sync::Mutex;

use millwright_core::{
    MillwrightError, ModelChunk, ModelProvider, ModelRequest, ToolCallRequest,
    traits::provider::ModelStream,
};

/// One scripted model invocation.
#[derive(Debug, Clone)]
pub enum ScriptedTurn {
    /// Stream these chunks, then end.
    Chunks(Vec<ModelChunk>),
    /// Fail before any chunk is produced.
    Fail(String),
    /// Stream these chunks, then fail mid-stream.
    FailAfter(Vec<ModelChunk>, String),
    /// Never produce a chunk.
    Hang,
}

/// A mock LLM provider replaying a fixed script.
#[derive(Clone, Default)]
pub struct MockProvider {
    script: Arc<Mutex<VecDeque<ScriptedTurn>>>,
    requests: Arc<Mutex<Vec<ModelRequest>>>,
    calls: Arc<AtomicUsize>,
}

impl MockProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a turn that streams `text` word by word and finishes.
    pub fn then_text(self, text: &str) -> Self {
        self.then(ScriptedTurn::Chunks(text_chunks(text)))
    }

    /// Appends a turn that requests the given tool calls.
    ///
    /// Call ids are `call_{turn}_{index}`.
    pub fn then_tool_calls(self, calls: Vec<(&str, Value)>) -> Self {
        let turn = self.script_len();
        let mut chunks: Vec<ModelChunk> = calls
            .into_iter()
            .enumerate()
            .map(|(i, (name, arguments))| {
                ModelChunk::ToolCall(ToolCallRequest {
                    id: format!("call_{turn}_{i}"),
                    name: name.to_string(),
                    arguments,
                })
            })
            .collect();
        chunks.push(ModelChunk::Finished {
            stop_reason: Some("tool_calls".into()),
        });
        self.then(ScriptedTurn::Chunks(chunks))
    }

    /// Appends a turn that fails with a provider error.
    pub fn then_fail(self, message: &str) -> Self {
        self.then(ScriptedTurn::Fail(message.to_string()))
    }

    /// Appends a turn that streams `text` and then fails.
    pub fn then_fail_after_text(self, text: &str, message: &str) -> Self {
        let mut chunks = text_chunks(text);
        chunks.pop();
        self.then(ScriptedTurn::FailAfter(chunks, message.to_string()))
    }

    /// Appends a turn that never responds.
    pub fn then_hang(self) -> Self {
        self.then(ScriptedTurn::Hang)
    }

    pub fn then(mut self, turn: ScriptedTurn) -> Self {
        if let Some(script) = Arc::get_mut(&mut self.script) {
            script.get_mut().push_back(turn);
        }
        self
    }

    /// Appends a turn after construction, e.g. from inside a running test.
    pub async fn push(&self, turn: ScriptedTurn) {
        self.script.lock().await.push_back(turn);
    }

    /// Number of times [`ModelProvider::stream`] has been called.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Every request received so far, in call order.
    pub async fn requests(&self) -> Vec<ModelRequest> {
        self.requests.lock().await.clone()
    }

    fn script_len(&self) -> usize {
        self.script.try_lock().map(|s| s.len()).unwrap_or_default()
    }
}

fn text_chunks(text: &str) -> Vec<ModelChunk> {
    let mut chunks: Vec<ModelChunk> = text
        .split_inclusive(' ')
        .map(|word| ModelChunk::TextDelta(word.to_string()))
        .collect();
    chunks.push(ModelChunk::Finished {
        stop_reason: Some("stop".into()),
    });
    chunks
}

fn provider_error(message: String) -> MillwrightError {
    MillwrightError::Provider {
        message,
        source: None,
    }
}

#[async_trait]
impl ModelProvider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    async fn stream(&self, request: ModelRequest) -> Result<ModelStream, MillwrightError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().await.push(request);

        let turn = self
            .script
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| ScriptedTurn::Chunks(text_chunks("mock response")));

        match turn {
            ScriptedTurn::Chunks(chunks) => Ok(Box::pin(stream::iter(chunks.into_iter().map(Ok)))),
            ScriptedTurn::Fail(message) => Err(provider_error(message)),
            ScriptedTurn::FailAfter(chunks, message) => {
                let items = chunks
                    .into_iter()
                    .map(Ok)
                    .chain(std::iter::once(Err(provider_error(message))));
                Ok(Box::pin(stream::iter(items)))
            }
            ScriptedTurn::Hang => Ok(Box::pin(stream::pending())),
        }
    }
}
