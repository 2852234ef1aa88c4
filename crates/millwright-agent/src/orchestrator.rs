// SPDX-FileCopyrightText: 2026 Millwright Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The conversation turn loop.
//!
//! A request is validated and sanitized, seeded with the system preamble and
//! the caller's history, then sent to the model. Tool calls requested by the
//! model are dispatched concurrently, their results appended in call order,
//! and the model is asked again. The loop ends on a plain text answer, a
//! capability failure, or the turn ceiling.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use futures::stream::FuturesUnordered;
use millwright_config::model::{AgentConfig, FactoryConfig};
use millwright_core::{
    ChatRequest, ChatResponse, Message, MillwrightError, ModelChunk, ModelProvider, ModelRequest,
    StreamEvent, ToolCallRequest, TurnMessage, validate_request,
};
use millwright_memory::{MemoryStore, today};
use millwright_tools::{ToolOutput, ToolRegistry};
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::prompt::build_system_prompt;
use crate::sanitize::sanitize;

pub const STATUS_THINKING: &str = "Thinking...";
pub const STATUS_ANALYZING: &str = "Analyzing results...";
pub const STATUS_INPUT_ADJUSTED: &str = "Input adjusted: removed instruction-like markers";

/// Buffered events per streaming request.
const EVENT_BUFFER: usize = 64;

/// Loop limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TurnLimits {
    /// Model invocations allowed per request.
    pub max_turns: usize,
    /// Wall-clock bound on one model invocation, stream included.
    pub model_timeout: Duration,
    /// Extra attempts for a retryable tool failure.
    pub tool_retries: u32,
}

impl Default for TurnLimits {
    fn default() -> Self {
        Self::from(&AgentConfig::default())
    }
}

impl From<&AgentConfig> for TurnLimits {
    fn from(config: &AgentConfig) -> Self {
        Self {
            max_turns: config.max_turns,
            model_timeout: Duration::from_secs(config.model_timeout_secs),
            tool_retries: config.tool_retries,
        }
    }
}

/// Where orchestrator events go.
///
/// Sends never fail by themselves. The turn loop checks [`EventSink::is_closed`]
/// between steps and abandons a request whose consumer has gone away.
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: Option<mpsc::Sender<StreamEvent>>,
}

impl EventSink {
    pub fn new(tx: mpsc::Sender<StreamEvent>) -> Self {
        Self { tx: Some(tx) }
    }

    /// A sink that drops every event, for the non-streaming path.
    pub fn discard() -> Self {
        Self { tx: None }
    }

    pub async fn emit(&self, event: StreamEvent) {
        if let Some(tx) = &self.tx
            && tx.send(event).await.is_err()
        {
            debug!("event receiver dropped");
        }
    }

    /// True once the receiving side has been dropped. A discarding sink is
    /// never closed.
    pub fn is_closed(&self) -> bool {
        self.tx.as_ref().is_some_and(mpsc::Sender::is_closed)
    }

    fn ensure_open(&self) -> Result<(), MillwrightError> {
        if self.is_closed() {
            return Err(MillwrightError::Internal("event consumer disconnected".into()));
        }
        Ok(())
    }
}

/// What one model invocation produced.
#[derive(Debug, Default)]
struct TurnOutput {
    text: String,
    tool_calls: Vec<ToolCallRequest>,
}

/// Drives the model/tool exchange for one request at a time.
///
/// Holds no per-conversation state: every request carries its own history.
pub struct Orchestrator {
    provider: Arc<dyn ModelProvider>,
    tools: Arc<ToolRegistry>,
    memory: Arc<MemoryStore>,
    factory: FactoryConfig,
    limits: TurnLimits,
}

impl Orchestrator {
    pub fn new(
        provider: Arc<dyn ModelProvider>,
        tools: Arc<ToolRegistry>,
        memory: Arc<MemoryStore>,
        factory: FactoryConfig,
        limits: TurnLimits,
    ) -> Self {
        Self {
            provider,
            tools,
            memory,
            factory,
            limits,
        }
    }

    pub fn memory(&self) -> &Arc<MemoryStore> {
        &self.memory
    }

    /// Starts a request in the background and returns its event stream.
    ///
    /// The stream always ends with exactly one `done` or `error` event.
    pub fn stream(self: &Arc<Self>, request: ChatRequest) -> mpsc::Receiver<StreamEvent> {
        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let this = Arc::clone(self);
        tokio::spawn(async move {
            this.run(request, EventSink::new(tx)).await;
        });
        rx
    }

    /// Runs a request to completion, finishing with one terminal event.
    pub async fn run(&self, request: ChatRequest, sink: EventSink) {
        match self.run_turns(&request, &sink).await {
            Ok(answer) => sink.emit(StreamEvent::done(answer)).await,
            Err(e) => {
                match &e {
                    _ if sink.is_closed() => info!("chat request abandoned by its consumer"),
                    MillwrightError::Validation(_) => warn!(error = %e, "chat request rejected"),
                    _ => error!(error = %e, "chat request failed"),
                }
                sink.emit(StreamEvent::error(e.to_string())).await;
            }
        }
    }

    /// Runs a request without streaming and returns the answer with the
    /// extended history.
    pub async fn respond(&self, request: ChatRequest) -> Result<ChatResponse, MillwrightError> {
        let answer = self.run_turns(&request, &EventSink::discard()).await?;
        let ChatRequest {
            message,
            mut history,
        } = request;
        history.push(Message::user(message));
        history.push(Message::assistant(answer.clone()));
        Ok(ChatResponse {
            response: answer,
            history,
        })
    }

    /// The turn loop. Emits every non-terminal event and returns the final
    /// answer; the caller emits the terminal event.
    pub async fn run_turns(
        &self,
        request: &ChatRequest,
        sink: &EventSink,
    ) -> Result<String, MillwrightError> {
        validate_request(request)?;
        let input = sanitize(&request.message)?;
        if input.altered() {
            sink.emit(StreamEvent::status(STATUS_INPUT_ADJUSTED)).await;
        }
        sink.emit(StreamEvent::status(STATUS_THINKING)).await;

        let date = today();
        let summary = self.memory.shift_summary(date).await;
        let system_prompt = build_system_prompt(&self.factory, &summary, date);

        let mut messages: Vec<TurnMessage> = request.history.iter().map(TurnMessage::from).collect();
        messages.push(TurnMessage::User {
            content: input.text,
        });
        let tools = self.tools.definitions();

        info!(
            provider = self.provider.name(),
            history = request.history.len(),
            tools = tools.len(),
            "chat request started"
        );

        let mut produced = String::new();
        for turn in 1..=self.limits.max_turns {
            sink.ensure_open()?;
            let model_request = ModelRequest {
                system_prompt: system_prompt.clone(),
                messages: messages.clone(),
                tools: tools.clone(),
            };
            let output = self.invoke_model(model_request, sink).await?;
            produced.push_str(&output.text);

            if output.tool_calls.is_empty() {
                info!(turn, "chat request completed");
                return final_answer(output.text, produced);
            }

            if turn == self.limits.max_turns {
                warn!(
                    turn,
                    pending_calls = output.tool_calls.len(),
                    "turn limit reached with tool calls outstanding"
                );
                break;
            }

            sink.ensure_open()?;
            info!(turn, tool_count = output.tool_calls.len(), "executing tool calls");
            let results = self.execute_tools(&output.tool_calls, sink).await;

            messages.push(TurnMessage::Assistant {
                content: (!output.text.is_empty()).then_some(output.text),
                tool_calls: output.tool_calls.clone(),
            });
            messages.extend(output.tool_calls.iter().zip(results).map(|(call, result)| {
                TurnMessage::ToolResult {
                    call_id: call.id.clone(),
                    name: call.name.clone(),
                    content: result.content,
                    is_error: result.is_error,
                }
            }));
            sink.emit(StreamEvent::status(STATUS_ANALYZING)).await;
        }

        if produced.trim().is_empty() {
            Err(MillwrightError::Internal(format!(
                "no answer after {} model turns",
                self.limits.max_turns
            )))
        } else {
            Ok(produced)
        }
    }

    /// One bounded model invocation. Text deltas are forwarded as they arrive.
    ///
    /// The deadline covers the provider only: time spent waiting for a slow
    /// consumer to take a delta pushes the deadline back by the same amount.
    async fn invoke_model(
        &self,
        request: ModelRequest,
        sink: &EventSink,
    ) -> Result<TurnOutput, MillwrightError> {
        let timeout = self.limits.model_timeout;
        let timed_out = |_| MillwrightError::Timeout { duration: timeout };
        let mut deadline = Instant::now() + timeout;

        let mut stream = tokio::time::timeout_at(deadline, self.provider.stream(request))
            .await
            .map_err(timed_out)??;
        let mut output = TurnOutput::default();
        while let Some(chunk) = tokio::time::timeout_at(deadline, stream.next())
            .await
            .map_err(timed_out)?
        {
            match chunk? {
                ModelChunk::TextDelta(text) => {
                    if !text.is_empty() {
                        output.text.push_str(&text);
                        let waited = Instant::now();
                        sink.emit(StreamEvent::delta(text)).await;
                        deadline += waited.elapsed();
                        sink.ensure_open()?;
                    }
                }
                ModelChunk::ToolCall(call) => output.tool_calls.push(call),
                ModelChunk::Finished { stop_reason } => {
                    debug!(stop_reason = ?stop_reason, "model turn finished");
                    break;
                }
            }
        }
        Ok(output)
    }

    /// Runs every call of one turn concurrently.
    ///
    /// `tool_call` events go out at dispatch, `tool_result` events in
    /// completion order. The returned outputs are in call order.
    async fn execute_tools(&self, calls: &[ToolCallRequest], sink: &EventSink) -> Vec<ToolOutput> {
        let mut pending = FuturesUnordered::new();
        for (index, call) in calls.iter().enumerate() {
            sink.emit(StreamEvent::tool_call(call.name.clone())).await;
            pending.push(async move { (index, self.execute_tool(call).await) });
        }

        let mut outputs: Vec<Option<ToolOutput>> = vec![None; calls.len()];
        while let Some((index, output)) = pending.next().await {
            sink.emit(StreamEvent::tool_result(calls[index].name.clone())).await;
            outputs[index] = Some(output);
        }
        outputs
            .into_iter()
            .map(|o| o.unwrap_or_else(|| ToolOutput::error("tool did not complete")))
            .collect()
    }

    /// Dispatches one call, retrying retryable failures. Any remaining
    /// failure becomes an error payload for the model.
    async fn execute_tool(&self, call: &ToolCallRequest) -> ToolOutput {
        let mut attempt = 0u32;
        loop {
            match self.tools.dispatch(&call.name, call.arguments.clone()).await {
                Ok(output) => {
                    debug!(tool = %call.name, is_error = output.is_error, "tool completed");
                    return output;
                }
                Err(e) if e.is_retryable() && attempt < self.limits.tool_retries => {
                    attempt += 1;
                    warn!(tool = %call.name, attempt, error = %e, "retrying tool call");
                }
                Err(e) => {
                    warn!(tool = %call.name, error = %e, "tool call failed");
                    return ToolOutput::error(e.to_string());
                }
            }
        }
    }
}

/// The last turn's text is authoritative; fall back to everything produced
/// when the last turn was silent.
fn final_answer(last: String, produced: String) -> Result<String, MillwrightError> {
    if !last.trim().is_empty() {
        Ok(last)
    } else if !produced.trim().is_empty() {
        Ok(produced)
    } else {
        Err(MillwrightError::Provider {
            message: "model returned an empty answer".into(),
            source: None,
        })
    }
}
