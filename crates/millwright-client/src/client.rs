// SPDX-FileCopyrightText: 2026 Millwright Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the gateway's streaming chat endpoint.

use std::time::Duration;

use futures::StreamExt;
use millwright_core::{ChatRequest, MillwrightError, StreamEvent};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::consumer::ChatSession;
use crate::sse::{EventStream, decode_events};

const STREAM_PATH: &str = "/api/chat/stream";
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// How a [`ChatClient::send`] ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    /// `done` arrived; carries the final answer.
    Completed(String),
    /// `error` arrived or the transport broke.
    Failed(String),
    /// The caller cancelled before a terminal event.
    Cancelled,
}

/// Talks to a running gateway.
#[derive(Debug, Clone)]
pub struct ChatClient {
    http: reqwest::Client,
    base_url: String,
}

impl ChatClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, MillwrightError> {
        let http = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| MillwrightError::Gateway {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Posts `request` and returns its decoded event stream.
    ///
    /// Non-success statuses become errors carrying the gateway's message.
    pub async fn open_stream(&self, request: &ChatRequest) -> Result<EventStream, MillwrightError> {
        let url = format!("{}{STREAM_PATH}", self.base_url);
        let response = self
            .http
            .post(&url)
            .header("accept", "text/event-stream")
            .json(request)
            .send()
            .await
            .map_err(|e| MillwrightError::Gateway {
                message: format!("failed to reach {url}: {e}"),
                source: Some(Box::new(e)),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<serde_json::Value>(&body)
                .ok()
                .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(str::to_string))
                .unwrap_or(body);
            return Err(MillwrightError::Gateway {
                message: format!("gateway returned {status}: {detail}"),
                source: None,
            });
        }

        Ok(decode_events(response.bytes_stream()))
    }

    /// Sends `message` through `session` and applies every event until the
    /// stream ends.
    ///
    /// `on_event` sees each event after it has been applied. Cancelling
    /// `cancel` drops the connection and finalizes the session without
    /// waiting for a terminal event.
    pub async fn send<F>(
        &self,
        session: &mut ChatSession,
        message: impl Into<String>,
        cancel: &CancellationToken,
        mut on_event: F,
    ) -> Result<SendOutcome, MillwrightError>
    where
        F: FnMut(&StreamEvent, &ChatSession),
    {
        let request = session.begin(message)?;

        let opened = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            opened = self.open_stream(&request) => Some(opened),
        };
        let mut events = match opened {
            None => {
                session.cancel();
                return Ok(SendOutcome::Cancelled);
            }
            Some(Ok(events)) => events,
            Some(Err(e)) => {
                session.fail(e.to_string());
                return Err(e);
            }
        };

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    debug!("chat stream cancelled");
                    session.cancel();
                    return Ok(SendOutcome::Cancelled);
                }
                next = events.next() => match next {
                    Some(Ok(event)) => {
                        let finished = session.apply(&event);
                        on_event(&event, session);
                        if finished {
                            return Ok(match event {
                                StreamEvent::Done { content } => SendOutcome::Completed(content),
                                StreamEvent::Error { content } => SendOutcome::Failed(content),
                                other => SendOutcome::Failed(format!(
                                    "stream ended on a {} event",
                                    other.kind()
                                )),
                            });
                        }
                    }
                    Some(Err(e)) => {
                        warn!(error = %e, "chat stream failed");
                        session.fail(e.to_string());
                        return Ok(SendOutcome::Failed(e.to_string()));
                    }
                    None => {
                        let message = "stream closed before the answer completed".to_string();
                        warn!("{message}");
                        session.fail(message.clone());
                        return Ok(SendOutcome::Failed(message));
                    }
                }
            }
        }
    }
}
