// SPDX-FileCopyrightText: 2026 Millwright Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for OpenAI-compatible Chat Completions endpoints.
//!
//! Provides [`OpenAiClient`] which handles authentication, request
//! construction, streaming SSE responses, and transient error retry.

use std::pin::Pin;
use std::time::Duration;

use futures::Stream;
use millwright_core::MillwrightError;
use reqwest::header::{HeaderMap, HeaderValue};
use tracing::{debug, warn};

use crate::sse::{self, SseEvent};
use crate::types::{ApiErrorResponse, ChatCompletionRequest};

/// Boxed stream of decoded SSE events.
pub type SseStream = Pin<Box<dyn Stream<Item = Result<SseEvent, MillwrightError>> + Send>>;

/// HTTP client for Chat Completions communication.
///
/// Retries once on transient statuses (429, 500, 502, 503) before the
/// response stream starts. Nothing is retried once streaming has begun.
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    client: reqwest::Client,
    model: String,
    max_retries: u32,
    endpoint: String,
}

impl OpenAiClient {
    /// Creates a new client.
    ///
    /// `base_url` is the API root (e.g. `https://api.openai.com/v1`);
    /// requests go to `{base_url}/chat/completions`.
    pub fn new(api_key: &str, base_url: &str, model: String) -> Result<Self, MillwrightError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            reqwest::header::AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {api_key}")).map_err(|e| {
                MillwrightError::Config(format!("invalid API key header value: {e}"))
            })?,
        );
        headers.insert(
            reqwest::header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| MillwrightError::Provider {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(Self {
            client,
            model,
            max_retries: 1,
            endpoint: format!("{}/chat/completions", base_url.trim_end_matches('/')),
        })
    }

    /// Returns the model identifier.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Sends a streaming request and returns the decoded event stream.
    pub async fn stream_chat(
        &self,
        request: &ChatCompletionRequest,
    ) -> Result<SseStream, MillwrightError> {
        let mut req = request.clone();
        req.stream = true;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                warn!(attempt, "retrying streaming request after transient error");
                tokio::time::sleep(Duration::from_millis(500)).await;
            }

            let response = self
                .client
                .post(&self.endpoint)
                .json(&req)
                .send()
                .await
                .map_err(|e| MillwrightError::Provider {
                    message: format!("HTTP request failed: {e}"),
                    source: Some(Box::new(e)),
                })?;

            let status = response.status();
            debug!(status = %status, attempt, "streaming response received");

            if status.is_success() {
                return Ok(sse::parse_sse_stream(response));
            }

            let body = response.text().await.unwrap_or_default();
            if is_transient_error(status) && attempt < self.max_retries {
                warn!(status = %status, body = %body, "transient error, will retry");
                continue;
            }

            let message = match serde_json::from_str::<ApiErrorResponse>(&body) {
                Ok(api_err) => format!(
                    "API error ({}): {}",
                    api_err.error.type_.as_deref().unwrap_or("unknown"),
                    api_err.error.message
                ),
                Err(_) => format!("API returned {status}: {body}"),
            };
            return Err(MillwrightError::Provider {
                message,
                source: None,
            });
        }

        Err(MillwrightError::Provider {
            message: "streaming request failed after retries".into(),
            source: None,
        })
    }
}

/// Returns true for HTTP status codes that indicate transient errors worth retrying.
fn is_transient_error(status: reqwest::StatusCode) -> bool {
    matches!(status.as_u16(), 429 | 500 | 502 | 503)
}
