// SPDX-FileCopyrightText: 2026 Millwright Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Model capability trait for LLM provider integrations.

use std::pin::Pin;

use async_trait::async_trait;
use futures_core::Stream;

use crate::error::MillwrightError;
use crate::turn::{ModelChunk, ModelRequest};

/// Boxed stream of model chunks.
pub type ModelStream = Pin<Box<dyn Stream<Item = Result<ModelChunk, MillwrightError>> + Send>>;

/// The LLM capability: given messages and the tool schema, stream back either
/// answer text or tool invocation requests.
#[async_trait]
pub trait ModelProvider: Send + Sync {
    /// Provider name for logging.
    fn name(&self) -> &str;

    /// Sends one turn to the model and returns its chunk stream.
    async fn stream(&self, request: ModelRequest) -> Result<ModelStream, MillwrightError>;
}
