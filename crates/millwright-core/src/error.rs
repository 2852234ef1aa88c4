// SPDX-FileCopyrightText: 2026 Millwright Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Millwright assistant backend.

use thiserror::Error;

/// The primary error type shared by the orchestrator, tools, memory ledger and gateway.
#[derive(Debug, Error)]
pub enum MillwrightError {
    /// Malformed or oversized input (chat request bounds, tool arguments, dates).
    #[error("validation error: {0}")]
    Validation(String),

    /// A tool handler failed while executing.
    #[error("tool `{tool}` failed: {message}")]
    ToolExecution { tool: String, message: String },

    /// The requested tool name is not part of the registry.
    #[error("unknown tool: {name}")]
    Lookup { name: String },

    /// LLM capability errors (network failure, API error, malformed stream).
    #[error("provider error: {message}")]
    Provider {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Investigation status change that the lifecycle does not allow.
    #[error("invalid status transition: {from} -> {to}")]
    StateTransition { from: String, to: String },

    /// Mutation attempted on an investigation in a terminal status.
    #[error("investigation {id} is {status} and no longer accepts changes")]
    FrozenInvestigation { id: String, status: String },

    /// A memory record lookup missed.
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    /// Persistence backend errors (file I/O, document serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Configuration errors detected at runtime.
    #[error("configuration error: {0}")]
    Config(String),

    /// HTTP gateway errors (bind failure, server crash).
    #[error("gateway error: {message}")]
    Gateway {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl MillwrightError {
    /// Whether a tool call that failed with this error may be attempted again.
    ///
    /// Deterministic rejections (bad arguments, unknown tool, lifecycle
    /// violations) fail the same way on every attempt and are not retried.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            MillwrightError::ToolExecution { .. }
                | MillwrightError::Storage { .. }
                | MillwrightError::Timeout { .. }
        )
    }

    /// Whether this error is a capability-level failure of the model provider.
    pub fn is_capability_failure(&self) -> bool {
        matches!(
            self,
            MillwrightError::Provider { .. } | MillwrightError::Timeout { .. }
        )
    }

    /// Shorthand for a [`MillwrightError::ToolExecution`].
    pub fn tool(tool: impl Into<String>, message: impl Into<String>) -> Self {
        MillwrightError::ToolExecution {
            tool: tool.into(),
            message: message.into(),
        }
    }
}
