// SPDX-FileCopyrightText: 2026 Millwright Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Millwright factory-operations assistant.
//!
//! This crate provides the shared error taxonomy, the conversation and wire
//! types, and the model capability trait that provider crates implement.

pub mod error;
pub mod event;
pub mod traits;
pub mod turn;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::MillwrightError;
pub use event::StreamEvent;
pub use traits::ModelProvider;
pub use traits::provider::ModelStream;
pub use turn::{ModelChunk, ModelRequest, ToolCallRequest, ToolDefinition, TurnMessage};
pub use types::{ChatRequest, ChatResponse, Message, Role, validate_request};
