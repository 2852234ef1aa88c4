// SPDX-FileCopyrightText: 2026 Millwright Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation orchestration for the Millwright assistant.
//!
//! [`Orchestrator`] runs the model/tool turn loop and reports progress as
//! [`StreamEvent`](millwright_core::StreamEvent)s. User input passes through
//! [`sanitize`] and the model sees a preamble from [`build_system_prompt`].

pub mod orchestrator;
pub mod prompt;
pub mod sanitize;

pub use orchestrator::{
    EventSink, Orchestrator, STATUS_ANALYZING, STATUS_INPUT_ADJUSTED, STATUS_THINKING, TurnLimits,
};
pub use prompt::{build_system_prompt, memory_context};
pub use sanitize::{Sanitized, sanitize};
