// SPDX-FileCopyrightText: 2026 Millwright Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Client side of the Millwright chat stream.
//!
//! [`ChatSession`] holds the visible conversation and applies stream events
//! to it. [`ChatClient`] opens the event stream against a gateway and drives a
//! session until a terminal event arrives or the caller cancels.

pub mod client;
pub mod consumer;
pub mod sse;

pub use client::{ChatClient, SendOutcome};
pub use consumer::{ChatSession, DisplayMessage};
pub use sse::decode_events;
