// SPDX-FileCopyrightText: 2026 Millwright Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP gateway for the Millwright assistant.
//!
//! Exposes the orchestrator as a JSON chat endpoint and a Server-Sent Events
//! stream, plus read-only views over the operational memory ledger.

pub mod handlers;
pub mod server;
pub mod sse;

pub use handlers::{ApiError, ErrorResponse, HealthResponse};
pub use server::{GatewayState, router, start_server};
