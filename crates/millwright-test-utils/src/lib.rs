// SPDX-FileCopyrightText: 2026 Millwright Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test doubles for Millwright integration tests.
//!
//! - [`MockProvider`] replays a scripted sequence of model turns.
//! - [`MockAnalytics`] answers metric queries without a metrics service.

pub mod mock_analytics;
pub mod mock_provider;

pub use mock_analytics::{MockAnalytics, sample_payload};
pub use mock_provider::{MockProvider, ScriptedTurn};
