// SPDX-FileCopyrightText: 2026 Millwright Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tool trait, registry, and factory tools for the Millwright assistant.
//!
//! The [`ToolRegistry`] maps the closed set of [`ToolName`]s to handlers and
//! validates model-supplied arguments against each tool's JSON Schema.
//!
//! Factory tools include:
//! - [`builtin::MetricsTool`] -- OEE, scrap, quality and downtime lookups
//! - [`builtin::MemoryTool`] -- investigation and action ledger operations

pub mod builtin;
pub mod tool;

pub use builtin::{AnalyticsSource, HttpAnalytics, register_factory_tools};
pub use tool::{Tool, ToolName, ToolOutput, ToolRegistry};
