// SPDX-FileCopyrightText: 2026 Millwright Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Capability traits implemented outside the core crate.

pub mod provider;

pub use provider::ModelProvider;
