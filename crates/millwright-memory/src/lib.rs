// SPDX-FileCopyrightText: 2026 Millwright Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Operational memory for the Millwright assistant.
//!
//! Tracks investigations (factory issues under follow-up) and actions
//! (changes with an expected impact), and derives shift handoff summaries
//! from them.
//!
//! ## Architecture
//!
//! - **MemoryStore**: the ledger, with lifecycle and write-once rules
//! - **DocumentStore**: opaque byte persistence (file or in-memory)
//! - **Types**: Investigation, Action, ShiftSummary, filters and stats

pub mod document;
pub mod store;
pub mod types;

pub use document::{DocumentStore, FileDocumentStore, InMemoryDocumentStore};
pub use store::{MEMORY_DOCUMENT_KEY, MemoryStore, today};
pub use types::*;
