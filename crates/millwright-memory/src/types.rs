// SPDX-FileCopyrightText: 2026 Millwright Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Memory ledger record types: investigations, actions and derived views.

use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Schema version written into every persisted document.
pub const DOCUMENT_VERSION: &str = "1.0";

/// Lifecycle status of an investigation.
///
/// Allowed moves: `open -> in_progress -> resolved -> closed`, plus
/// `open -> closed` and `in_progress -> closed`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum InvestigationStatus {
    Open,
    InProgress,
    Resolved,
    Closed,
}

impl InvestigationStatus {
    /// Resolved and closed investigations accept no new findings.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Resolved | Self::Closed)
    }

    /// Whether the investigation still counts as active work.
    pub fn is_active(&self) -> bool {
        !self.is_terminal()
    }

    /// Whether `self -> next` is a legal lifecycle move.
    pub fn can_transition_to(&self, next: InvestigationStatus) -> bool {
        use InvestigationStatus::*;
        matches!(
            (self, next),
            (Open, InProgress)
                | (Open, Closed)
                | (InProgress, Resolved)
                | (InProgress, Closed)
                | (Resolved, Closed)
        )
    }
}

/// A tracked factory issue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Investigation {
    /// Unique identifier (`INV-YYYYMMDD-HHMMSS-xxxx`).
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub machine_id: Option<String>,
    #[serde(default)]
    pub supplier_id: Option<String>,
    pub status: InvestigationStatus,
    /// What triggered the investigation.
    pub initial_observation: String,
    /// Append-only findings, oldest first.
    #[serde(default)]
    pub findings: Vec<String>,
    /// Candidate explanations recorded when the investigation was opened.
    #[serde(default)]
    pub hypotheses: Vec<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// An operational change with an expected outcome to follow up on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    /// Unique identifier (`ACT-YYYYMMDD-HHMMSS-xxxx`).
    pub id: String,
    pub description: String,
    /// Category, e.g. `parameter_change`, `maintenance`, `process_change`.
    pub action_type: String,
    #[serde(default)]
    pub machine_id: Option<String>,
    /// Metrics captured before the change (e.g. `{"oee": 0.72}`).
    #[serde(default)]
    pub baseline_metrics: BTreeMap<String, f64>,
    pub expected_impact: String,
    /// Observed outcome. Written at most once.
    #[serde(default)]
    pub actual_impact: Option<String>,
    #[serde(default)]
    pub follow_up_date: Option<NaiveDate>,
    pub created_at: NaiveDateTime,
}

impl Action {
    /// Pending = follow-up due on or before `date` and no outcome recorded yet.
    pub fn is_pending_on(&self, date: NaiveDate) -> bool {
        self.actual_impact.is_none() && self.follow_up_date.is_some_and(|due| due <= date)
    }
}

/// The persisted ledger document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryDocument {
    pub version: String,
    #[serde(default)]
    pub investigations: Vec<Investigation>,
    #[serde(default)]
    pub actions: Vec<Action>,
    pub last_updated: NaiveDateTime,
}

impl MemoryDocument {
    /// An empty ledger stamped with `now`.
    pub fn empty(now: NaiveDateTime) -> Self {
        Self {
            version: DOCUMENT_VERSION.to_string(),
            investigations: Vec::new(),
            actions: Vec::new(),
            last_updated: now,
        }
    }
}

/// Input for opening a new investigation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewInvestigation {
    pub title: String,
    pub initial_observation: String,
    #[serde(default)]
    pub machine_id: Option<String>,
    #[serde(default)]
    pub supplier_id: Option<String>,
    #[serde(default)]
    pub hypotheses: Vec<String>,
}

/// Input for logging a new action.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewAction {
    pub description: String,
    pub action_type: String,
    pub expected_impact: String,
    #[serde(default)]
    pub machine_id: Option<String>,
    #[serde(default)]
    pub baseline_metrics: BTreeMap<String, f64>,
    #[serde(default)]
    pub follow_up_date: Option<NaiveDate>,
}

/// Filters for investigation and action listings. All fields are conjunctive.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MemoryFilter {
    #[serde(default)]
    pub machine_id: Option<String>,
    #[serde(default)]
    pub supplier_id: Option<String>,
    #[serde(default)]
    pub status: Option<InvestigationStatus>,
}

impl MemoryFilter {
    pub fn matches_investigation(&self, inv: &Investigation) -> bool {
        self.machine_id
            .as_ref()
            .is_none_or(|m| inv.machine_id.as_ref() == Some(m))
            && self
                .supplier_id
                .as_ref()
                .is_none_or(|s| inv.supplier_id.as_ref() == Some(s))
            && self.status.is_none_or(|s| inv.status == s)
    }

    /// Actions carry no supplier or status, so only the machine filter applies.
    pub fn matches_action(&self, action: &Action) -> bool {
        self.machine_id
            .as_ref()
            .is_none_or(|m| action.machine_id.as_ref() == Some(m))
    }
}

/// Result of an `actual_impact` write.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImpactRecord {
    pub action: Action,
    /// False when an earlier outcome was already present and kept.
    pub recorded: bool,
}

/// Counts reported with a shift summary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShiftCounts {
    pub active_investigations: usize,
    pub todays_actions: usize,
    pub pending_followups: usize,
}

/// Shift handoff view for a single date, computed on demand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShiftSummary {
    pub date: NaiveDate,
    pub active_investigations: Vec<Investigation>,
    pub todays_actions: Vec<Action>,
    pub pending_followups: Vec<Action>,
    pub counts: ShiftCounts,
}

/// Filtered slice of the ledger returned to the model as context.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MemoryContext {
    pub investigations: Vec<Investigation>,
    pub actions: Vec<Action>,
    pub total_investigations: usize,
    pub total_actions: usize,
}

/// Ledger-wide statistics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MemoryStats {
    pub total_investigations: usize,
    pub total_actions: usize,
    pub open_investigations: usize,
    pub in_progress_investigations: usize,
    pub resolved_investigations: usize,
    pub closed_investigations: usize,
    pub pending_followups: usize,
    pub last_updated: NaiveDateTime,
}
