// SPDX-FileCopyrightText: 2026 Millwright Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tools that read and write the operational memory ledger.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use millwright_core::MillwrightError;
use millwright_memory::{
    InvestigationStatus, MemoryFilter, MemoryStore, NewAction, NewInvestigation, today,
};
use serde::Deserialize;
use serde_json::json;

use crate::tool::{Tool, ToolName, ToolOutput, parse_args};

const DATE_PATTERN: &str = "^\\d{4}-\\d{2}-\\d{2}$";

/// A memory-ledger tool. One instance per [`ToolName`] it serves.
pub struct MemoryTool {
    name: ToolName,
    store: Arc<MemoryStore>,
}

impl MemoryTool {
    /// Returns `None` for names that are not memory tools.
    pub fn new(name: ToolName, store: Arc<MemoryStore>) -> Option<Self> {
        MEMORY_TOOLS
            .contains(&name)
            .then_some(Self { name, store })
    }
}

/// Every tool served by [`MemoryTool`].
pub const MEMORY_TOOLS: [ToolName; 8] = [
    ToolName::SaveInvestigation,
    ToolName::AddInvestigationFinding,
    ToolName::UpdateInvestigationStatus,
    ToolName::LogAction,
    ToolName::RecordActionImpact,
    ToolName::GetPendingFollowups,
    ToolName::GetMemoryContext,
    ToolName::GetShiftSummary,
];

#[derive(Deserialize)]
struct FindingArgs {
    investigation_id: String,
    finding: String,
}

#[derive(Deserialize)]
struct StatusArgs {
    investigation_id: String,
    status: InvestigationStatus,
}

#[derive(Deserialize)]
struct ImpactArgs {
    action_id: String,
    actual_impact: String,
}

#[derive(Deserialize)]
struct ShiftArgs {
    #[serde(default)]
    date: Option<NaiveDate>,
}

fn to_value<T: serde::Serialize>(value: &T) -> Result<serde_json::Value, MillwrightError> {
    serde_json::to_value(value).map_err(|e| MillwrightError::Internal(e.to_string()))
}

#[async_trait]
impl Tool for MemoryTool {
    fn name(&self) -> ToolName {
        self.name
    }

    fn description(&self) -> &str {
        match self.name {
            ToolName::SaveInvestigation => {
                "Create a new investigation to track an ongoing factory issue. Use this when the \
                 user reports a problem that needs follow-up, such as quality issues, machine \
                 anomalies, or supplier concerns."
            }
            ToolName::AddInvestigationFinding => {
                "Append a finding to an open or in-progress investigation."
            }
            ToolName::UpdateInvestigationStatus => {
                "Advance an investigation's status (open -> in_progress -> resolved -> closed, \
                 or close it directly). Resolved and closed investigations cannot be reopened."
            }
            ToolName::LogAction => {
                "Record an action taken by the user with baseline metrics for impact tracking. \
                 Use this when the user makes a parameter change, schedules maintenance, or \
                 implements a process change."
            }
            ToolName::RecordActionImpact => {
                "Record the observed outcome of a previously logged action. The first recorded \
                 outcome is kept."
            }
            ToolName::GetPendingFollowups => {
                "Check for actions whose follow-up date has passed and whose actual impact has \
                 not been recorded. Use this proactively to remind users to check results."
            }
            ToolName::GetMemoryContext => {
                "Retrieve open investigations and recent actions, optionally for a specific \
                 machine or supplier, before answering questions about them."
            }
            _ => "Get the shift handoff summary: active investigations, today's actions and \
                  pending follow-ups.",
        }
    }

    fn parameters_schema(&self) -> serde_json::Value {
        match self.name {
            ToolName::SaveInvestigation => json!({
                "type": "object",
                "properties": {
                    "title": {
                        "type": "string",
                        "minLength": 1,
                        "description": "Brief investigation title (e.g., 'CNC-001 Surface Finish Degradation')"
                    },
                    "initial_observation": {
                        "type": "string",
                        "minLength": 1,
                        "description": "What triggered this investigation"
                    },
                    "machine_id": { "type": "string", "description": "Related machine ID if applicable" },
                    "supplier_id": { "type": "string", "description": "Related supplier ID if applicable" },
                    "hypotheses": {
                        "type": "array",
                        "items": { "type": "string" },
                        "description": "Candidate explanations to test"
                    }
                },
                "required": ["title", "initial_observation"],
                "additionalProperties": false
            }),
            ToolName::AddInvestigationFinding => json!({
                "type": "object",
                "properties": {
                    "investigation_id": { "type": "string", "description": "Investigation ID (INV-...)" },
                    "finding": { "type": "string", "minLength": 1, "description": "What was found" }
                },
                "required": ["investigation_id", "finding"],
                "additionalProperties": false
            }),
            ToolName::UpdateInvestigationStatus => json!({
                "type": "object",
                "properties": {
                    "investigation_id": { "type": "string", "description": "Investigation ID (INV-...)" },
                    "status": {
                        "type": "string",
                        "enum": ["in_progress", "resolved", "closed"],
                        "description": "New status"
                    }
                },
                "required": ["investigation_id", "status"],
                "additionalProperties": false
            }),
            ToolName::LogAction => json!({
                "type": "object",
                "properties": {
                    "description": {
                        "type": "string",
                        "minLength": 1,
                        "description": "What action was taken (e.g., 'Increased feed rate from 100 to 120 mm/min')"
                    },
                    "action_type": {
                        "type": "string",
                        "enum": ["parameter_change", "maintenance", "process_change"],
                        "description": "Category of the action"
                    },
                    "expected_impact": {
                        "type": "string",
                        "minLength": 1,
                        "description": "What improvement is expected (e.g., 'Reduce cycle time by 10%')"
                    },
                    "machine_id": { "type": "string", "description": "Related machine ID if applicable" },
                    "baseline_metrics": {
                        "type": "object",
                        "additionalProperties": { "type": "number" },
                        "description": "Metrics captured before the action (e.g., {\"oee\": 0.72})"
                    },
                    "follow_up_date": {
                        "type": "string",
                        "pattern": DATE_PATTERN,
                        "description": "When to check results (YYYY-MM-DD)"
                    }
                },
                "required": ["description", "action_type", "expected_impact"],
                "additionalProperties": false
            }),
            ToolName::RecordActionImpact => json!({
                "type": "object",
                "properties": {
                    "action_id": { "type": "string", "description": "Action ID (ACT-...)" },
                    "actual_impact": { "type": "string", "minLength": 1, "description": "Observed outcome" }
                },
                "required": ["action_id", "actual_impact"],
                "additionalProperties": false
            }),
            ToolName::GetMemoryContext => json!({
                "type": "object",
                "properties": {
                    "machine_id": { "type": "string", "description": "Filter by machine ID" },
                    "supplier_id": { "type": "string", "description": "Filter by supplier ID" },
                    "status": {
                        "type": "string",
                        "enum": ["open", "in_progress", "resolved", "closed"],
                        "description": "Filter investigations by status"
                    }
                },
                "additionalProperties": false
            }),
            ToolName::GetShiftSummary => json!({
                "type": "object",
                "properties": {
                    "date": {
                        "type": "string",
                        "pattern": DATE_PATTERN,
                        "description": "Shift date (YYYY-MM-DD); defaults to today"
                    }
                },
                "additionalProperties": false
            }),
            _ => json!({ "type": "object", "properties": {}, "additionalProperties": false }),
        }
    }

    async fn invoke(&self, input: serde_json::Value) -> Result<ToolOutput, MillwrightError> {
        let value = match self.name {
            ToolName::SaveInvestigation => {
                let args: NewInvestigation = parse_args(self.name, input)?;
                let inv = self.store.create_investigation(args).await?;
                json!({
                    "success": true,
                    "investigation_id": inv.id,
                    "title": inv.title,
                    "status": inv.status,
                    "message": format!("Investigation '{}' created with ID {}", inv.title, inv.id),
                })
            }
            ToolName::AddInvestigationFinding => {
                let args: FindingArgs = parse_args(self.name, input)?;
                let inv = self
                    .store
                    .append_finding(&args.investigation_id, &args.finding)
                    .await?;
                json!({
                    "success": true,
                    "investigation_id": inv.id,
                    "findings_count": inv.findings.len(),
                    "message": format!("Finding added to {}", inv.id),
                })
            }
            ToolName::UpdateInvestigationStatus => {
                let args: StatusArgs = parse_args(self.name, input)?;
                let inv = self
                    .store
                    .advance_status(&args.investigation_id, args.status)
                    .await?;
                json!({
                    "success": true,
                    "investigation_id": inv.id,
                    "status": inv.status,
                    "message": format!("Investigation {} is now {}", inv.id, inv.status),
                })
            }
            ToolName::LogAction => {
                let args: NewAction = parse_args(self.name, input)?;
                let action = self.store.log_action(args).await?;
                json!({
                    "success": true,
                    "action_id": action.id,
                    "description": action.description,
                    "action_type": action.action_type,
                    "follow_up_date": action.follow_up_date,
                    "message": format!("Action logged with ID {}", action.id),
                })
            }
            ToolName::RecordActionImpact => {
                let args: ImpactArgs = parse_args(self.name, input)?;
                let record = self
                    .store
                    .record_actual_impact(&args.action_id, &args.actual_impact)
                    .await?;
                let message = if record.recorded {
                    format!("Actual impact recorded for {}", record.action.id)
                } else {
                    format!(
                        "Actual impact for {} was already recorded and was kept",
                        record.action.id
                    )
                };
                json!({
                    "success": true,
                    "action_id": record.action.id,
                    "recorded": record.recorded,
                    "actual_impact": record.action.actual_impact,
                    "message": message,
                })
            }
            ToolName::GetPendingFollowups => {
                let pending = self.store.pending_followups(today()).await;
                let message = if pending.is_empty() {
                    "No pending follow-ups".to_string()
                } else {
                    format!("Found {} actions pending follow-up", pending.len())
                };
                json!({
                    "count": pending.len(),
                    "pending_followups": pending,
                    "message": message,
                })
            }
            ToolName::GetMemoryContext => {
                let filter: MemoryFilter = parse_args(self.name, input)?;
                to_value(&self.store.context(&filter).await)?
            }
            ToolName::GetShiftSummary => {
                let args: ShiftArgs = parse_args(self.name, input)?;
                let date = args.date.unwrap_or_else(today);
                to_value(&self.store.shift_summary(date).await)?
            }
            other => {
                return Err(MillwrightError::Lookup {
                    name: other.to_string(),
                });
            }
        };
        Ok(ToolOutput::json(&value))
    }
}
