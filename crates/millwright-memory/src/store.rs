// SPDX-FileCopyrightText: 2026 Millwright Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Investigation and action ledger persisted as a single JSON document.
//!
//! Every mutation runs under one lock: the current document is cloned, the
//! change is applied to the clone, the clone is persisted, and only then does
//! it replace the in-memory copy. A failed write leaves the ledger unchanged.

use std::sync::Arc;

use chrono::{Local, NaiveDate, NaiveDateTime};
use millwright_core::MillwrightError;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::document::{DocumentStore, InMemoryDocumentStore};
use crate::types::{
    Action, ImpactRecord, Investigation, InvestigationStatus, MemoryContext, MemoryDocument,
    MemoryFilter, MemoryStats, NewAction, NewInvestigation, ShiftCounts, ShiftSummary,
};

/// Key under which the ledger document is stored.
pub const MEMORY_DOCUMENT_KEY: &str = "memory.json";

fn now() -> NaiveDateTime {
    Local::now().naive_local()
}

/// Today's date on the local clock.
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

fn generate_id(prefix: &str, at: NaiveDateTime) -> String {
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!("{prefix}-{}-{}", at.format("%Y%m%d-%H%M%S"), &suffix[..4])
}

fn require_text(field: &str, value: &str) -> Result<(), MillwrightError> {
    if value.trim().is_empty() {
        return Err(MillwrightError::Validation(format!(
            "{field} must not be empty"
        )));
    }
    Ok(())
}

fn investigation_mut<'a>(
    doc: &'a mut MemoryDocument,
    id: &str,
) -> Result<&'a mut Investigation, MillwrightError> {
    doc.investigations
        .iter_mut()
        .find(|i| i.id == id)
        .ok_or_else(|| MillwrightError::NotFound {
            kind: "investigation",
            id: id.to_string(),
        })
}

/// The memory ledger shared by tools and read endpoints.
pub struct MemoryStore {
    backend: Arc<dyn DocumentStore>,
    doc: Mutex<MemoryDocument>,
}

impl MemoryStore {
    /// Opens the ledger, loading the existing document if one has been saved.
    pub async fn open(backend: Arc<dyn DocumentStore>) -> Result<Self, MillwrightError> {
        let doc = match backend.get(MEMORY_DOCUMENT_KEY).await? {
            Some(bytes) => {
                serde_json::from_slice::<MemoryDocument>(&bytes).map_err(|e| {
                    MillwrightError::Storage {
                        source: Box::new(e),
                    }
                })?
            }
            None => {
                info!(location = %backend.describe(), "no memory document found, starting fresh");
                MemoryDocument::empty(now())
            }
        };

        info!(
            location = %backend.describe(),
            investigations = doc.investigations.len(),
            actions = doc.actions.len(),
            "memory store loaded"
        );

        Ok(Self {
            backend,
            doc: Mutex::new(doc),
        })
    }

    /// An empty ledger backed by process memory.
    pub fn in_memory() -> Self {
        Self {
            backend: Arc::new(InMemoryDocumentStore::new()),
            doc: Mutex::new(MemoryDocument::empty(now())),
        }
    }

    /// Applies `change` to a draft of the document and commits it once persisted.
    async fn mutate<T>(
        &self,
        change: impl FnOnce(&mut MemoryDocument, NaiveDateTime) -> Result<T, MillwrightError>,
    ) -> Result<T, MillwrightError> {
        let mut guard = self.doc.lock().await;
        let mut draft = guard.clone();
        let at = now();
        let out = change(&mut draft, at)?;
        draft.last_updated = at;

        let bytes = serde_json::to_vec_pretty(&draft).map_err(|e| MillwrightError::Storage {
            source: Box::new(e),
        })?;
        self.backend.put(MEMORY_DOCUMENT_KEY, bytes).await?;

        debug!(
            investigations = draft.investigations.len(),
            actions = draft.actions.len(),
            "memory document saved"
        );
        *guard = draft;
        Ok(out)
    }

    /// Opens a new investigation in `open` status.
    pub async fn create_investigation(
        &self,
        input: NewInvestigation,
    ) -> Result<Investigation, MillwrightError> {
        require_text("title", &input.title)?;
        require_text("initial_observation", &input.initial_observation)?;

        let investigation = self
            .mutate(|doc, at| {
                let investigation = Investigation {
                    id: generate_id("INV", at),
                    title: input.title,
                    machine_id: input.machine_id,
                    supplier_id: input.supplier_id,
                    status: InvestigationStatus::Open,
                    initial_observation: input.initial_observation,
                    findings: Vec::new(),
                    hypotheses: input.hypotheses,
                    created_at: at,
                    updated_at: at,
                };
                doc.investigations.push(investigation.clone());
                Ok(investigation)
            })
            .await?;

        info!(investigation_id = %investigation.id, title = %investigation.title, "investigation created");
        Ok(investigation)
    }

    /// Appends a finding. Rejected once the investigation is resolved or closed.
    pub async fn append_finding(
        &self,
        id: &str,
        finding: &str,
    ) -> Result<Investigation, MillwrightError> {
        require_text("finding", finding)?;

        let investigation = self
            .mutate(|doc, at| {
                let inv = investigation_mut(doc, id)?;
                if inv.status.is_terminal() {
                    return Err(MillwrightError::FrozenInvestigation {
                        id: inv.id.clone(),
                        status: inv.status.to_string(),
                    });
                }
                inv.findings.push(finding.trim().to_string());
                inv.updated_at = at;
                Ok(inv.clone())
            })
            .await?;

        info!(investigation_id = %id, findings = investigation.findings.len(), "finding appended");
        Ok(investigation)
    }

    /// Moves an investigation along its lifecycle.
    pub async fn advance_status(
        &self,
        id: &str,
        next: InvestigationStatus,
    ) -> Result<Investigation, MillwrightError> {
        let investigation = self
            .mutate(|doc, at| {
                let inv = investigation_mut(doc, id)?;
                if !inv.status.can_transition_to(next) {
                    return Err(MillwrightError::StateTransition {
                        from: inv.status.to_string(),
                        to: next.to_string(),
                    });
                }
                inv.status = next;
                inv.updated_at = at;
                Ok(inv.clone())
            })
            .await?;

        info!(investigation_id = %id, status = %next, "investigation status advanced");
        Ok(investigation)
    }

    /// Looks up one investigation.
    pub async fn investigation(&self, id: &str) -> Option<Investigation> {
        self.doc
            .lock()
            .await
            .investigations
            .iter()
            .find(|i| i.id == id)
            .cloned()
    }

    /// Investigations matching `filter`, in creation order.
    pub async fn list_investigations(&self, filter: &MemoryFilter) -> Vec<Investigation> {
        self.doc
            .lock()
            .await
            .investigations
            .iter()
            .filter(|i| filter.matches_investigation(i))
            .cloned()
            .collect()
    }

    /// Records a new action.
    pub async fn log_action(&self, input: NewAction) -> Result<Action, MillwrightError> {
        require_text("description", &input.description)?;
        require_text("action_type", &input.action_type)?;
        require_text("expected_impact", &input.expected_impact)?;

        let action = self
            .mutate(|doc, at| {
                let action = Action {
                    id: generate_id("ACT", at),
                    description: input.description,
                    action_type: input.action_type,
                    machine_id: input.machine_id,
                    baseline_metrics: input.baseline_metrics,
                    expected_impact: input.expected_impact,
                    actual_impact: None,
                    follow_up_date: input.follow_up_date,
                    created_at: at,
                };
                doc.actions.push(action.clone());
                Ok(action)
            })
            .await?;

        info!(action_id = %action.id, action_type = %action.action_type, "action logged");
        Ok(action)
    }

    /// Fills in the observed outcome of an action.
    ///
    /// The first value wins: a second call leaves the stored outcome in place
    /// and reports `recorded: false`.
    pub async fn record_actual_impact(
        &self,
        id: &str,
        impact: &str,
    ) -> Result<ImpactRecord, MillwrightError> {
        require_text("actual_impact", impact)?;

        {
            let doc = self.doc.lock().await;
            let action = doc.actions.iter().find(|a| a.id == id).ok_or_else(|| {
                MillwrightError::NotFound {
                    kind: "action",
                    id: id.to_string(),
                }
            })?;
            if action.actual_impact.is_some() {
                debug!(action_id = %id, "actual impact already recorded, keeping original");
                return Ok(ImpactRecord {
                    action: action.clone(),
                    recorded: false,
                });
            }
        }

        let record = self
            .mutate(|doc, _| {
                let action = doc
                    .actions
                    .iter_mut()
                    .find(|a| a.id == id)
                    .ok_or_else(|| MillwrightError::NotFound {
                        kind: "action",
                        id: id.to_string(),
                    })?;
                // Re-checked under the mutation lock in case a concurrent writer won.
                let recorded = action.actual_impact.is_none();
                if recorded {
                    action.actual_impact = Some(impact.trim().to_string());
                }
                Ok(ImpactRecord {
                    action: action.clone(),
                    recorded,
                })
            })
            .await?;

        info!(action_id = %id, recorded = record.recorded, "actual impact recorded");
        Ok(record)
    }

    /// Actions, optionally restricted to one machine.
    pub async fn list_actions(&self, machine_id: Option<&str>) -> Vec<Action> {
        self.doc
            .lock()
            .await
            .actions
            .iter()
            .filter(|a| machine_id.is_none_or(|m| a.machine_id.as_deref() == Some(m)))
            .cloned()
            .collect()
    }

    /// Actions whose follow-up is due on or before `date` with no recorded outcome.
    pub async fn pending_followups(&self, date: NaiveDate) -> Vec<Action> {
        self.doc
            .lock()
            .await
            .actions
            .iter()
            .filter(|a| a.is_pending_on(date))
            .cloned()
            .collect()
    }

    /// Filtered investigations and actions for the model's context.
    pub async fn context(&self, filter: &MemoryFilter) -> MemoryContext {
        let doc = self.doc.lock().await;
        let investigations: Vec<Investigation> = doc
            .investigations
            .iter()
            .filter(|i| filter.matches_investigation(i))
            .cloned()
            .collect();
        let actions: Vec<Action> = doc
            .actions
            .iter()
            .filter(|a| filter.matches_action(a))
            .cloned()
            .collect();

        MemoryContext {
            total_investigations: investigations.len(),
            total_actions: actions.len(),
            investigations,
            actions,
        }
    }

    /// Shift handoff view for `date`.
    pub async fn shift_summary(&self, date: NaiveDate) -> ShiftSummary {
        let doc = self.doc.lock().await;

        let active_investigations: Vec<Investigation> = doc
            .investigations
            .iter()
            .filter(|i| i.status.is_active())
            .cloned()
            .collect();
        let todays_actions: Vec<Action> = doc
            .actions
            .iter()
            .filter(|a| a.created_at.date() == date)
            .cloned()
            .collect();
        let pending_followups: Vec<Action> = doc
            .actions
            .iter()
            .filter(|a| a.is_pending_on(date))
            .cloned()
            .collect();

        let counts = ShiftCounts {
            active_investigations: active_investigations.len(),
            todays_actions: todays_actions.len(),
            pending_followups: pending_followups.len(),
        };

        debug!(
            %date,
            active = counts.active_investigations,
            actions = counts.todays_actions,
            pending = counts.pending_followups,
            "shift summary computed"
        );

        ShiftSummary {
            date,
            active_investigations,
            todays_actions,
            pending_followups,
            counts,
        }
    }

    /// Ledger-wide totals, with pending follow-ups evaluated for `date`.
    pub async fn stats(&self, date: NaiveDate) -> MemoryStats {
        let doc = self.doc.lock().await;
        let count = |status: InvestigationStatus| {
            doc.investigations
                .iter()
                .filter(|i| i.status == status)
                .count()
        };

        MemoryStats {
            total_investigations: doc.investigations.len(),
            total_actions: doc.actions.len(),
            open_investigations: count(InvestigationStatus::Open),
            in_progress_investigations: count(InvestigationStatus::InProgress),
            resolved_investigations: count(InvestigationStatus::Resolved),
            closed_investigations: count(InvestigationStatus::Closed),
            pending_followups: doc.actions.iter().filter(|a| a.is_pending_on(date)).count(),
            last_updated: doc.last_updated,
        }
    }
}
