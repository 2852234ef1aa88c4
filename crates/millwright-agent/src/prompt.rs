// SPDX-FileCopyrightText: 2026 Millwright Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! System preamble assembly.
//!
//! The preamble describes the plant, the data window and the metrics on
//! offer, then carries a MEMORY CONTEXT block derived from today's shift
//! summary so the model can pick up open work across conversations.

use chrono::NaiveDate;
use millwright_config::model::FactoryConfig;
use millwright_memory::ShiftSummary;

const ANSWER_RULES: &str = "When answering:
1. Use tools to get accurate data
2. Provide specific numbers and percentages
3. Explain trends and patterns
4. Compare metrics when relevant
5. Be concise but thorough
6. Reference relevant open investigations when discussing related machines/suppliers
7. Proactively mention pending follow-ups when relevant";

const MEMORY_HINTS: &str = "Memory capabilities:
- Use save_investigation to track ongoing issues that need follow-up
- Use log_action when users make changes (parameter adjustments, maintenance, etc.)
- Use get_pending_followups to check for actions needing follow-up
- Use get_memory_context to retrieve relevant context for a machine or supplier";

/// Builds the full system preamble.
pub fn build_system_prompt(factory: &FactoryConfig, summary: &ShiftSummary, today: NaiveDate) -> String {
    let coverage = match factory.data_range() {
        Some((start, end)) => format!("You have access to production data ({start} to {end}) covering:"),
        None => "You have access to production data covering:".to_string(),
    };

    let mut sections = vec![
        format!("You are a factory operations assistant for {}.", factory.name),
        format!(
            "{coverage}\n- {} machines: {}\n- {} shifts: {}\n- Metrics: OEE, scrap, quality issues, downtime",
            factory.machines.len(),
            factory.machines.join(", "),
            factory.shifts.len(),
            join_with_and(&factory.shifts),
        ),
    ];
    if let Some(memory) = memory_context(summary) {
        sections.push(memory);
    }
    sections.push(ANSWER_RULES.to_string());
    sections.push(MEMORY_HINTS.to_string());
    sections.push(format!(
        "Today's date is {today}. When users ask about \"today\", \"this week\", or relative dates, \
         calculate the appropriate date range based on the data available."
    ));

    sections.join("\n\n")
}

/// The MEMORY CONTEXT block, or `None` when there is nothing to report.
pub fn memory_context(summary: &ShiftSummary) -> Option<String> {
    let mut parts = Vec::new();

    if !summary.active_investigations.is_empty() {
        let mut lines = vec!["**Active Investigations:**".to_string()];
        lines.extend(summary.active_investigations.iter().map(|inv| {
            let machine = inv
                .machine_id
                .as_deref()
                .map(|m| format!(" ({m})"))
                .unwrap_or_default();
            format!("- {}{machine} - {} findings", inv.title, inv.findings.len())
        }));
        parts.push(lines.join("\n"));
    }

    if !summary.pending_followups.is_empty() {
        let mut lines = vec!["**Pending Follow-ups:**".to_string()];
        lines.extend(summary.pending_followups.iter().map(|action| {
            let due = action
                .follow_up_date
                .map(|d| d.to_string())
                .unwrap_or_default();
            format!(
                "- {} (expected: {}, due: {due})",
                action.description, action.expected_impact
            )
        }));
        parts.push(lines.join("\n"));
    }

    if summary.counts.todays_actions > 0 {
        parts.push(format!(
            "**Today's Activity:** {} actions logged",
            summary.counts.todays_actions
        ));
    }

    if parts.is_empty() {
        None
    } else {
        Some(format!("**MEMORY CONTEXT:**\n{}", parts.join("\n\n")))
    }
}

fn join_with_and(items: &[String]) -> String {
    match items {
        [] => String::new(),
        [only] => only.clone(),
        [rest @ .., last] => format!("{} and {last}", rest.join(", ")),
    }
}
