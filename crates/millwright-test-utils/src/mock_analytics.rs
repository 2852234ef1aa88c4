// SPDX-FileCopyrightText: 2026 Millwright Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-process stand-in for the metrics service.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use serde_json::{Value, json};
use tokio::sync::Mutex;

use millwright_core::MillwrightError;
use millwright_tools::builtin::{AnalyticsSource, Metric, MetricsQuery};

/// Canned analytics answers with call recording and injectable failures.
#[derive(Clone)]
pub struct MockAnalytics {
    overrides: Arc<HashMap<String, Value>>,
    failures_left: Arc<AtomicUsize>,
    calls: Arc<Mutex<Vec<(Metric, MetricsQuery)>>>,
}

impl Default for MockAnalytics {
    fn default() -> Self {
        Self::new()
    }
}

impl MockAnalytics {
    pub fn new() -> Self {
        Self {
            overrides: Arc::new(HashMap::new()),
            failures_left: Arc::new(AtomicUsize::new(0)),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Replaces the canned payload for one metric.
    pub fn with_response(mut self, metric: Metric, payload: Value) -> Self {
        Arc::make_mut(&mut self.overrides).insert(metric.to_string(), payload);
        self
    }

    /// The next `count` fetches fail with a tool execution error.
    pub fn failing(self, count: usize) -> Self {
        self.failures_left.store(count, Ordering::SeqCst);
        self
    }

    /// Every fetch attempted so far, including failed ones.
    pub async fn calls(&self) -> Vec<(Metric, MetricsQuery)> {
        self.calls.lock().await.clone()
    }

    fn take_failure(&self) -> bool {
        self.failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

/// Plausible numbers for a one-month window on the demo plant.
pub fn sample_payload(metric: Metric) -> Value {
    match metric {
        Metric::Oee => json!({
            "oee": 0.724,
            "availability": 0.881,
            "performance": 0.95,
            "quality": 0.865,
            "total_parts": 48210,
            "good_parts": 41702,
            "scrap_parts": 6508
        }),
        Metric::Scrap => json!({
            "total_scrap": 6508,
            "scrap_rate": 0.135,
            "scrap_cost": 32540.0,
            "scrap_by_machine": { "CNC-001": 2210, "Assembly-001": 1804 }
        }),
        Metric::Quality => json!({
            "total_issues": 37,
            "issues": [
                { "type": "dimensional", "severity": "High", "machine": "CNC-001", "count": 12 }
            ]
        }),
        Metric::Downtime => json!({
            "total_downtime_hours": 41.5,
            "downtime_by_reason": { "tool_wear": 18.0, "changeover": 14.5, "material_shortage": 9.0 }
        }),
    }
}

#[async_trait]
impl AnalyticsSource for MockAnalytics {
    async fn fetch(&self, metric: Metric, query: &MetricsQuery) -> Result<Value, MillwrightError> {
        self.calls.lock().await.push((metric, query.clone()));
        if self.take_failure() {
            return Err(MillwrightError::tool(
                metric.tool_name().to_string(),
                "analytics service unavailable",
            ));
        }
        Ok(self
            .overrides
            .get(&metric.to_string())
            .cloned()
            .unwrap_or_else(|| sample_payload(metric)))
    }
}
