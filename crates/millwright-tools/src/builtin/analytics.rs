// SPDX-FileCopyrightText: 2026 Millwright Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Read-only analytics tools backed by the factory metrics service.
//!
//! The metric arithmetic lives in an external service; these tools only
//! validate the date range and forward the query through an
//! [`AnalyticsSource`].

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use millwright_core::MillwrightError;
use serde::Deserialize;
use strum::Display;
use tracing::{debug, warn};

use crate::tool::{Tool, ToolName, ToolOutput, parse_args};

/// The four metric families the analytics service exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum Metric {
    Oee,
    Scrap,
    Quality,
    Downtime,
}

impl Metric {
    pub fn tool_name(&self) -> ToolName {
        match self {
            Metric::Oee => ToolName::GetOeeMetrics,
            Metric::Scrap => ToolName::GetScrapMetrics,
            Metric::Quality => ToolName::GetQualityIssues,
            Metric::Downtime => ToolName::GetDowntimeAnalysis,
        }
    }
}

/// Defect severity filter for quality queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Deserialize)]
pub enum Severity {
    Low,
    Medium,
    High,
}

/// A validated analytics query.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricsQuery {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub machine_name: Option<String>,
    pub severity: Option<Severity>,
}

/// External collaborator computing metrics over production records.
#[async_trait]
pub trait AnalyticsSource: Send + Sync {
    async fn fetch(
        &self,
        metric: Metric,
        query: &MetricsQuery,
    ) -> Result<serde_json::Value, MillwrightError>;
}

/// [`AnalyticsSource`] that calls the metrics HTTP API
/// (`GET {base_url}/api/metrics/{metric}`).
pub struct HttpAnalytics {
    client: reqwest::Client,
    base_url: String,
}

impl HttpAnalytics {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, MillwrightError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| MillwrightError::Config(format!("failed to build analytics client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl AnalyticsSource for HttpAnalytics {
    async fn fetch(
        &self,
        metric: Metric,
        query: &MetricsQuery,
    ) -> Result<serde_json::Value, MillwrightError> {
        let tool = metric.tool_name();
        let url = format!("{}/api/metrics/{metric}", self.base_url);

        let mut params = vec![
            ("start_date", query.start_date.to_string()),
            ("end_date", query.end_date.to_string()),
        ];
        if let Some(machine) = &query.machine_name {
            params.push(("machine", machine.clone()));
        }
        if let Some(severity) = query.severity {
            params.push(("severity", severity.to_string()));
        }

        debug!(url = %url, "querying analytics service");
        let response = self
            .client
            .get(&url)
            .query(&params)
            .send()
            .await
            .map_err(|e| MillwrightError::tool(tool.to_string(), format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = %status, %tool, "analytics service returned an error status");
            return Err(MillwrightError::tool(
                tool.to_string(),
                format!("analytics service returned {status}: {body}"),
            ));
        }

        let value: serde_json::Value = response.json().await.map_err(|e| {
            MillwrightError::tool(tool.to_string(), format!("invalid response body: {e}"))
        })?;

        // The service reports data problems as 200 with an `error` key.
        if let Some(message) = value.get("error").and_then(|e| e.as_str()) {
            return Err(MillwrightError::tool(tool.to_string(), message));
        }
        Ok(value)
    }
}

#[derive(Debug, Deserialize)]
struct MetricsArgs {
    start_date: String,
    end_date: String,
    #[serde(default)]
    machine_name: Option<String>,
    #[serde(default)]
    severity: Option<Severity>,
}

fn parse_date(field: &str, value: &str) -> Result<NaiveDate, MillwrightError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| {
        MillwrightError::Validation(format!("{field} must be a YYYY-MM-DD date, got {value:?}"))
    })
}

impl MetricsArgs {
    fn into_query(self) -> Result<MetricsQuery, MillwrightError> {
        let start_date = parse_date("start_date", &self.start_date)?;
        let end_date = parse_date("end_date", &self.end_date)?;
        if start_date > end_date {
            return Err(MillwrightError::Validation(format!(
                "start_date {start_date} is after end_date {end_date}"
            )));
        }
        Ok(MetricsQuery {
            start_date,
            end_date,
            machine_name: self.machine_name.filter(|m| !m.trim().is_empty()),
            severity: self.severity,
        })
    }
}

/// One analytics tool per [`Metric`].
pub struct MetricsTool {
    metric: Metric,
    source: Arc<dyn AnalyticsSource>,
}

impl MetricsTool {
    pub fn new(metric: Metric, source: Arc<dyn AnalyticsSource>) -> Self {
        Self { metric, source }
    }
}

#[async_trait]
impl Tool for MetricsTool {
    fn name(&self) -> ToolName {
        self.metric.tool_name()
    }

    fn description(&self) -> &str {
        match self.metric {
            Metric::Oee => {
                "Calculate Overall Equipment Effectiveness (OEE) for a date range. \
                 Returns OEE percentage with availability, performance and quality breakdown."
            }
            Metric::Scrap => {
                "Get scrap production metrics including total scrap, scrap rate, \
                 and breakdown by machine."
            }
            Metric::Quality => {
                "Get quality defect events with details about defect types, severity, \
                 and affected parts."
            }
            Metric::Downtime => {
                "Analyze downtime events including reasons, duration, and major incidents."
            }
        }
    }

    fn parameters_schema(&self) -> serde_json::Value {
        let mut schema = serde_json::json!({
            "type": "object",
            "properties": {
                "start_date": {
                    "type": "string",
                    "pattern": "^\\d{4}-\\d{2}-\\d{2}$",
                    "description": "Start date (YYYY-MM-DD)"
                },
                "end_date": {
                    "type": "string",
                    "pattern": "^\\d{4}-\\d{2}-\\d{2}$",
                    "description": "End date (YYYY-MM-DD)"
                },
                "machine_name": {
                    "type": "string",
                    "description": "Optional machine name filter"
                }
            },
            "required": ["start_date", "end_date"],
            "additionalProperties": false
        });
        if self.metric == Metric::Quality {
            schema["properties"]["severity"] = serde_json::json!({
                "type": "string",
                "enum": ["Low", "Medium", "High"],
                "description": "Optional severity filter"
            });
        }
        schema
    }

    async fn invoke(&self, input: serde_json::Value) -> Result<ToolOutput, MillwrightError> {
        let query = parse_args::<MetricsArgs>(self.name(), input)?.into_query()?;
        let value = self.source.fetch(self.metric, &query).await?;
        Ok(ToolOutput::json(&value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn query() -> MetricsQuery {
        MetricsQuery {
            start_date: NaiveDate::from_ymd_opt(2024, 12, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2024, 12, 7).unwrap(),
            machine_name: Some("CNC-001".into()),
            severity: None,
        }
    }

    fn client(server: &MockServer) -> HttpAnalytics {
        HttpAnalytics::new(&server.uri(), Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn http_source_forwards_query_parameters() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/metrics/oee"))
            .and(query_param("start_date", "2024-12-01"))
            .and(query_param("end_date", "2024-12-07"))
            .and(query_param("machine", "CNC-001"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "oee": 0.72 })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let value = client(&server).fetch(Metric::Oee, &query()).await.unwrap();
        assert_eq!(value["oee"], 0.72);
    }

    #[tokio::test]
    async fn http_source_sends_severity_for_quality() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/metrics/quality"))
            .and(query_param("severity", "High"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "total_issues": 3
            })))
            .mount(&server)
            .await;

        let mut q = query();
        q.severity = Some(Severity::High);
        let value = client(&server).fetch(Metric::Quality, &q).await.unwrap();
        assert_eq!(value["total_issues"], 3);
    }

    #[tokio::test]
    async fn http_source_error_key_is_tool_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/metrics/scrap"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "error": "No data available for date range"
            })))
            .mount(&server)
            .await;

        let err = client(&server)
            .fetch(Metric::Scrap, &query())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            MillwrightError::ToolExecution { ref tool, ref message }
                if tool == "get_scrap_metrics" && message.contains("No data")
        ));
    }

    #[tokio::test]
    async fn http_source_server_error_is_retryable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let err = client(&server)
            .fetch(Metric::Downtime, &query())
            .await
            .unwrap_err();
        assert!(err.is_retryable());
    }

    struct Fixed;

    #[async_trait]
    impl AnalyticsSource for Fixed {
        async fn fetch(
            &self,
            metric: Metric,
            query: &MetricsQuery,
        ) -> Result<serde_json::Value, MillwrightError> {
            Ok(serde_json::json!({
                "metric": metric.to_string(),
                "machine": query.machine_name,
            }))
        }
    }

    #[tokio::test]
    async fn tool_rejects_reversed_range() {
        let tool = MetricsTool::new(Metric::Oee, Arc::new(Fixed));
        let err = tool
            .invoke(serde_json::json!({
                "start_date": "2024-12-07",
                "end_date": "2024-12-01"
            }))
            .await
            .unwrap_err();
        assert!(matches!(err, MillwrightError::Validation(_)));
    }

    #[tokio::test]
    async fn tool_rejects_impossible_date() {
        let tool = MetricsTool::new(Metric::Scrap, Arc::new(Fixed));
        let err = tool
            .invoke(serde_json::json!({
                "start_date": "2024-02-30",
                "end_date": "2024-03-01"
            }))
            .await
            .unwrap_err();
        assert!(matches!(err, MillwrightError::Validation(ref m) if m.contains("start_date")));
    }

    #[tokio::test]
    async fn tool_returns_source_payload() {
        let tool = MetricsTool::new(Metric::Downtime, Arc::new(Fixed));
        let out = tool
            .invoke(serde_json::json!({
                "start_date": "2024-12-01",
                "end_date": "2024-12-01",
                "machine_name": "Packaging-001"
            }))
            .await
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&out.content).unwrap();
        assert_eq!(value["metric"], "downtime");
        assert_eq!(value["machine"], "Packaging-001");
    }

    #[test]
    fn only_quality_schema_has_severity() {
        let quality = MetricsTool::new(Metric::Quality, Arc::new(Fixed)).parameters_schema();
        let oee = MetricsTool::new(Metric::Oee, Arc::new(Fixed)).parameters_schema();
        assert!(quality["properties"]["severity"].is_object());
        assert!(oee["properties"].get("severity").is_none());
    }
}
