// SPDX-FileCopyrightText: 2026 Millwright Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! JSON request handlers: non-streaming chat, memory reads and health.

use std::str::FromStr;

use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::NaiveDate;
use millwright_core::{ChatRequest, ChatResponse, MillwrightError};
use millwright_memory::{
    Action, Investigation, InvestigationStatus, MemoryFilter, MemoryStats, ShiftSummary, today,
};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::server::GatewayState;

/// Error response body.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// A [`MillwrightError`] rendered as an HTTP response.
#[derive(Debug)]
pub struct ApiError(pub MillwrightError);

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            MillwrightError::Validation(_) => StatusCode::BAD_REQUEST,
            MillwrightError::NotFound { .. } => StatusCode::NOT_FOUND,
            MillwrightError::Provider { .. } => StatusCode::BAD_GATEWAY,
            MillwrightError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<MillwrightError> for ApiError {
    fn from(err: MillwrightError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            warn!(status = status.as_u16(), error = %self.0, "request failed");
        }
        (
            status,
            Json(ErrorResponse {
                error: self.0.to_string(),
            }),
        )
            .into_response()
    }
}

/// Response body for `GET /health`.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
}

/// GET /health
pub async fn get_health(State(state): State<GatewayState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.started.elapsed().as_secs(),
    })
}

/// POST /api/chat
///
/// Drains the whole turn loop and returns the answer with the extended history.
pub async fn post_chat(
    State(state): State<GatewayState>,
    Json(body): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    Ok(Json(state.orchestrator.respond(body).await?))
}

/// Query for `GET /api/memory/investigations`.
#[derive(Debug, Default, Deserialize)]
pub struct InvestigationQuery {
    pub machine_id: Option<String>,
    pub supplier_id: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct InvestigationList {
    pub investigations: Vec<Investigation>,
    pub total: usize,
}

/// GET /api/memory/investigations
pub async fn get_investigations(
    State(state): State<GatewayState>,
    Query(query): Query<InvestigationQuery>,
) -> Result<Json<InvestigationList>, ApiError> {
    let status = query
        .status
        .as_deref()
        .map(|s| {
            InvestigationStatus::from_str(s).map_err(|_| {
                MillwrightError::Validation(format!(
                    "unknown status `{s}` (expected open, in_progress, resolved or closed)"
                ))
            })
        })
        .transpose()?;

    let filter = MemoryFilter {
        machine_id: query.machine_id,
        supplier_id: query.supplier_id,
        status,
    };
    let investigations = state.memory.list_investigations(&filter).await;
    Ok(Json(InvestigationList {
        total: investigations.len(),
        investigations,
    }))
}

#[derive(Debug, Default, Deserialize)]
pub struct ActionQuery {
    pub machine_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ActionList {
    pub actions: Vec<Action>,
    pub total: usize,
}

/// GET /api/memory/actions
pub async fn get_actions(
    State(state): State<GatewayState>,
    Query(query): Query<ActionQuery>,
) -> Json<ActionList> {
    let actions = state.memory.list_actions(query.machine_id.as_deref()).await;
    Json(ActionList {
        total: actions.len(),
        actions,
    })
}

#[derive(Debug, Default, Deserialize)]
pub struct DateQuery {
    pub date: Option<String>,
}

/// GET /api/memory/shift-summary
///
/// `date` defaults to today.
pub async fn get_shift_summary(
    State(state): State<GatewayState>,
    Query(query): Query<DateQuery>,
) -> Result<Json<ShiftSummary>, ApiError> {
    let date = match query.date.as_deref() {
        Some(raw) => NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| {
            MillwrightError::Validation(format!("invalid date `{raw}`, expected YYYY-MM-DD"))
        })?,
        None => today(),
    };
    Ok(Json(state.memory.shift_summary(date).await))
}

/// GET /api/memory/summary
pub async fn get_memory_summary(State(state): State<GatewayState>) -> Json<MemoryStats> {
    Json(state.memory.stats(today()).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn error_status_mapping() {
        let status = |e| ApiError(e).status();
        assert_eq!(status(MillwrightError::Validation("x".into())), StatusCode::BAD_REQUEST);
        assert_eq!(
            status(MillwrightError::Provider {
                message: "x".into(),
                source: None
            }),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            status(MillwrightError::Timeout {
                duration: Duration::from_secs(30)
            }),
            StatusCode::GATEWAY_TIMEOUT
        );
        assert_eq!(
            status(MillwrightError::Internal("x".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
