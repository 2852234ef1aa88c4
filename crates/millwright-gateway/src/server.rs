// SPDX-FileCopyrightText: 2026 Millwright Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway HTTP server built on axum.
//!
//! Sets up routes, middleware, and shared state for the gateway.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    Router,
    body::Body,
    http::Request,
    routing::{get, post},
};
use millwright_agent::Orchestrator;
use millwright_config::model::GatewayConfig;
use millwright_core::MillwrightError;
use millwright_memory::MemoryStore;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info_span;

use crate::{handlers, sse};

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct GatewayState {
    pub orchestrator: Arc<Orchestrator>,
    /// Ledger behind the read-only memory endpoints.
    pub memory: Arc<MemoryStore>,
    /// Process start, for the uptime reported by `/health`.
    pub started: Instant,
}

impl GatewayState {
    pub fn new(orchestrator: Arc<Orchestrator>) -> Self {
        Self {
            memory: Arc::clone(orchestrator.memory()),
            orchestrator,
            started: Instant::now(),
        }
    }
}

/// Builds the application router.
///
/// - `GET /health`
/// - `POST /api/chat`, `POST /api/chat/stream`
/// - `GET /api/memory/{investigations,actions,shift-summary,summary}`
pub fn router(state: GatewayState) -> Router {
    let chat = Router::new()
        .route("/api/chat", post(handlers::post_chat))
        .route("/api/chat/stream", post(sse::post_chat_stream));

    let memory = Router::new()
        .route("/api/memory/investigations", get(handlers::get_investigations))
        .route("/api/memory/actions", get(handlers::get_actions))
        .route("/api/memory/shift-summary", get(handlers::get_shift_summary))
        .route("/api/memory/summary", get(handlers::get_memory_summary));

    Router::new()
        .route("/health", get(handlers::get_health))
        .merge(chat)
        .merge(memory)
        .with_state(state)
        .layer(
            TraceLayer::new_for_http().make_span_with(|req: &Request<Body>| {
                info_span!(
                    "http_request",
                    request_id = %uuid::Uuid::new_v4(),
                    method = %req.method(),
                    path = %req.uri().path(),
                )
            }),
        )
        .layer(CorsLayer::permissive())
}

/// Binds `host:port` and serves until `shutdown` resolves.
pub async fn start_server(
    config: &GatewayConfig,
    state: GatewayState,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<(), MillwrightError> {
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| MillwrightError::Gateway {
            message: format!("failed to bind gateway to {addr}: {e}"),
            source: Some(Box::new(e)),
        })?;

    tracing::info!(addr = %addr, "gateway listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| MillwrightError::Gateway {
            message: format!("gateway server error: {e}"),
            source: Some(Box::new(e)),
        })
}
