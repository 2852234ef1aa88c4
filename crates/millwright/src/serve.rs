// SPDX-FileCopyrightText: 2026 Millwright Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `millwright serve` command implementation.
//!
//! Opens the memory ledger, connects the analytics service and the model
//! provider, registers the factory tools and serves the gateway until a
//! shutdown signal arrives.

use std::sync::Arc;
use std::time::Duration;

use millwright_agent::{Orchestrator, TurnLimits};
use millwright_config::model::{MemoryConfig, MillwrightConfig};
use millwright_core::{MillwrightError, ModelProvider};
use millwright_gateway::{GatewayState, start_server};
use millwright_memory::{FileDocumentStore, MemoryStore};
use millwright_openai::OpenAiProvider;
use millwright_tools::{AnalyticsSource, HttpAnalytics, ToolRegistry, register_factory_tools};
use tracing::info;

use crate::shutdown;

/// Runs the `millwright serve` command.
pub async fn run_serve(config: MillwrightConfig) -> Result<(), MillwrightError> {
    init_tracing(&config.agent.log_level);

    info!(name = %config.agent.name, factory = %config.factory.name, "starting millwright serve");

    let memory = Arc::new(open_memory(&config.memory).await?);
    let analytics: Arc<dyn AnalyticsSource> = Arc::new(HttpAnalytics::new(
        &config.analytics.base_url,
        Duration::from_secs(config.analytics.timeout_secs),
    )?);
    let provider: Arc<dyn ModelProvider> = Arc::new(OpenAiProvider::new(&config.provider)?);
    let state = build_state(&config, provider, analytics, memory)?;

    let cancel = shutdown::install_signal_handler();
    start_server(&config.gateway, state, async move {
        cancel.cancelled().await;
    })
    .await?;

    info!("millwright serve shutdown complete");
    Ok(())
}

/// Opens the ledger in `data_dir`, or an in-memory one when none is set.
async fn open_memory(config: &MemoryConfig) -> Result<MemoryStore, MillwrightError> {
    match &config.data_dir {
        Some(dir) => MemoryStore::open(Arc::new(FileDocumentStore::new(dir))).await,
        None => {
            info!("memory.data_dir not set, investigations and actions will not persist");
            Ok(MemoryStore::in_memory())
        }
    }
}

/// Wires the tool registry and orchestrator around the given collaborators.
fn build_state(
    config: &MillwrightConfig,
    provider: Arc<dyn ModelProvider>,
    analytics: Arc<dyn AnalyticsSource>,
    memory: Arc<MemoryStore>,
) -> Result<GatewayState, MillwrightError> {
    let mut registry = ToolRegistry::new();
    register_factory_tools(&mut registry, Arc::clone(&memory), analytics)?;
    info!(tools = registry.len(), "tool registry initialized");

    let orchestrator = Orchestrator::new(
        provider,
        Arc::new(registry),
        memory,
        config.factory.clone(),
        TurnLimits::from(&config.agent),
    );
    Ok(GatewayState::new(Arc::new(orchestrator)))
}

/// Initializes the tracing subscriber with the given log level.
///
/// `RUST_LOG` takes precedence when set.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("millwright={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
