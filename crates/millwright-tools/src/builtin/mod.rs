// SPDX-FileCopyrightText: 2026 Millwright Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Factory tools: metric lookups and memory ledger operations.

pub mod analytics;
pub mod memory;

pub use analytics::{AnalyticsSource, HttpAnalytics, Metric, MetricsQuery, MetricsTool, Severity};
pub use memory::{MEMORY_TOOLS, MemoryTool};

use std::sync::Arc;

use millwright_core::MillwrightError;
use millwright_memory::MemoryStore;

use crate::ToolRegistry;

/// Registers every factory tool into the given registry.
pub fn register_factory_tools(
    registry: &mut ToolRegistry,
    memory: Arc<MemoryStore>,
    analytics: Arc<dyn AnalyticsSource>,
) -> Result<(), MillwrightError> {
    for metric in [Metric::Oee, Metric::Scrap, Metric::Quality, Metric::Downtime] {
        registry.register(Arc::new(MetricsTool::new(metric, Arc::clone(&analytics))))?;
    }
    for name in MEMORY_TOOLS {
        if let Some(tool) = MemoryTool::new(name, Arc::clone(&memory)) {
            registry.register(Arc::new(tool))?;
        }
    }
    Ok(())
}
