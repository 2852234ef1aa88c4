// SPDX-FileCopyrightText: 2026 Millwright Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for Millwright.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use std::path::PathBuf;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Top-level Millwright configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MillwrightConfig {
    /// Assistant identity and turn-loop limits.
    #[serde(default)]
    pub agent: AgentConfig,

    /// LLM provider settings.
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Factory description used in the system prompt.
    #[serde(default)]
    pub factory: FactoryConfig,

    /// Memory ledger persistence.
    #[serde(default)]
    pub memory: MemoryConfig,

    /// External metrics service.
    #[serde(default)]
    pub analytics: AnalyticsConfig,

    /// HTTP gateway settings.
    #[serde(default)]
    pub gateway: GatewayConfig,
}

/// Assistant identity and turn-loop configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AgentConfig {
    /// Display name of the assistant.
    #[serde(default = "default_agent_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Maximum model invocations per request.
    #[serde(default = "default_max_turns")]
    pub max_turns: usize,

    /// Wall-clock bound on a single model invocation, in seconds.
    #[serde(default = "default_model_timeout_secs")]
    pub model_timeout_secs: u64,

    /// Extra attempts for a failed tool call before its error is fed back.
    #[serde(default = "default_tool_retries")]
    pub tool_retries: u32,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: default_agent_name(),
            log_level: default_log_level(),
            max_turns: default_max_turns(),
            model_timeout_secs: default_model_timeout_secs(),
            tool_retries: default_tool_retries(),
        }
    }
}

fn default_agent_name() -> String {
    "millwright".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_turns() -> usize {
    5
}

fn default_model_timeout_secs() -> u64 {
    30
}

fn default_tool_retries() -> u32 {
    1
}

/// OpenAI-compatible provider configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ProviderConfig {
    /// API key. `None` falls back to the `OPENAI_API_KEY` environment variable.
    #[serde(default)]
    pub api_key: Option<String>,

    /// API root; requests go to `{base_url}/chat/completions`.
    #[serde(default = "default_provider_base_url")]
    pub base_url: String,

    /// Model identifier.
    #[serde(default = "default_model")]
    pub model: String,

    /// Optional completion length cap.
    #[serde(default)]
    pub max_tokens: Option<u32>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_provider_base_url(),
            model: default_model(),
            max_tokens: None,
        }
    }
}

fn default_provider_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_model() -> String {
    "gpt-4o".to_string()
}

/// Factory description.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct FactoryConfig {
    /// Plant name shown in the system prompt.
    #[serde(default = "default_factory_name")]
    pub name: String,

    /// First day of available production data (YYYY-MM-DD).
    #[serde(default)]
    pub data_start: Option<String>,

    /// Last day of available production data (YYYY-MM-DD).
    #[serde(default)]
    pub data_end: Option<String>,

    /// Machine names.
    #[serde(default = "default_machines")]
    pub machines: Vec<String>,

    /// Shift descriptions, e.g. `Day (6am-2pm)`.
    #[serde(default = "default_shifts")]
    pub shifts: Vec<String>,
}

impl FactoryConfig {
    /// The production data window, when both ends are configured and parse.
    pub fn data_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        let start = self.data_start.as_deref().and_then(parse_iso_date)?;
        let end = self.data_end.as_deref().and_then(parse_iso_date)?;
        Some((start, end))
    }
}

impl Default for FactoryConfig {
    fn default() -> Self {
        Self {
            name: default_factory_name(),
            data_start: None,
            data_end: None,
            machines: default_machines(),
            shifts: default_shifts(),
        }
    }
}

/// Parses a `YYYY-MM-DD` date.
pub fn parse_iso_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").ok()
}

fn default_factory_name() -> String {
    "Demo Factory".to_string()
}

fn default_machines() -> Vec<String> {
    ["CNC-001", "Assembly-001", "Packaging-001", "Testing-001"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_shifts() -> Vec<String> {
    vec!["Day (6am-2pm)".to_string(), "Night (2pm-10pm)".to_string()]
}

/// Memory ledger configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MemoryConfig {
    /// Directory holding `memory.json`. `None` keeps the ledger in process memory.
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
}

/// Metrics service configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AnalyticsConfig {
    /// Base URL of the metrics API.
    #[serde(default = "default_analytics_base_url")]
    pub base_url: String,

    /// Per-request timeout, in seconds.
    #[serde(default = "default_analytics_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            base_url: default_analytics_base_url(),
            timeout_secs: default_analytics_timeout_secs(),
        }
    }
}

fn default_analytics_base_url() -> String {
    "http://127.0.0.1:8000".to_string()
}

fn default_analytics_timeout_secs() -> u64 {
    10
}

/// HTTP gateway configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    /// Host address to bind to.
    #[serde(default = "default_gateway_host")]
    pub host: String,

    /// Port to listen on.
    #[serde(default = "default_gateway_port")]
    pub port: u16,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_gateway_host(),
            port: default_gateway_port(),
        }
    }
}

fn default_gateway_host() -> String {
    "127.0.0.1".to_string()
}

fn default_gateway_port() -> u16 {
    3000
}
