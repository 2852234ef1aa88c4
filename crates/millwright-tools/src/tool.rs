// SPDX-FileCopyrightText: 2026 Millwright Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tool trait and registry.
//!
//! The set of tools the model may call is closed: [`ToolName`] enumerates
//! every identifier, and the [`ToolRegistry`] maps each one to a handler plus
//! the compiled JSON Schema its arguments are validated against before the
//! handler runs.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use millwright_core::{MillwrightError, ToolDefinition};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};
use tracing::debug;

/// Every tool the assistant can expose to the model.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ToolName {
    GetOeeMetrics,
    GetScrapMetrics,
    GetQualityIssues,
    GetDowntimeAnalysis,
    SaveInvestigation,
    AddInvestigationFinding,
    UpdateInvestigationStatus,
    LogAction,
    RecordActionImpact,
    GetPendingFollowups,
    GetMemoryContext,
    GetShiftSummary,
}

/// Output from a tool invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolOutput {
    /// JSON text handed back to the model.
    pub content: String,
    /// Whether the payload describes a failure.
    pub is_error: bool,
}

impl ToolOutput {
    /// A successful result carrying `value` as JSON text.
    pub fn json(value: &serde_json::Value) -> Self {
        Self {
            content: value.to_string(),
            is_error: false,
        }
    }

    /// An error payload of the form `{"error": message}`.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            content: serde_json::json!({ "error": message.into() }).to_string(),
            is_error: true,
        }
    }
}

/// A single callable tool.
///
/// The registry validates `input` against [`Tool::parameters_schema`] before
/// `invoke` is called, so handlers only deal with semantic checks.
#[async_trait]
pub trait Tool: Send + Sync {
    /// The tool's identifier.
    fn name(&self) -> ToolName;

    /// Natural-language description shown to the model.
    fn description(&self) -> &str;

    /// JSON Schema for the tool's arguments.
    fn parameters_schema(&self) -> serde_json::Value;

    /// Runs the tool.
    async fn invoke(&self, input: serde_json::Value) -> Result<ToolOutput, MillwrightError>;
}

struct RegisteredTool {
    tool: Arc<dyn Tool>,
    validator: jsonschema::Validator,
}

/// Registry of available tools, keyed by [`ToolName`].
pub struct ToolRegistry {
    tools: HashMap<ToolName, RegisteredTool>,
}

impl ToolRegistry {
    /// Creates an empty tool registry.
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Registers a tool, compiling its argument schema.
    ///
    /// A later registration under the same name replaces the earlier one.
    pub fn register(&mut self, tool: Arc<dyn Tool>) -> Result<(), MillwrightError> {
        let name = tool.name();
        let validator = jsonschema::validator_for(&tool.parameters_schema()).map_err(|e| {
            MillwrightError::Internal(format!("invalid parameter schema for {name}: {e}"))
        })?;
        self.tools.insert(name, RegisteredTool { tool, validator });
        Ok(())
    }

    /// Looks up a tool by its wire name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        let name = ToolName::from_str(name).ok()?;
        self.tools.get(&name).map(|r| Arc::clone(&r.tool))
    }

    /// Returns (name, description) pairs for all registered tools, sorted by name.
    pub fn list(&self) -> Vec<(ToolName, &str)> {
        let mut entries: Vec<(ToolName, &str)> = self
            .tools
            .values()
            .map(|r| (r.tool.name(), r.tool.description()))
            .collect();
        entries.sort_by_key(|(name, _)| name.as_ref().to_string());
        entries
    }

    /// Tool definitions for the model request, sorted by name.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        let mut defs: Vec<ToolDefinition> = self
            .tools
            .values()
            .map(|r| ToolDefinition {
                name: r.tool.name().to_string(),
                description: r.tool.description().to_string(),
                parameters: r.tool.parameters_schema(),
            })
            .collect();
        defs.sort_by(|a, b| a.name.cmp(&b.name));
        defs
    }

    /// Resolves `name`, validates `arguments` against its schema and runs it.
    ///
    /// Unknown names fail with [`MillwrightError::Lookup`]; schema violations
    /// fail with [`MillwrightError::Validation`] listing every violation.
    pub async fn dispatch(
        &self,
        name: &str,
        arguments: serde_json::Value,
    ) -> Result<ToolOutput, MillwrightError> {
        let registered = ToolName::from_str(name)
            .ok()
            .and_then(|n| self.tools.get(&n))
            .ok_or_else(|| MillwrightError::Lookup {
                name: name.to_string(),
            })?;

        let violations: Vec<String> = registered
            .validator
            .iter_errors(&arguments)
            .map(|e| {
                let path = e.instance_path.to_string();
                if path.is_empty() {
                    e.to_string()
                } else {
                    format!("{path}: {e}")
                }
            })
            .collect();
        if !violations.is_empty() {
            return Err(MillwrightError::Validation(format!(
                "invalid arguments for {name}: {}",
                violations.join("; ")
            )));
        }

        debug!(tool = %name, "dispatching tool");
        registered.tool.invoke(arguments).await
    }

    /// Returns the number of registered tools.
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Returns true if no tools are registered.
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Deserializes tool arguments into a typed struct.
pub(crate) fn parse_args<T: serde::de::DeserializeOwned>(
    tool: ToolName,
    input: serde_json::Value,
) -> Result<T, MillwrightError> {
    serde_json::from_value(input)
        .map_err(|e| MillwrightError::Validation(format!("invalid arguments for {tool}: {e}")))
}
