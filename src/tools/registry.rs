//! Per-turn tool registry
//!
//! Built at the start of every turn execution from the tool groups in effect
//! and the agent's client tools. It answers two questions for the loop:
//! which definitions to offer the model, and whether a requested tool runs
//! here (server tool) or must be supplied by the caller (client tool).

use std::collections::HashMap;

use serde_json::{Map, Value};

use super::provider::{AgentToolGroup, ToolGroups};
use crate::core::{AgentsError, AgentsResult};
use crate::llm::{ToolCall, ToolDefinition};

/// Where a tool is executed
#[derive(Debug, Clone, PartialEq)]
pub enum ToolSource {
    /// Executed through the tool runtime
    Server {
        /// Group the tool came from
        toolgroup: String,
        /// Arguments bound by the group reference
        bound_args: Map<String, Value>,
    },
    /// Result supplied by the caller through a resume request
    Client,
}

/// A tool available during a turn
#[derive(Debug, Clone)]
pub struct RegisteredTool {
    pub definition: ToolDefinition,
    pub source: ToolSource,
}

/// Registry that holds the tools available to one turn
#[derive(Debug, Default)]
pub struct ToolRegistry {
    tools: HashMap<String, RegisteredTool>,
    /// Registration order, so definitions are offered deterministically
    order: Vec<String>,
}

impl ToolRegistry {
    /// Create a new empty tool registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve `toolgroups` through the group registry and add `client_tools`
    ///
    /// Returns an error if two tools share a name.
    pub async fn resolve(
        groups: &dyn ToolGroups,
        toolgroups: &[AgentToolGroup],
        client_tools: &[ToolDefinition],
    ) -> AgentsResult<Self> {
        let mut registry = Self::new();

        for group in toolgroups {
            let definitions = groups.list_tools(group.name()).await?;
            let bound_args = group.args().cloned().unwrap_or_default();
            for definition in definitions {
                registry.register(
                    definition,
                    ToolSource::Server {
                        toolgroup: group.name().to_string(),
                        bound_args: bound_args.clone(),
                    },
                )?;
            }
        }

        for definition in client_tools {
            registry.register(definition.clone(), ToolSource::Client)?;
        }

        tracing::debug!("[ToolRegistry] Resolved {} tools", registry.len());
        Ok(registry)
    }

    /// Register a tool, rejecting duplicate names
    pub fn register(&mut self, definition: ToolDefinition, source: ToolSource) -> AgentsResult<()> {
        let name = definition.name.clone();
        if self.tools.contains_key(&name) {
            return Err(AgentsError::InvalidConfig(format!(
                "Tool name conflict: '{}' is registered twice",
                name
            )));
        }
        self.order.push(name.clone());
        self.tools.insert(name, RegisteredTool { definition, source });
        Ok(())
    }

    /// Get a tool by name
    pub fn get(&self, name: &str) -> Option<&RegisteredTool> {
        self.tools.get(name)
    }

    /// Whether `name` is a client tool
    pub fn is_client_tool(&self, name: &str) -> bool {
        matches!(self.get(name), Some(RegisteredTool { source: ToolSource::Client, .. }))
    }

    /// Definitions to offer the model, in registration order
    pub fn get_definitions(&self) -> Vec<ToolDefinition> {
        self.order
            .iter()
            .filter_map(|name| self.tools.get(name))
            .map(|tool| tool.definition.clone())
            .collect()
    }

    /// Arguments to execute `call` with: the call's own arguments, with the
    /// group's bound arguments filling in keys the model did not set
    pub fn call_arguments(&self, call: &ToolCall) -> Value {
        let bound = match self.get(&call.tool_name) {
            Some(RegisteredTool {
                source: ToolSource::Server { bound_args, .. },
                ..
            }) if !bound_args.is_empty() => bound_args,
            _ => return call.arguments.clone(),
        };

        let mut merged = match &call.arguments {
            Value::Object(map) => map.clone(),
            Value::Null => Map::new(),
            other => return other.clone(),
        };
        for (key, value) in bound {
            merged.entry(key.clone()).or_insert_with(|| value.clone());
        }
        Value::Object(merged)
    }

    /// Names of all registered tools
    pub fn tool_names(&self) -> Vec<String> {
        self.order.clone()
    }

    /// Number of registered tools
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Whether no tools are registered
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}
