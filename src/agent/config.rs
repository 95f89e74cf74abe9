//! Agent Configuration
//!
//! The configuration document an agent is created with. It is stored as JSON
//! under `agent:{agent_id}` and never changed afterwards.

use serde::{Deserialize, Serialize};

use crate::llm::{SamplingParams, ToolConfig, ToolDefinition};
use crate::tools::AgentToolGroup;

fn default_max_infer_iters() -> u32 {
    10
}

fn default_enable_session_persistence() -> bool {
    true
}

/// Configuration for an agent
///
/// Use the builder pattern to configure the agent:
///
/// ```ignore
/// let config = AgentConfig::new("llama-3", "You are a helpful assistant")
///     .with_toolgroup("builtin::websearch")
///     .with_client_tool(ToolDefinition::new("get_location", "Ask the user", json!({})))
///     .with_input_shield("llama_guard")
///     .with_max_infer_iters(5)
///     .with_session_persistence(false);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Model used for inference
    pub model: String,

    /// System instructions placed first in every inference request
    pub instructions: String,

    #[serde(default)]
    pub sampling_params: SamplingParams,

    /// Shields run over the turn input before inference
    #[serde(default)]
    pub input_shields: Vec<String>,

    /// Shields run over the final output
    #[serde(default)]
    pub output_shields: Vec<String>,

    /// Server-side tool groups
    #[serde(default)]
    pub toolgroups: Vec<AgentToolGroup>,

    /// Tools executed by the caller; calling one suspends the turn
    #[serde(default)]
    pub client_tools: Vec<ToolDefinition>,

    #[serde(default)]
    pub tool_config: ToolConfig,

    /// Maximum inference steps per turn
    #[serde(default = "default_max_infer_iters")]
    pub max_infer_iters: u32,

    /// Whether sessions go to the durable store (otherwise the in-memory store)
    #[serde(default = "default_enable_session_persistence")]
    pub enable_session_persistence: bool,

    /// Optional display name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl AgentConfig {
    /// Create a new agent configuration for `model` with `instructions`
    pub fn new(model: impl Into<String>, instructions: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            instructions: instructions.into(),
            sampling_params: SamplingParams::default(),
            input_shields: Vec::new(),
            output_shields: Vec::new(),
            toolgroups: Vec::new(),
            client_tools: Vec::new(),
            tool_config: ToolConfig::default(),
            max_infer_iters: default_max_infer_iters(),
            enable_session_persistence: default_enable_session_persistence(),
            name: None,
        }
    }

    /// Set the display name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set sampling parameters
    pub fn with_sampling_params(mut self, params: SamplingParams) -> Self {
        self.sampling_params = params;
        self
    }

    /// Add an input shield
    pub fn with_input_shield(mut self, shield_id: impl Into<String>) -> Self {
        self.input_shields.push(shield_id.into());
        self
    }

    /// Add an output shield
    pub fn with_output_shield(mut self, shield_id: impl Into<String>) -> Self {
        self.output_shields.push(shield_id.into());
        self
    }

    /// Add a server-side tool group
    pub fn with_toolgroup(mut self, group: impl Into<AgentToolGroup>) -> Self {
        self.toolgroups.push(group.into());
        self
    }

    /// Add a client tool
    pub fn with_client_tool(mut self, tool: ToolDefinition) -> Self {
        self.client_tools.push(tool);
        self
    }

    /// Set the tool configuration
    pub fn with_tool_config(mut self, tool_config: ToolConfig) -> Self {
        self.tool_config = tool_config;
        self
    }

    /// Set maximum inference steps per turn
    pub fn with_max_infer_iters(mut self, max: u32) -> Self {
        self.max_infer_iters = max;
        self
    }

    /// Set whether sessions are stored durably
    pub fn with_session_persistence(mut self, enabled: bool) -> Self {
        self.enable_session_persistence = enabled;
        self
    }

    /// Whether `name` is one of this agent's client tools
    pub fn is_client_tool(&self, name: &str) -> bool {
        self.client_tools.iter().any(|t| t.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_agent_config_defaults() {
        let config: AgentConfig = serde_json::from_value(json!({
            "model": "llama-3",
            "instructions": "Be brief."
        }))
        .unwrap();
        assert_eq!(config.max_infer_iters, 10);
        assert!(config.enable_session_persistence);
        assert!(config.toolgroups.is_empty());
        assert_eq!(config, AgentConfig::new("llama-3", "Be brief."));
    }

    #[test]
    fn test_agent_config_round_trip() {
        let config = AgentConfig::new("llama-3", "Be brief.")
            .with_name("helper")
            .with_toolgroup("builtin::websearch")
            .with_client_tool(ToolDefinition::new("get_location", "Ask the user", json!({})))
            .with_input_shield("llama_guard")
            .with_max_infer_iters(3)
            .with_session_persistence(false);

        let json = serde_json::to_string(&config).unwrap();
        let loaded: AgentConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(loaded, config);
        assert!(loaded.is_client_tool("get_location"));
        assert!(!loaded.is_client_tool("web_search"));
    }
}
