//! Tool group registry trait
//!
//! Agents name tool groups in their config; the registry resolves a group to
//! the tool definitions it exposes.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::core::AgentsResult;
use crate::llm::ToolDefinition;

/// A tool group named by an agent config or a turn request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AgentToolGroup {
    /// Group referenced by name only
    Name(String),
    /// Group with arguments bound for every call
    WithArgs {
        /// Group name
        name: String,
        /// Arguments merged into each call to this group's tools
        #[serde(default)]
        args: Map<String, Value>,
    },
}

impl AgentToolGroup {
    /// Group name
    pub fn name(&self) -> &str {
        match self {
            AgentToolGroup::Name(name) => name,
            AgentToolGroup::WithArgs { name, .. } => name,
        }
    }

    /// Bound arguments, if any
    pub fn args(&self) -> Option<&Map<String, Value>> {
        match self {
            AgentToolGroup::Name(_) => None,
            AgentToolGroup::WithArgs { args, .. } => Some(args),
        }
    }
}

impl From<&str> for AgentToolGroup {
    fn from(name: &str) -> Self {
        AgentToolGroup::Name(name.to_string())
    }
}

/// Trait for the tool-group registry collaborator
#[async_trait]
pub trait ToolGroups: Send + Sync {
    /// Tool definitions exposed by `toolgroup_id`
    async fn list_tools(&self, toolgroup_id: &str) -> AgentsResult<Vec<ToolDefinition>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_tool_group_serialization() {
        let plain: AgentToolGroup = serde_json::from_value(json!("builtin::websearch")).unwrap();
        assert_eq!(plain.name(), "builtin::websearch");
        assert!(plain.args().is_none());

        let with_args: AgentToolGroup = serde_json::from_value(json!({
            "name": "builtin::rag",
            "args": {"vector_db_ids": ["docs"]}
        }))
        .unwrap();
        assert_eq!(with_args.name(), "builtin::rag");
        assert_eq!(with_args.args().unwrap()["vector_db_ids"], json!(["docs"]));
    }
}
