//! Collaborators used while executing turns

use std::sync::Arc;

use crate::llm::InferenceProvider;
use crate::safety::SafetyProvider;
use crate::tools::{ToolGroups, ToolRuntime};
use crate::vector_io::VectorIo;

/// The services a turn calls out to
#[derive(Clone)]
pub struct AgentApis {
    pub inference: Arc<dyn InferenceProvider>,
    pub safety: Arc<dyn SafetyProvider>,
    pub vector_io: Arc<dyn VectorIo>,
    pub tool_runtime: Arc<dyn ToolRuntime>,
    pub tool_groups: Arc<dyn ToolGroups>,
}

impl AgentApis {
    /// Bundle the collaborators
    pub fn new(
        inference: Arc<dyn InferenceProvider>,
        safety: Arc<dyn SafetyProvider>,
        vector_io: Arc<dyn VectorIo>,
        tool_runtime: Arc<dyn ToolRuntime>,
        tool_groups: Arc<dyn ToolGroups>,
    ) -> Self {
        Self {
            inference,
            safety,
            vector_io,
            tool_runtime,
            tool_groups,
        }
    }
}

impl std::fmt::Debug for AgentApis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentApis")
            .field("inference", &self.inference.provider_name())
            .finish_non_exhaustive()
    }
}
