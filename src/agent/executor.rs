//! Tool Executor
//!
//! Runs server-side tool calls through the tool runtime and turns every
//! outcome into a `ToolResponse` the model can see.

use crate::llm::{ToolCall, ToolResponse};
use crate::tools::{ToolRegistry, ToolRuntime, ToolSource};

/// Executes tool calls requested by the model
pub struct ToolExecutor;

impl ToolExecutor {
    /// Execute one call
    ///
    /// Unknown tools, client tools and runtime failures produce an error
    /// response rather than failing the turn.
    pub async fn execute(
        runtime: &dyn ToolRuntime,
        tools: &ToolRegistry,
        call: &ToolCall,
    ) -> ToolResponse {
        let tool = match tools.get(&call.tool_name) {
            Some(tool) => tool,
            None => {
                tracing::warn!("[Executor] Unknown tool requested: {}", call.tool_name);
                return ToolResponse::error(
                    &call.call_id,
                    &call.tool_name,
                    format!("Tool not found: {}", call.tool_name),
                );
            }
        };

        if tool.source == ToolSource::Client {
            return ToolResponse::error(
                &call.call_id,
                &call.tool_name,
                format!("{} must be executed by the client", call.tool_name),
            );
        }

        let arguments = tools.call_arguments(call);
        tracing::info!("[Executor] Executing {} ({})", call.tool_name, call.call_id);

        match runtime.invoke_tool(&call.tool_name, &arguments).await {
            Ok(result) => {
                let response = result.into_response(call);
                if response.is_error {
                    tracing::info!("[Executor] {} failed: {}", call.tool_name, response.content);
                }
                response
            }
            Err(e) => {
                tracing::error!("[Executor] Tool runtime error for {}: {}", call.tool_name, e);
                ToolResponse::error(&call.call_id, &call.tool_name, e.to_string())
            }
        }
    }

    /// Execute calls in order
    pub async fn execute_all(
        runtime: &dyn ToolRuntime,
        tools: &ToolRegistry,
        calls: &[ToolCall],
    ) -> Vec<ToolResponse> {
        let mut responses = Vec::with_capacity(calls.len());
        for call in calls {
            responses.push(Self::execute(runtime, tools, call).await);
        }
        responses
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::{json, Value};

    use crate::core::{AgentsError, AgentsResult};
    use crate::llm::ToolDefinition;
    use crate::tools::ToolInvocationResult;

    struct EchoRuntime;

    #[async_trait]
    impl ToolRuntime for EchoRuntime {
        async fn invoke_tool(
            &self,
            tool_name: &str,
            arguments: &Value,
        ) -> AgentsResult<ToolInvocationResult> {
            match tool_name {
                "echo" => Ok(ToolInvocationResult::success(arguments.to_string())),
                "fails" => Ok(ToolInvocationResult::error("bad input")),
                _ => Err(AgentsError::collaborator("runtime down")),
            }
        }
    }

    fn registry() -> ToolRegistry {
        let mut tools = ToolRegistry::new();
        for name in ["echo", "fails", "broken"] {
            tools
                .register(
                    ToolDefinition::new(name, "", json!({})),
                    ToolSource::Server {
                        toolgroup: "test".into(),
                        bound_args: Default::default(),
                    },
                )
                .unwrap();
        }
        tools
            .register(ToolDefinition::new("client", "", json!({})), ToolSource::Client)
            .unwrap();
        tools
    }

    #[tokio::test]
    async fn test_execute_outcomes() {
        let tools = registry();
        let calls = vec![
            ToolCall::new("1", "echo", json!({"x": 1})),
            ToolCall::new("2", "fails", json!({})),
            ToolCall::new("3", "broken", json!({})),
            ToolCall::new("4", "missing", json!({})),
            ToolCall::new("5", "client", json!({})),
        ];

        let responses = ToolExecutor::execute_all(&EchoRuntime, &tools, &calls).await;
        assert_eq!(responses.len(), 5);
        assert!(!responses[0].is_error);
        assert_eq!(responses[0].content, r#"{"x":1}"#);
        assert!(responses.iter().skip(1).all(|r| r.is_error));
        assert_eq!(responses[3].content, "Tool not found: missing");
        let ids: Vec<_> = responses.iter().map(|r| r.call_id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2", "3", "4", "5"]);
    }
}
