//! Inference collaborator
//!
//! - `InferenceProvider` trait - Chat completion over a message history
//! - Message, tool call and request types shared by turns and steps

pub mod provider;
pub mod types;

pub use provider::InferenceProvider;
pub use types::{
    CompletionMessage, InferenceRequest, Message, SamplingParams, StopReason, ToolCall,
    ToolChoice, ToolConfig, ToolDefinition, ToolResponse,
};
