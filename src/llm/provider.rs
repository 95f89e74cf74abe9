//! Inference provider trait
//!
//! The turn loop calls the provider once per inference step. How the
//! provider produces its answer (which model, which API) is its own concern.

use async_trait::async_trait;

use super::types::{CompletionMessage, InferenceRequest};
use crate::core::AgentsResult;

/// Trait for the inference collaborator
#[async_trait]
pub trait InferenceProvider: Send + Sync {
    /// Produce the next assistant message for `request`
    async fn chat_completion(&self, request: InferenceRequest) -> AgentsResult<CompletionMessage>;

    /// Provider name for logging
    fn provider_name(&self) -> &str;
}
