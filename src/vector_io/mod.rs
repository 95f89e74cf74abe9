//! Vector retrieval collaborator
//!
//! Documents attached to a turn are inserted into a session-scoped vector DB
//! and queried with the turn's last user message.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::core::AgentsResult;

/// A document attached to a turn request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Document text
    pub content: String,
    /// MIME type of `content`
    #[serde(default = "default_mime_type")]
    pub mime_type: String,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub metadata: Map<String, Value>,
}

fn default_mime_type() -> String {
    "text/plain".to_string()
}

impl Document {
    /// Create a plain-text document
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            mime_type: default_mime_type(),
            metadata: Map::new(),
        }
    }
}

/// A retrieved chunk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub content: String,
    #[serde(default)]
    pub score: f32,
}

/// Name of the vector DB holding a session's documents
pub fn session_vector_db_id(session_id: &str) -> String {
    format!("{}-documents", session_id)
}

/// Trait for the vector retrieval collaborator
#[async_trait]
pub trait VectorIo: Send + Sync {
    /// Insert `documents` into `vector_db_id`, creating it if needed
    async fn insert_documents(&self, vector_db_id: &str, documents: &[Document]) -> AgentsResult<()>;

    /// Retrieve chunks relevant to `query`
    async fn query(&self, vector_db_id: &str, query: &str) -> AgentsResult<Vec<Chunk>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_session_vector_db_id() {
        assert_eq!(session_vector_db_id("s1"), "s1-documents");
    }

    #[test]
    fn test_document_defaults() {
        let doc: Document = serde_json::from_value(json!({"content": "hello"})).unwrap();
        assert_eq!(doc, Document::text("hello"));
    }
}
