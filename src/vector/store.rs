use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::rag::RagError;

/// Metadata key holding the chunk text.
pub const TEXT_KEY: &str = "text";
/// Metadata key holding the file path or URL of the originating document.
pub const SOURCE_KEY: &str = "source";

/// One vector to be written to the index.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IndexEntry {
    pub id: String,
    pub values: Vec<f32>,
    pub metadata: Map<String, Value>,
}

/// One search hit, best first.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IndexMatch {
    pub id: String,
    pub score: f32,
    pub text: String,
    pub source: String,
    pub metadata: Map<String, Value>,
}

impl IndexMatch {
    /// Lifts `text` and `source` out of stored metadata. Hits without a text
    /// field yield an empty text rather than an error.
    pub fn from_metadata(id: impl Into<String>, score: f32, metadata: Map<String, Value>) -> Self {
        let text = string_field(&metadata, TEXT_KEY);
        let source = string_field(&metadata, SOURCE_KEY);
        Self {
            id: id.into(),
            score,
            text,
            source,
            metadata,
        }
    }
}

fn string_field(metadata: &Map<String, Value>, key: &str) -> String {
    metadata
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct IndexStats {
    pub total_vectors: u64,
    pub dimension: Option<usize>,
}

/// A named similarity index holding chunk embeddings.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    fn name(&self) -> &str;

    /// Writes all entries and returns how many were stored. Ids are never
    /// compared against existing content, so re-sending a chunk under a new
    /// id stores it again.
    async fn upsert(&self, entries: Vec<IndexEntry>) -> Result<usize, RagError>;

    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<IndexMatch>, RagError>;

    async fn stats(&self) -> Result<IndexStats, RagError>;
}
