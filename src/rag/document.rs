use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Raw text of one loaded source.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    pub text: String,
    /// File path or URL the text came from.
    pub source: String,
    pub metadata: Map<String, Value>,
}

impl Document {
    pub fn new(text: impl Into<String>, source: impl Into<String>, kind: &str) -> Self {
        let mut metadata = Map::new();
        metadata.insert("kind".to_string(), Value::String(kind.to_string()));
        Self {
            text: text.into(),
            source: source.into(),
            metadata,
        }
    }

    pub fn with_metadata(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }
}

/// A bounded slice of a `Document`, the unit that gets embedded and stored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chunk {
    pub text: String,
    pub source: String,
    /// Position of this chunk among the chunks of its document.
    pub chunk_index: usize,
    /// Character offset of the chunk start within the document text.
    pub start_offset: usize,
    /// Metadata inherited from the parent document.
    pub metadata: Map<String, Value>,
}
