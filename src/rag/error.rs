use thiserror::Error;

/// Failures of the individual pipeline stages.
#[derive(Debug, Error)]
pub enum RagError {
    #[error("Failed to load {origin}: {message}")]
    Load { origin: String, message: String },

    #[error("Unsupported file type: {0}")]
    UnsupportedFile(String),

    #[error("No content extracted")]
    NoContent,

    #[error("Embedding error ({provider}): {message}")]
    Embedding { provider: String, message: String },

    #[error("Vector index error ({backend}): {message}")]
    VectorIndex { backend: String, message: String },

    #[error("Generation error: {0}")]
    Generation(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl RagError {
    pub fn load(origin: impl Into<String>, message: impl std::fmt::Display) -> Self {
        RagError::Load {
            origin: origin.into(),
            message: message.to_string(),
        }
    }

    pub fn embedding(provider: impl Into<String>, message: impl std::fmt::Display) -> Self {
        RagError::Embedding {
            provider: provider.into(),
            message: message.to_string(),
        }
    }

    pub fn index(backend: impl Into<String>, message: impl std::fmt::Display) -> Self {
        RagError::VectorIndex {
            backend: backend.into(),
            message: message.to_string(),
        }
    }
}
