use thiserror::Error;

use crate::core::errors::ApiError;
use crate::rag::RagError;

#[derive(Debug, Error)]
pub enum InitializationError {
    #[error("Failed to load configuration: {0}")]
    Config(#[source] ApiError),

    #[error("Failed to initialize embedding provider: {0}")]
    Embedding(#[source] RagError),

    #[error("Failed to connect to vector index: {0}")]
    Index(#[source] RagError),

    #[error("Failed to initialize LLM service: {0}")]
    Llm(#[source] RagError),

    #[error("Failed to initialize document loader: {0}")]
    Loader(#[source] RagError),
}
