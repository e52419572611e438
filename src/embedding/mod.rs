//! Embedding providers.

pub mod hf_api;
pub mod provider;
pub mod tei;

use std::sync::Arc;

use crate::core::config::{EmbeddingBackend, EmbeddingSettings};
use crate::rag::RagError;

pub use hf_api::HfApiEmbedder;
pub use provider::EmbeddingProvider;
pub use tei::TeiEmbedder;

/// Builds the provider named by `embedding.provider`. A TEI server must be
/// reachable; the model it hosts is checked against `embedding.model`.
pub async fn build_embedder(
    settings: &EmbeddingSettings,
) -> Result<Arc<dyn EmbeddingProvider>, RagError> {
    match settings.provider {
        EmbeddingBackend::Tei => {
            let embedder = TeiEmbedder::new(settings);
            embedder.verify_model().await?;
            Ok(Arc::new(embedder))
        }
        EmbeddingBackend::HuggingFace => Ok(Arc::new(HfApiEmbedder::new(settings))),
    }
}
