//! Vector index backends.
//!
//! `PineconeIndex` is the hosted index used in production; `MemoryIndex`
//! keeps everything in process and is selected with `index.backend: memory`.

pub mod math;
pub mod memory;
pub mod pinecone;
pub mod store;

use std::sync::Arc;

use crate::core::config::{IndexBackend, Settings};
use crate::rag::RagError;

pub use memory::MemoryIndex;
pub use pinecone::{IndexDescription, PineconeControl, PineconeIndex};
pub use store::{IndexEntry, IndexMatch, IndexStats, VectorIndex};

pub async fn build_index(settings: &Settings) -> Result<Arc<dyn VectorIndex>, RagError> {
    match settings.index.backend {
        IndexBackend::Pinecone => Ok(Arc::new(PineconeIndex::connect(settings).await?)),
        IndexBackend::Memory => {
            tracing::warn!(
                "Using in-memory index '{}'; vectors are lost on restart",
                settings.index.name
            );
            Ok(Arc::new(MemoryIndex::new(
                settings.index.name.clone(),
                settings.embedding.dimensions,
            )))
        }
    }
}
