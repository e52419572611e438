//! In-process index with exact cosine search, for offline runs and tests.

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::math::rank_descending_by_cosine;
use super::store::{IndexEntry, IndexMatch, IndexStats, VectorIndex};
use crate::rag::RagError;

pub struct MemoryIndex {
    name: String,
    dimension: usize,
    entries: RwLock<Vec<IndexEntry>>,
}

impl MemoryIndex {
    pub fn new(name: impl Into<String>, dimension: usize) -> Self {
        Self {
            name: name.into(),
            dimension,
            entries: RwLock::new(Vec::new()),
        }
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    pub async fn entries(&self) -> Vec<IndexEntry> {
        self.entries.read().await.clone()
    }
}

#[async_trait]
impl VectorIndex for MemoryIndex {
    fn name(&self) -> &str {
        &self.name
    }

    async fn upsert(&self, entries: Vec<IndexEntry>) -> Result<usize, RagError> {
        if let Some(bad) = entries.iter().find(|e| e.values.len() != self.dimension) {
            return Err(RagError::index(
                "memory",
                format!(
                    "Vector dimension {} does not match index dimension {}",
                    bad.values.len(),
                    self.dimension
                ),
            ));
        }

        let count = entries.len();
        let mut stored = self.entries.write().await;
        for entry in entries {
            match stored.iter_mut().find(|e| e.id == entry.id) {
                Some(existing) => *existing = entry,
                None => stored.push(entry),
            }
        }
        Ok(count)
    }

    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<IndexMatch>, RagError> {
        let stored = self.entries.read().await;
        let ranked = rank_descending_by_cosine(vector, stored.iter().map(|e| e.values.as_slice()))?;

        Ok(ranked
            .into_iter()
            .take(top_k)
            .map(|(idx, score)| {
                let entry = &stored[idx];
                IndexMatch::from_metadata(entry.id.clone(), score, entry.metadata.clone())
            })
            .collect())
    }

    async fn stats(&self) -> Result<IndexStats, RagError> {
        Ok(IndexStats {
            total_vectors: self.entries.read().await.len() as u64,
            dimension: Some(self.dimension),
        })
    }
}
