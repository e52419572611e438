use async_trait::async_trait;

use crate::rag::RagError;

/// Turns text into fixed-length vectors.
///
/// Ingestion and query must go through the same provider instance, so the
/// stored vectors and the question vector come from one model.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Model name as configured, e.g. `sentence-transformers/all-MiniLM-L6-v2`.
    fn model_id(&self) -> &str;

    fn dimensions(&self) -> usize;

    /// One vector per input, in input order.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RagError>;

    async fn embed(&self, text: &str) -> Result<Vec<f32>, RagError> {
        let mut vectors = self.embed_batch(&[text.to_string()]).await?;
        vectors
            .pop()
            .ok_or_else(|| RagError::embedding(self.model_id(), "Empty embedding response"))
    }
}

/// Checks a provider response: one vector per input, each of the expected
/// length.
pub fn check_vectors(
    provider: &str,
    expected_count: usize,
    dimensions: usize,
    vectors: &[Vec<f32>],
) -> Result<(), RagError> {
    if vectors.len() != expected_count {
        return Err(RagError::embedding(
            provider,
            format!(
                "Expected {} embeddings, got {}",
                expected_count,
                vectors.len()
            ),
        ));
    }
    if let Some(bad) = vectors.iter().find(|v| v.len() != dimensions) {
        return Err(RagError::embedding(
            provider,
            format!(
                "Embedding dimension {} does not match configured {}",
                bad.len(),
                dimensions
            ),
        ));
    }
    Ok(())
}
