//! Hugging Face hosted inference, feature-extraction pipeline.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;

use super::provider::{check_vectors, EmbeddingProvider};
use crate::core::config::EmbeddingSettings;
use crate::rag::RagError;

pub struct HfApiEmbedder {
    client: Client,
    url: String,
    api_key: Option<String>,
    model: String,
    dimensions: usize,
    batch_size: usize,
}

impl HfApiEmbedder {
    pub fn new(settings: &EmbeddingSettings) -> Self {
        let url = format!(
            "{}/{}/pipeline/feature-extraction",
            settings.hf_api_base.trim_end_matches('/'),
            settings.model
        );
        if settings.api_key.is_none() {
            tracing::warn!("HF_TOKEN is not set; hosted inference requests may be rejected");
        }
        Self {
            client: Client::new(),
            url,
            api_key: settings.api_key.clone(),
            model: settings.model.clone(),
            dimensions: settings.dimensions,
            batch_size: settings.batch_size.max(1),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn embed_chunk(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RagError> {
        let mut request = self.client.post(&self.url).json(&json!({
            "inputs": texts,
            "options": { "wait_for_model": true }
        }));
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| RagError::embedding(&self.model, e))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RagError::embedding(
                &self.model,
                format!("HTTP {}: {}", status, body.trim()),
            ));
        }

        let vectors: Vec<Vec<f32>> = response
            .json()
            .await
            .map_err(|e| RagError::embedding(&self.model, e))?;
        check_vectors(&self.model, texts.len(), self.dimensions, &vectors)?;
        Ok(vectors)
    }
}

#[async_trait]
impl EmbeddingProvider for HfApiEmbedder {
    fn model_id(&self) -> &str {
        &self.model
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RagError> {
        let mut vectors = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size) {
            vectors.extend(self.embed_chunk(batch).await?);
        }
        Ok(vectors)
    }
}
