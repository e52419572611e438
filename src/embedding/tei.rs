//! Client for a text-embeddings-inference server hosting the embedding model.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::provider::{check_vectors, EmbeddingProvider};
use crate::core::config::EmbeddingSettings;
use crate::rag::RagError;

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    inputs: &'a [String],
    truncate: bool,
}

#[derive(Debug, Deserialize)]
pub struct TeiInfo {
    pub model_id: String,
    #[serde(default)]
    pub max_input_length: Option<usize>,
}

pub struct TeiEmbedder {
    client: Client,
    endpoint: String,
    model: String,
    dimensions: usize,
    batch_size: usize,
}

impl TeiEmbedder {
    pub fn new(settings: &EmbeddingSettings) -> Self {
        Self {
            client: Client::new(),
            endpoint: settings.endpoint.trim_end_matches('/').to_string(),
            model: settings.model.clone(),
            dimensions: settings.dimensions,
            batch_size: settings.batch_size.max(1),
        }
    }

    pub async fn info(&self) -> Result<TeiInfo, RagError> {
        let url = format!("{}/info", self.endpoint);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| RagError::embedding(&self.model, e))?;
        if !response.status().is_success() {
            return Err(RagError::embedding(
                &self.model,
                format!("HTTP {} from {}", response.status(), url),
            ));
        }
        response
            .json()
            .await
            .map_err(|e| RagError::embedding(&self.model, e))
    }

    /// Warns when the server hosts a different model than configured.
    pub async fn verify_model(&self) -> Result<(), RagError> {
        let info = self.info().await?;
        if info.model_id != self.model {
            tracing::warn!(
                "Embedding server hosts '{}' but '{}' is configured",
                info.model_id,
                self.model
            );
        } else {
            tracing::info!("Embedding server ready with {}", info.model_id);
        }
        if let Some(max) = info.max_input_length {
            tracing::debug!("Embedding server truncates inputs at {} tokens", max);
        }
        Ok(())
    }

    async fn embed_chunk(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RagError> {
        let url = format!("{}/embed", self.endpoint);
        let response = self
            .client
            .post(&url)
            .json(&EmbedRequest {
                inputs: texts,
                truncate: true,
            })
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
impl EmbeddingProvider for TeiEmbedder {
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
