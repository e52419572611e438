use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::core::config::{AppPaths, ConfigService, Settings};
use crate::embedding::{build_embedder, EmbeddingProvider};
use crate::llm::{LanguageModel, LlamaService};
use crate::rag::{IngestPipeline, QueryPipeline};
use crate::vector::{build_index, VectorIndex};

pub mod error;

use error::InitializationError;

/// Shared state handed to every route.
///
/// Ingestion and query hold the same embedder and index handles, built once
/// from the loaded settings.
pub struct AppState {
    pub paths: Arc<AppPaths>,
    pub settings: Arc<Settings>,
    pub ingest: Arc<IngestPipeline>,
    pub query: Arc<QueryPipeline>,
    pub uploads_dir: PathBuf,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    /// Loads configuration and brings up every service:
    /// 1. settings from `config.yml`, `secrets.yaml` and the environment
    /// 2. the embedding provider
    /// 3. the vector index (host discovery for Pinecone)
    /// 4. llama-server with the quantized model
    ///
    /// Any failure aborts startup.
    pub async fn initialize(paths: Arc<AppPaths>) -> Result<Arc<Self>, InitializationError> {
        let config = ConfigService::new(paths.clone());
        let raw = config.load_config().map_err(InitializationError::Config)?;
        tracing::debug!(
            "Effective configuration: {}",
            config.redact_sensitive_values(&raw)
        );
        let settings = config.load_settings().map_err(InitializationError::Config)?;

        let embedder = build_embedder(&settings.embedding)
            .await
            .map_err(InitializationError::Embedding)?;
        let index = build_index(&settings)
            .await
            .map_err(InitializationError::Index)?;
        let llm: Arc<dyn LanguageModel> = Arc::new(
            LlamaService::start(&settings.llm, &paths)
                .await
                .map_err(InitializationError::Llm)?,
        );

        Self::from_parts(paths, settings, embedder, index, llm)
    }

    /// Assembles the state from already constructed services.
    pub fn from_parts(
        paths: Arc<AppPaths>,
        settings: Settings,
        embedder: Arc<dyn EmbeddingProvider>,
        index: Arc<dyn VectorIndex>,
        llm: Arc<dyn LanguageModel>,
    ) -> Result<Arc<Self>, InitializationError> {
        let ingest = IngestPipeline::from_settings(&settings.ingest, embedder.clone(), index.clone())
            .map_err(InitializationError::Loader)?;
        let query = QueryPipeline::new(embedder, index, llm, settings.index.top_k);
        let uploads_dir = settings.ingest.uploads_path(&paths);

        tracing::info!(
            "Ready: index '{}', embeddings '{}', uploads in {}",
            settings.index.name,
            query.embedder().model_id(),
            uploads_dir.display()
        );

        Ok(Arc::new(AppState {
            paths,
            settings: Arc::new(settings),
            ingest: Arc::new(ingest),
            query: Arc::new(query),
            uploads_dir,
            started_at: Utc::now(),
        }))
    }
}
