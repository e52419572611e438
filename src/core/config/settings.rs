//! Typed view of the merged configuration.
//!
//! Every field has a default, so an empty `config.yml` still yields a runnable
//! server (minus credentials).

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::paths::AppPaths;

pub const DEFAULT_EMBEDDING_MODEL: &str = "sentence-transformers/all-MiniLM-L6-v2";
pub const DEFAULT_EMBEDDING_DIMENSIONS: usize = 384;
pub const DEFAULT_INDEX_NAME: &str = "scholar-pulse";
pub const DEFAULT_MODEL_PATH: &str = "model/llama-2-7b-chat.Q4_0.gguf";
pub const DEFAULT_HF_API_BASE: &str = "https://router.huggingface.co/hf-inference/models";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    pub ingest: IngestSettings,
    pub embedding: EmbeddingSettings,
    pub index: IndexSettings,
    pub pinecone: PineconeSettings,
    pub llm: LlmSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    /// Upper bound for a whole `/ingest` request body.
    pub max_upload_bytes: usize,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            max_upload_bytes: 50 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkStrategy {
    Fixed,
    Recursive,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestSettings {
    /// Directory uploaded files are written to; also the default PDF
    /// directory for `store-index`.
    pub uploads_dir: String,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub strategy: ChunkStrategy,
    pub web_timeout_secs: u64,
    pub default_urls: Vec<String>,
}

impl Default for IngestSettings {
    fn default() -> Self {
        Self {
            uploads_dir: "data".to_string(),
            chunk_size: 1000,
            chunk_overlap: 200,
            strategy: ChunkStrategy::Fixed,
            web_timeout_secs: 30,
            default_urls: vec!["https://arxiv.org/html/2312.10997v5".to_string()],
        }
    }
}

impl IngestSettings {
    pub fn uploads_path(&self, paths: &AppPaths) -> PathBuf {
        let candidate = PathBuf::from(&self.uploads_dir);
        if candidate.is_absolute() {
            candidate
        } else {
            paths.user_data_dir.join(candidate)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EmbeddingBackend {
    #[serde(rename = "tei")]
    Tei,
    #[serde(rename = "huggingface")]
    HuggingFace,
}

/// The one place the embedding model is named. Ingestion and query both
/// build their provider from this struct.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    pub provider: EmbeddingBackend,
    pub model: String,
    pub dimensions: usize,
    /// Base URL of the text-embeddings-inference server.
    pub endpoint: String,
    /// Base URL of the hosted inference API, used by `huggingface`.
    pub hf_api_base: String,
    pub batch_size: usize,
    pub api_key: Option<String>,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            provider: EmbeddingBackend::Tei,
            model: DEFAULT_EMBEDDING_MODEL.to_string(),
            dimensions: DEFAULT_EMBEDDING_DIMENSIONS,
            endpoint: "http://127.0.0.1:8081".to_string(),
            hf_api_base: DEFAULT_HF_API_BASE.to_string(),
            batch_size: 32,
            api_key: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexBackend {
    Pinecone,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexSettings {
    pub backend: IndexBackend,
    pub name: String,
    pub namespace: String,
    pub top_k: usize,
    pub upsert_batch_size: usize,
}

impl Default for IndexSettings {
    fn default() -> Self {
        Self {
            backend: IndexBackend::Pinecone,
            name: DEFAULT_INDEX_NAME.to_string(),
            namespace: String::new(),
            top_k: 5,
            upsert_batch_size: 100,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PineconeSettings {
    pub api_key: Option<String>,
    pub environment: Option<String>,
    pub controller_url: String,
    pub api_version: String,
    /// Skip host discovery and talk to this data-plane host directly.
    pub host: Option<String>,
}

impl Default for PineconeSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            environment: None,
            controller_url: "https://api.pinecone.io".to_string(),
            api_version: "2024-07".to_string(),
            host: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    pub model_path: String,
    /// llama-server executable; looked up next to the project and on `PATH`
    /// when unset.
    pub server_binary: Option<String>,
    /// Attach to an already running llama-server instead of spawning one.
    pub server_url: Option<String>,
    pub port: u16,
    pub context_length: usize,
    pub max_new_tokens: usize,
    pub temperature: f32,
    pub n_gpu_layers: i32,
    pub startup_timeout_secs: u64,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            model_path: DEFAULT_MODEL_PATH.to_string(),
            server_binary: None,
            server_url: None,
            port: 8088,
            context_length: 4096,
            max_new_tokens: 512,
            temperature: 0.8,
            n_gpu_layers: 0,
            startup_timeout_secs: 120,
        }
    }
}
