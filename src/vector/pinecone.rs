//! Pinecone REST client.
//!
//! The control plane (`api.pinecone.io`) names indexes and hands out their
//! data-plane host; vectors are then written and searched on that host.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use super::store::{IndexEntry, IndexMatch, IndexStats, VectorIndex};
use crate::core::config::{PineconeSettings, Settings};
use crate::rag::RagError;

const BACKEND: &str = "pinecone";

/// Description of one index as reported by the control plane.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct IndexDescription {
    pub name: String,
    #[serde(default)]
    pub dimension: Option<usize>,
    #[serde(default)]
    pub metric: Option<String>,
    #[serde(default)]
    pub host: String,
}

#[derive(Debug, Deserialize)]
struct IndexList {
    #[serde(default)]
    indexes: Vec<IndexDescription>,
}

#[derive(Debug, Serialize)]
struct UpsertRequest<'a> {
    vectors: &'a [IndexEntry],
    namespace: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpsertResponse {
    #[serde(default)]
    upserted_count: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    vector: &'a [f32],
    top_k: usize,
    include_metadata: bool,
    include_values: bool,
    namespace: &'a str,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<QueryMatch>,
}

#[derive(Debug, Deserialize)]
struct QueryMatch {
    id: String,
    #[serde(default)]
    score: f32,
    #[serde(default)]
    metadata: Option<Map<String, Value>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatsResponse {
    #[serde(default)]
    total_vector_count: u64,
    #[serde(default)]
    dimension: Option<usize>,
}

#[derive(Clone)]
struct Credentials {
    api_key: String,
    api_version: String,
}

impl Credentials {
    fn from_settings(settings: &PineconeSettings) -> Result<Self, RagError> {
        let api_key = settings
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or_else(|| RagError::index(BACKEND, "PINECONE_API_KEY is not set"))?;
        Ok(Self {
            api_key: api_key.to_string(),
            api_version: settings.api_version.clone(),
        })
    }

    fn apply(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("Api-Key", &self.api_key)
            .header("X-Pinecone-API-Version", &self.api_version)
    }
}

/// Control-plane operations: listing and describing indexes.
#[derive(Clone)]
pub struct PineconeControl {
    client: Client,
    controller_url: String,
    credentials: Credentials,
}

impl PineconeControl {
    pub fn new(settings: &PineconeSettings, client: Client) -> Result<Self, RagError> {
        Ok(Self {
            client,
            controller_url: settings.controller_url.trim_end_matches('/').to_string(),
            credentials: Credentials::from_settings(settings)?,
        })
    }

    pub async fn list_indexes(&self) -> Result<Vec<IndexDescription>, RagError> {
        let url = format!("{}/indexes", self.controller_url);
        let response = self
            .credentials
            .apply(self.client.get(&url))
            .send()
            .await
            .map_err(|e| RagError::index(BACKEND, e))?;
        let list: IndexList = read_json(response).await?;
        Ok(list.indexes)
    }

    pub async fn describe_index(&self, name: &str) -> Result<IndexDescription, RagError> {
        let url = format!("{}/indexes/{}", self.controller_url, name);
        let response = self
            .credentials
            .apply(self.client.get(&url))
            .send()
            .await
            .map_err(|e| RagError::index(BACKEND, e))?;
        read_json(response).await
    }
}

/// Data-plane client bound to one index host and namespace.
pub struct PineconeIndex {
    client: Client,
    name: String,
    base_url: String,
    namespace: String,
    batch_size: usize,
    credentials: Credentials,
}

impl PineconeIndex {
    /// Resolves the data-plane host (configured or discovered) and checks the
    /// index dimension against the embedding model.
    pub async fn connect(settings: &Settings) -> Result<Self, RagError> {
        let client = Client::new();
        let index_name = settings.index.name.clone();

        let host = match settings.pinecone.host.as_deref().filter(|h| !h.trim().is_empty()) {
            Some(host) => host.to_string(),
            None => {
                let control = PineconeControl::new(&settings.pinecone, client.clone())?;
                let description = control.describe_index(&index_name).await?;
                if let Some(dimension) = description.dimension {
                    if dimension != settings.embedding.dimensions {
                        return Err(RagError::index(
                            BACKEND,
                            format!(
                                "Index '{}' has dimension {} but the embedding model produces {}",
                                index_name, dimension, settings.embedding.dimensions
                            ),
                        ));
                    }
                }
                description.host
            }
        };

        if host.trim().is_empty() {
            return Err(RagError::index(
                BACKEND,
                format!("Index '{}' has no host yet", index_name),
            ));
        }

        tracing::info!("Using Pinecone index '{}' at {}", index_name, host);
        Ok(Self::with_host(
            client,
            index_name,
            &host,
            &settings.index.namespace,
            settings.index.upsert_batch_size,
            Credentials::from_settings(&settings.pinecone)?,
        ))
    }

    fn with_host(
        client: Client,
        name: String,
        host: &str,
        namespace: &str,
        batch_size: usize,
        credentials: Credentials,
    ) -> Self {
        Self {
            client,
            name,
            base_url: host_url(host),
            namespace: namespace.to_string(),
            batch_size: batch_size.max(1),
            credentials,
        }
    }

    async fn post<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<Response, RagError> {
        let url = format!("{}{}", self.base_url, path);
        self.credentials
            .apply(self.client.post(&url))
            .json(body)
            .send()
            .await
            .map_err(|e| RagError::index(BACKEND, e))
    }
}

#[async_trait]
impl VectorIndex for PineconeIndex {
    fn name(&self) -> &str {
        &self.name
    }

    async fn upsert(&self, entries: Vec<IndexEntry>) -> Result<usize, RagError> {
        let mut upserted = 0;
        for batch in entries.chunks(self.batch_size) {
            let request = UpsertRequest {
                vectors: batch,
                namespace: &self.namespace,
            };
            let response = self.post("/vectors/upsert", &request).await?;
            let body: UpsertResponse = read_json(response).await?;
            tracing::debug!("Upserted batch of {} vectors", body.upserted_count);
            upserted += body.upserted_count;
        }
        Ok(upserted)
    }

    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<IndexMatch>, RagError> {
        let request = QueryRequest {
            vector,
            top_k,
            include_metadata: true,
            include_values: false,
            namespace: &self.namespace,
        };
        let response = self.post("/query", &request).await?;
        let body: QueryResponse = read_json(response).await?;

        Ok(body
            .matches
            .into_iter()
            .map(|m| IndexMatch::from_metadata(m.id, m.score, m.metadata.unwrap_or_default()))
            .collect())
    }

    async fn stats(&self) -> Result<IndexStats, RagError> {
        let response = self.post("/describe_index_stats", &json!({})).await?;
        let body: StatsResponse = read_json(response).await?;
        Ok(IndexStats {
            total_vectors: body.total_vector_count,
            dimension: body.dimension,
        })
    }
}

/// Index hosts come back without a scheme.
fn host_url(host: &str) -> String {
    let host = host.trim().trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("https://{}", host)
    }
}

async fn read_json<T: serde::de::DeserializeOwned>(response: Response) -> Result<T, RagError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(RagError::index(
            BACKEND,
            format!("HTTP {}: {}", status, body.trim()),
        ));
    }
    response
        .json::<T>()
        .await
        .map_err(|e| RagError::index(BACKEND, format!("Invalid response: {}", e)))
}
