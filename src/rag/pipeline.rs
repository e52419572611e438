use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use super::chunker::TextChunker;
use super::document::{Chunk, Document};
use super::error::RagError;
use super::loader::DocumentLoader;
use super::prompt::{build_context, PromptTemplate};
use crate::core::config::IngestSettings;
use crate::embedding::EmbeddingProvider;
use crate::llm::LanguageModel;
use crate::vector::store::{SOURCE_KEY, TEXT_KEY};
use crate::vector::{IndexEntry, IndexMatch, VectorIndex};

/// Counts reported after an ingestion run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestReport {
    pub documents: usize,
    pub chunks: usize,
}

/// Load, chunk, embed, upsert.
pub struct IngestPipeline {
    loader: DocumentLoader,
    chunker: TextChunker,
    embedder: Arc<dyn EmbeddingProvider>,
    index: Arc<dyn VectorIndex>,
}

impl IngestPipeline {
    pub fn new(
        loader: DocumentLoader,
        chunker: TextChunker,
        embedder: Arc<dyn EmbeddingProvider>,
        index: Arc<dyn VectorIndex>,
    ) -> Self {
        Self {
            loader,
            chunker,
            embedder,
            index,
        }
    }

    /// Loader and chunker configured from `ingest` settings.
    pub fn from_settings(
        settings: &IngestSettings,
        embedder: Arc<dyn EmbeddingProvider>,
        index: Arc<dyn VectorIndex>,
    ) -> Result<Self, RagError> {
        let loader = DocumentLoader::new(Duration::from_secs(settings.web_timeout_secs))?;
        Ok(Self::new(
            loader,
            TextChunker::from_settings(settings),
            embedder,
            index,
        ))
    }

    pub fn embedder(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.embedder
    }

    pub fn index(&self) -> &Arc<dyn VectorIndex> {
        &self.index
    }

    /// Ingests the given files and URLs together. Nothing loaded is an error.
    pub async fn ingest_sources(
        &self,
        files: &[PathBuf],
        urls: &[String],
    ) -> Result<IngestReport, RagError> {
        let mut documents = self.loader.load_files(files).await?;
        documents.extend(self.loader.load_urls(urls).await?);
        if documents.is_empty() {
            return Err(RagError::NoContent);
        }
        self.index_documents(&documents).await
    }

    /// Every PDF in `dir` plus `urls`; used for bulk indexing.
    pub async fn ingest_directory(
        &self,
        dir: &Path,
        urls: &[String],
    ) -> Result<IngestReport, RagError> {
        let mut documents = self.loader.load_directory(dir).await?;
        documents.extend(self.loader.load_urls(urls).await?);
        if documents.is_empty() {
            return Err(RagError::NoContent);
        }
        self.index_documents(&documents).await
    }

    /// Chunks, embeds and upserts `documents`. Documents that yield no text
    /// at all are reported as `NoContent`.
    pub async fn index_documents(&self, documents: &[Document]) -> Result<IngestReport, RagError> {
        let chunks = self.chunker.split_documents(documents);
        tracing::info!(
            "Split {} documents into {} chunks (size {}, overlap {})",
            documents.len(),
            chunks.len(),
            self.chunker.chunk_size(),
            self.chunker.chunk_overlap()
        );
        if chunks.is_empty() {
            return Err(RagError::NoContent);
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let vectors = self.embedder.embed_batch(&texts).await?;
        let entries: Vec<IndexEntry> = chunks
            .into_iter()
            .zip(vectors)
            .map(|(chunk, values)| chunk_entry(chunk, values))
            .collect();
        let count = entries.len();

        let stored = self.index.upsert(entries).await?;
        tracing::info!(
            "Upserted {} of {} vectors into '{}'",
            stored,
            count,
            self.index.name()
        );
        Ok(IngestReport {
            documents: documents.len(),
            chunks: count,
        })
    }
}

/// Every chunk gets a fresh random id; the content hash is recorded but never
/// used to deduplicate.
fn chunk_entry(chunk: Chunk, values: Vec<f32>) -> IndexEntry {
    let mut metadata: Map<String, Value> = chunk.metadata;
    metadata.insert("content_hash".to_string(), Value::String(content_hash(&chunk.text)));
    metadata.insert("chunk_index".to_string(), Value::from(chunk.chunk_index));
    metadata.insert("start_offset".to_string(), Value::from(chunk.start_offset));
    metadata.insert(SOURCE_KEY.to_string(), Value::String(chunk.source));
    metadata.insert(TEXT_KEY.to_string(), Value::String(chunk.text));

    IndexEntry {
        id: Uuid::new_v4().to_string(),
        values,
        metadata,
    }
}

pub fn content_hash(text: &str) -> String {
    hex::encode(Sha256::digest(text.as_bytes()))
}

/// A generated answer with the chunks it was grounded on.
#[derive(Debug, Clone)]
pub struct Answer {
    pub text: String,
    pub sources: Vec<IndexMatch>,
}

/// Embed the question, retrieve, fill the prompt, generate.
pub struct QueryPipeline {
    embedder: Arc<dyn EmbeddingProvider>,
    index: Arc<dyn VectorIndex>,
    llm: Arc<dyn LanguageModel>,
    prompt: PromptTemplate,
    top_k: usize,
}

impl QueryPipeline {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        index: Arc<dyn VectorIndex>,
        llm: Arc<dyn LanguageModel>,
        top_k: usize,
    ) -> Self {
        Self {
            embedder,
            index,
            llm,
            prompt: PromptTemplate::default(),
            top_k,
        }
    }

    pub fn embedder(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.embedder
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    pub async fn retrieve(&self, question: &str, top_k: usize) -> Result<Vec<IndexMatch>, RagError> {
        let vector = self.embedder.embed(question).await?;
        self.index.query(&vector, top_k).await
    }

    pub async fn answer(&self, question: &str) -> Result<Answer, RagError> {
        let sources = self.retrieve(question, self.top_k).await?;
        tracing::debug!("Retrieved {} chunks", sources.len());

        let context = build_context(&sources);
        let prompt = self.prompt.render(&context, question);
        let text = self.llm.generate(&prompt).await?;

        Ok(Answer { text, sources })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use crate::core::config::ChunkStrategy;
    use crate::vector::MemoryIndex;

    /// Bag-of-letters vectors: deterministic and similar for similar text.
    struct LetterEmbedder;

    #[async_trait]
    impl EmbeddingProvider for LetterEmbedder {
        fn model_id(&self) -> &str {
            "letters"
        }

        fn dimensions(&self) -> usize {
            26
        }

        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RagError> {
            Ok(texts
                .iter()
                .map(|text| {
                    let mut v = vec![0.0; 26];
                    for c in text.to_lowercase().chars().filter(char::is_ascii_lowercase) {
                        v[(c as u8 - b'a') as usize] += 1.0;
                    }
                    v
                })
                .collect())
        }
    }

    #[derive(Default)]
    struct RecordingModel {
        prompts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl LanguageModel for RecordingModel {
        fn name(&self) -> &str {
            "recording"
        }

        async fn generate(&self, prompt: &str) -> Result<String, RagError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            Ok("Fever usually brings chills and sweating.".to_string())
        }
    }

    fn pipelines() -> (IngestPipeline, QueryPipeline, Arc<MemoryIndex>, Arc<RecordingModel>) {
        let embedder: Arc<dyn EmbeddingProvider> = Arc::new(LetterEmbedder);
        let index = Arc::new(MemoryIndex::new("test", 26));
        let llm = Arc::new(RecordingModel::default());
        let loader = DocumentLoader::new(Duration::from_secs(5)).unwrap();

        let ingest = IngestPipeline::new(
            loader,
            TextChunker::new(1000, 200, ChunkStrategy::Fixed),
            embedder.clone(),
            index.clone(),
        );
        let query = QueryPipeline::new(embedder, index.clone(), llm.clone(), 5);
        (ingest, query, index, llm)
    }

    #[tokio::test]
    async fn ingest_stores_one_entry_per_chunk_with_text_metadata() {
        let (ingest, _, index, _) = pipelines();
        let docs = vec![
            Document::new("x".repeat(1800), "long.txt", "text"),
            Document::new("Fever is a rise in body temperature.", "short.txt", "text"),
        ];

        let report = ingest.index_documents(&docs).await.unwrap();
        assert_eq!(report, IngestReport { documents: 2, chunks: 3 });

        let entries = index.entries().await;
        assert_eq!(entries.len(), 3);
        let short = entries
            .iter()
            .find(|e| e.metadata["source"] == "short.txt")
            .unwrap();
        assert_eq!(short.metadata["text"], "Fever is a rise in body temperature.");
        assert_eq!(short.metadata["kind"], "text");
        assert_eq!(short.metadata["chunk_index"], 0);
        assert_eq!(
            short.metadata["content_hash"],
            content_hash("Fever is a rise in body temperature.")
        );
    }

    #[tokio::test]
    async fn reingesting_duplicates_entries_with_same_hash() {
        let (ingest, _, index, _) = pipelines();
        let docs = vec![Document::new("Fever and chills.", "fever.txt", "text")];

        ingest.index_documents(&docs).await.unwrap();
        ingest.index_documents(&docs).await.unwrap();

        let entries = index.entries().await;
        assert_eq!(entries.len(), 2);
        assert_ne!(entries[0].id, entries[1].id);
        assert_eq!(
            entries[0].metadata["content_hash"],
            entries[1].metadata["content_hash"]
        );
    }

    #[tokio::test]
    async fn nothing_to_load_is_no_content() {
        let (ingest, _, _, _) = pipelines();
        let err = ingest.ingest_sources(&[], &[]).await.unwrap_err();
        assert!(matches!(err, RagError::NoContent));

        let empty = tempfile::tempdir().unwrap();
        let err = ingest.ingest_directory(empty.path(), &[]).await.unwrap_err();
        assert!(matches!(err, RagError::NoContent));
    }

    #[tokio::test]
    async fn documents_without_text_are_no_content() {
        let (ingest, _, index, _) = pipelines();
        let err = ingest
            .index_documents(&[
                Document::new("   ", "scan.pdf", "pdf"),
                Document::new("\n\n", "blank.txt", "text"),
            ])
            .await
            .unwrap_err();
        assert!(matches!(err, RagError::NoContent));
        assert!(index.is_empty().await);
    }

    #[tokio::test]
    async fn answer_puts_retrieved_chunks_into_prompt() {
        let (ingest, query, _, llm) = pipelines();
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("fever.txt");
        std::fs::write(&file, "Symptoms of fever include chills, sweating and headache.").unwrap();
        ingest.ingest_sources(&[file], &[]).await.unwrap();

        let answer = query.answer("What are the symptoms of fever?").await.unwrap();

        assert_eq!(answer.text, "Fever usually brings chills and sweating.");
        assert_eq!(answer.sources.len(), 1);
        let prompts = llm.prompts.lock().unwrap();
        assert!(prompts[0].contains(
            "Context: Symptoms of fever include chills, sweating and headache.\nQuestion: What are the symptoms of fever?"
        ));
    }

    #[tokio::test]
    async fn retrieval_caps_at_top_k() {
        let (ingest, query, _, _) = pipelines();
        let docs: Vec<Document> = (0..8)
            .map(|i| Document::new(format!("note number {i} about fever"), format!("n{i}.txt"), "text"))
            .collect();
        ingest.index_documents(&docs).await.unwrap();

        assert_eq!(query.retrieve("fever", query.top_k()).await.unwrap().len(), 5);
        assert_eq!(query.retrieve("fever", 2).await.unwrap().len(), 2);
    }

    #[test]
    fn ingest_and_query_share_the_embedder() {
        let (ingest, query, _, _) = pipelines();
        assert!(Arc::ptr_eq(ingest.embedder(), query.embedder()));
    }
}
