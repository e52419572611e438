//! Retrieval-augmented generation pipeline.
//!
//! - `loader`: turns PDFs, text files and web pages into `Document`s
//! - `chunker`: splits documents into overlapping `Chunk`s
//! - `prompt`: fills the question-answering template
//! - `pipeline`: wires loader, chunker, embedder, index and language model
//!   into the ingestion and query flows

pub mod chunker;
pub mod document;
pub mod error;
pub mod loader;
pub mod pipeline;
pub mod prompt;

pub use chunker::TextChunker;
pub use document::{Chunk, Document};
pub use error::RagError;
pub use loader::DocumentLoader;
pub use pipeline::{Answer, IngestPipeline, IngestReport, QueryPipeline};
pub use prompt::PromptTemplate;
