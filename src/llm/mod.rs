pub mod llama_service;
pub mod provider;
pub mod types;

pub use llama_service::LlamaService;
pub use provider::LanguageModel;
pub use types::{CompletionRequest, CompletionResponse, GenerationOptions};
