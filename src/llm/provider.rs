use async_trait::async_trait;

use crate::rag::RagError;

#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// short backend name for logs (e.g. "llama-server")
    fn name(&self) -> &str;

    /// complete a fully rendered prompt and return the generated text
    async fn generate(&self, prompt: &str) -> Result<String, RagError>;
}
