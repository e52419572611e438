use serde::{Deserialize, Serialize};

use crate::core::config::LlmSettings;

/// Sampling parameters applied to every generation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationOptions {
    pub max_new_tokens: usize,
    pub temperature: f32,
}

impl GenerationOptions {
    pub fn from_settings(settings: &LlmSettings) -> Self {
        Self {
            max_new_tokens: settings.max_new_tokens,
            temperature: settings.temperature,
        }
    }
}

/// Body of llama-server's `POST /completion`.
#[derive(Debug, Clone, Serialize)]
pub struct CompletionRequest<'a> {
    pub prompt: &'a str,
    pub n_predict: usize,
    pub temperature: f32,
    pub stream: bool,
}

impl<'a> CompletionRequest<'a> {
    pub fn new(prompt: &'a str, options: GenerationOptions) -> Self {
        Self {
            prompt,
            n_predict: options.max_new_tokens,
            temperature: options.temperature,
            stream: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CompletionResponse {
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub tokens_predicted: Option<u64>,
}
