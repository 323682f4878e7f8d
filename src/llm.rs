use async_trait::async_trait;
use ollama_rs::generation::completion::request::GenerationRequest;
use ollama_rs::models::ModelOptions;
use ollama_rs::Ollama;

use crate::config::ModelConfig;
use crate::error::GenerationError;

/// Turns a fully rendered prompt into completion text.
#[async_trait]
pub trait Completion: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, GenerationError>;
}

pub struct OllamaCompletion {
    client: Ollama,
    model: String,
    temperature: f32,
}

impl OllamaCompletion {
    pub fn new(config: &ModelConfig) -> Self {
        Self {
            client: Ollama::new(config.host.clone(), config.port),
            model: config.model.clone(),
            temperature: config.temperature,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl Completion for OllamaCompletion {
    async fn complete(&self, prompt: &str) -> Result<String, GenerationError> {
        let request = GenerationRequest::new(self.model.clone(), prompt.to_string())
            .options(ModelOptions::default().temperature(self.temperature));

        tracing::debug!(model = %self.model, prompt_len = prompt.len(), "requesting completion");

        let response = self.client.generate(request).await?;

        Ok(response.response)
    }
}
