use async_openai::config::OpenAIConfig;
use async_openai::types::{
    ChatCompletionRequestSystemMessage, ChatCompletionRequestUserMessage,
    CreateChatCompletionRequestArgs, CreateEmbeddingRequestArgs,
};
use async_openai::Client;
use async_trait::async_trait;
use tracing::debug;

use crate::error::AppError;
use crate::llm::{GenerationOptions, LlmProvider};
use crate::utils::config::LlmSettings;

const SYSTEM_MESSAGE: &str = "You are an experienced site reliability engineer. \
Answer with concrete, safe troubleshooting steps. Never invent commands that \
mutate state without calling that out.";

/// Provider speaking the OpenAI chat/embeddings API. Serves both the
/// `openai` id and the `ollama` id (Ollama exposes an OpenAI-compatible
/// endpoint), differing only in API base and whether the embeddings request
/// carries an explicit `dimensions` field.
pub struct OpenAiCompatProvider {
    client: Client<OpenAIConfig>,
    provider_id: String,
    text_model: String,
    embedding_model: String,
    embedding_dimensions: usize,
    request_dimensions: bool,
}

impl OpenAiCompatProvider {
    pub fn from_settings(settings: &LlmSettings) -> Self {
        let mut config = OpenAIConfig::new().with_api_base(settings.resolved_base_url());
        if let Some(key) = &settings.api_key {
            config = config.with_api_key(key);
        }

        Self {
            client: Client::with_config(config),
            provider_id: settings.provider.clone(),
            text_model: settings.text_model.clone(),
            embedding_model: settings.embedding_model.clone(),
            embedding_dimensions: settings.embedding_dimensions,
            // Ollama's embedding endpoint fixes the dimension per model.
            request_dimensions: settings.provider == "openai",
        }
    }

    async fn embed_batch(&self, inputs: Vec<String>) -> Result<Vec<Vec<f32>>, AppError> {
        let expected = inputs.len();

        let mut args = CreateEmbeddingRequestArgs::default();
        args.model(&self.embedding_model).input(inputs);
        if self.request_dimensions {
            args.dimensions(self.embedding_dimensions as u32);
        }
        let request = args.build()?;

        let response = self.client.embeddings().create(request).await?;

        let mut data = response.data;
        data.sort_by_key(|entry| entry.index);
        let embeddings: Vec<Vec<f32>> = data.into_iter().map(|entry| entry.embedding).collect();

        if embeddings.len() != expected {
            return Err(AppError::LLMParsing(format!(
                "embedding response returned {} vectors for {} inputs",
                embeddings.len(),
                expected
            )));
        }

        debug!(
            count = embeddings.len(),
            model = %self.embedding_model,
            "embeddings generated"
        );
        Ok(embeddings)
    }
}

#[async_trait]
impl LlmProvider for OpenAiCompatProvider {
    fn provider_id(&self) -> &str {
        &self.provider_id
    }

    fn embedding_dimension(&self) -> usize {
        self.embedding_dimensions
    }

    async fn generate_text(
        &self,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<String, AppError> {
        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.text_model)
            .messages([
                ChatCompletionRequestSystemMessage::from(SYSTEM_MESSAGE).into(),
                ChatCompletionRequestUserMessage::from(prompt.to_string()).into(),
            ])
            .temperature(options.temperature)
            .max_completion_tokens(options.max_tokens)
            .build()?;

        let response = self.client.chat().create(request).await?;

        let content = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.as_ref())
            .ok_or(AppError::LLMParsing(
                "No content found in LLM response".into(),
            ))?;

        Ok(content.clone())
    }

    async fn generate_embedding(&self, text: &str) -> Result<Vec<f32>, AppError> {
        let mut embeddings = self.embed_batch(vec![text.to_string()]).await?;
        embeddings
            .pop()
            .ok_or_else(|| AppError::LLMParsing("No embedding data received".into()))
    }

    async fn generate_embeddings(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, AppError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        self.embed_batch(texts.to_vec()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::config::LlmSettings;

    fn settings(provider: &str) -> LlmSettings {
        let mut settings = LlmSettings::default();
        settings.provider = provider.to_string();
        settings
    }

    #[test]
    fn test_provider_id_follows_settings() {
        let provider = OpenAiCompatProvider::from_settings(&settings("ollama"));
        assert_eq!(provider.provider_id(), "ollama");
        assert_eq!(provider.embedding_dimension(), 384);
    }

    #[test]
    fn test_only_openai_requests_explicit_dimensions() {
        let openai = OpenAiCompatProvider::from_settings(&settings("openai"));
        assert!(openai.request_dimensions);

        let ollama = OpenAiCompatProvider::from_settings(&settings("ollama"));
        assert!(!ollama.request_dimensions);
    }
}
