pub mod openai;
pub mod stub;

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::AppError;
use crate::utils::config::AppConfig;

pub use openai::OpenAiCompatProvider;
pub use stub::StubLlmProvider;

/// Bounds applied to one text-generation call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationOptions {
    pub temperature: f32,
    pub max_tokens: u32,
}

impl GenerationOptions {
    pub fn new(temperature: f32, max_tokens: u32) -> Result<Self, AppError> {
        if !(0.0..=1.0).contains(&temperature) {
            return Err(AppError::Validation(format!(
                "temperature must be within [0, 1], got {temperature}"
            )));
        }
        if max_tokens == 0 {
            return Err(AppError::Validation(
                "max_tokens must be greater than zero".into(),
            ));
        }
        Ok(Self {
            temperature,
            max_tokens,
        })
    }
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_tokens: 1000,
        }
    }
}

/// A pluggable large-language-model backend.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    fn provider_id(&self) -> &str;

    /// The fixed dimension of vectors produced by `generate_embedding`.
    fn embedding_dimension(&self) -> usize;

    async fn generate_text(
        &self,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<String, AppError>;

    async fn generate_embedding(&self, text: &str) -> Result<Vec<f32>, AppError>;

    async fn generate_embeddings(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, AppError>;
}

/// Builds the provider selected by `llm.provider`; unknown ids fail fast.
pub fn llm_provider_from_config(cfg: &AppConfig) -> Result<Arc<dyn LlmProvider>, AppError> {
    match cfg.llm.provider.as_str() {
        "openai" | "ollama" => Ok(Arc::new(OpenAiCompatProvider::from_settings(&cfg.llm))),
        "stub" => Ok(Arc::new(StubLlmProvider::new(cfg.llm.embedding_dimensions))),
        other => Err(AppError::Config(format!("unknown llm.provider: {other}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generation_options_validate_bounds() {
        assert!(GenerationOptions::new(0.0, 1).is_ok());
        assert!(GenerationOptions::new(1.0, 1000).is_ok());
        assert!(GenerationOptions::new(1.5, 1000).is_err());
        assert!(GenerationOptions::new(-0.1, 1000).is_err());
        assert!(GenerationOptions::new(0.7, 0).is_err());
    }

    #[test]
    fn test_factory_rejects_unknown_provider() {
        let mut cfg = AppConfig::default();
        cfg.llm.provider = "bard".into();
        let err = llm_provider_from_config(&cfg)
            .err()
            .expect("unknown provider must fail");
        assert!(matches!(err, AppError::Config(_)));
    }

    #[test]
    fn test_factory_builds_known_providers() {
        let mut cfg = AppConfig::default();
        for provider in ["stub", "ollama", "openai"] {
            cfg.llm.provider = provider.into();
            let built = llm_provider_from_config(&cfg).expect("known provider");
            assert_eq!(built.provider_id(), provider);
        }
    }
}
