use std::sync::Arc;

use crate::error::AppError;
use crate::llm::LlmProvider;
use crate::types::context::EnrichedContext;

/// Narrow facade over the configured LLM's embedding surface.
#[derive(Clone)]
pub struct EmbeddingService {
    provider: Arc<dyn LlmProvider>,
}

impl EmbeddingService {
    pub fn new(provider: Arc<dyn LlmProvider>) -> Self {
        Self { provider }
    }

    pub fn dimension(&self) -> usize {
        self.provider.embedding_dimension()
    }

    pub async fn embed(&self, text: &str) -> Result<Vec<f32>, AppError> {
        self.provider.generate_embedding(text).await
    }

    pub async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, AppError> {
        self.provider.generate_embeddings(texts).await
    }

    /// Embeds the retrieval query derived from an enriched context.
    pub async fn embed_context(&self, context: &EnrichedContext) -> Result<Vec<f32>, AppError> {
        self.embed(&Self::context_query(context)).await
    }

    /// The retrieval query string. A pure function of the context: same
    /// context, same query, same embedding.
    pub fn context_query(context: &EnrichedContext) -> String {
        let alert = context.alert();
        let (display_name, shape) = match context.resource() {
            Some(resource) => (resource.display_name.as_str(), resource.shape.as_str()),
            None => ("N/A", "N/A"),
        };

        format!(
            "alert: {title}\n{message}\nresource: {display_name}\nshape: {shape}",
            title = alert.title(),
            message = alert.message(),
        )
    }
}
