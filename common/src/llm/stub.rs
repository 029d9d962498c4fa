use async_trait::async_trait;
use sha2::{Digest, Sha256};

use crate::error::AppError;
use crate::llm::{GenerationOptions, LlmProvider};

const DEFAULT_RESPONSE: &str = "Step 1: Check recent deployments and configuration changes\n\
Step 2: Review resource utilization metrics for the affected instance\n\
Step 3: Inspect application logs around the alert timestamp";

/// Deterministic offline provider used by tests and local development.
///
/// Embeddings hash each token into a fixed-dimension signed bucket vector and
/// normalize to unit length, so texts sharing vocabulary land close together
/// under cosine similarity while staying fully reproducible.
pub struct StubLlmProvider {
    dimension: usize,
    response: Option<String>,
}

impl StubLlmProvider {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
            response: None,
        }
    }

    /// Scripts the exact text every `generate_text` call returns.
    pub fn with_response(dimension: usize, response: impl Into<String>) -> Self {
        Self {
            dimension: dimension.max(1),
            response: Some(response.into()),
        }
    }

    fn embed_sync(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0_f32; self.dimension];
        for token in text
            .to_lowercase()
            .split(|c: char| !c.is_alphanumeric())
            .filter(|token| !token.is_empty())
        {
            let digest = Sha256::digest(token.as_bytes());
            let bucket = u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]]) as usize
                % self.dimension;
            let sign = if digest[4] % 2 == 0 { 1.0 } else { -1.0 };
            vector[bucket] += sign;
        }

        let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for value in &mut vector {
                *value /= norm;
            }
        }
        vector
    }
}

#[async_trait]
impl LlmProvider for StubLlmProvider {
    fn provider_id(&self) -> &str {
        "stub"
    }

    fn embedding_dimension(&self) -> usize {
        self.dimension
    }

    async fn generate_text(
        &self,
        _prompt: &str,
        _options: &GenerationOptions,
    ) -> Result<String, AppError> {
        Ok(self
            .response
            .clone()
            .unwrap_or_else(|| DEFAULT_RESPONSE.to_string()))
    }

    async fn generate_embedding(&self, text: &str) -> Result<Vec<f32>, AppError> {
        Ok(self.embed_sync(text))
    }

    async fn generate_embeddings(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, AppError> {
        Ok(texts.iter().map(|text| self.embed_sync(text)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector::cosine_similarity;

    #[tokio::test]
    async fn test_embeddings_are_deterministic() {
        let stub = StubLlmProvider::new(64);
        let a = stub
            .generate_embedding("memory pressure on web tier")
            .await
            .expect("embed");
        let b = stub
            .generate_embedding("memory pressure on web tier")
            .await
            .expect("embed");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[tokio::test]
    async fn test_shared_vocabulary_scores_higher_than_disjoint() {
        let stub = StubLlmProvider::new(128);
        let query = stub
            .generate_embedding("high memory usage on instance")
            .await
            .expect("embed");
        let related = stub
            .generate_embedding("memory usage troubleshooting runbook")
            .await
            .expect("embed");
        let unrelated = stub
            .generate_embedding("certificate rotation schedule")
            .await
            .expect("embed");

        let related_score = cosine_similarity(&query, &related);
        let unrelated_score = cosine_similarity(&query, &unrelated);
        assert!(
            related_score > unrelated_score,
            "expected overlap to score higher: {related_score} <= {unrelated_score}"
        );
    }

    #[tokio::test]
    async fn test_embedding_is_unit_length() {
        let stub = StubLlmProvider::new(32);
        let vector = stub
            .generate_embedding("disk latency spike")
            .await
            .expect("embed");
        let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[tokio::test]
    async fn test_empty_text_embeds_to_zero_vector() {
        let stub = StubLlmProvider::new(16);
        let vector = stub.generate_embedding("").await.expect("embed");
        assert!(vector.iter().all(|x| *x == 0.0));
    }

    #[tokio::test]
    async fn test_scripted_response_is_returned_verbatim() {
        let stub = StubLlmProvider::with_response(16, "Step 1: free -h\nStep 2: top");
        let text = stub
            .generate_text("anything", &GenerationOptions::default())
            .await
            .expect("generate");
        assert_eq!(text, "Step 1: free -h\nStep 2: top");
    }

    #[tokio::test]
    async fn test_default_response_is_parseable_steps() {
        let stub = StubLlmProvider::new(16);
        let text = stub
            .generate_text("anything", &GenerationOptions::default())
            .await
            .expect("generate");
        assert!(text.lines().count() >= 3);
        assert!(text.starts_with("Step 1:"));
    }

    #[tokio::test]
    async fn test_batch_matches_single_embeddings() {
        let stub = StubLlmProvider::new(48);
        let texts = vec!["first".to_string(), "second".to_string()];
        let batch = stub.generate_embeddings(&texts).await.expect("batch");
        let first = stub.generate_embedding("first").await.expect("single");
        assert_eq!(batch.len(), 2);
        assert_eq!(batch[0], first);
    }
}
