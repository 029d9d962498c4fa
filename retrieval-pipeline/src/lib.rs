pub mod scoring;

use std::sync::Arc;

use tracing::{debug, instrument};

use common::{
    error::AppError,
    types::chunk::RunbookChunk,
    types::context::EnrichedContext,
    utils::embedding::EmbeddingService,
    vector::VectorStoreRepository,
};

use scoring::{shape_boost, tag_boost};

/// Candidates fetched per requested result before boosting re-ranks them.
const OVER_FETCH_FACTOR: usize = 2;

/// A chunk with its vector similarity, metadata boost, and composite score.
#[derive(Debug, Clone)]
pub struct RetrievedChunk {
    pub chunk: RunbookChunk,
    pub similarity_score: f32,
    pub metadata_boost: f32,
    pub final_score: f32,
}

/// Fuses vector similarity with alert-metadata boosts over the chunk store.
#[derive(Clone)]
pub struct Retriever {
    embedding: EmbeddingService,
    store: Arc<dyn VectorStoreRepository>,
}

impl Retriever {
    pub fn new(embedding: EmbeddingService, store: Arc<dyn VectorStoreRepository>) -> Self {
        Self { embedding, store }
    }

    /// Top-k chunks for the enriched context, ranked by
    /// `similarity + tag_boost + shape_boost` descending, stable on ties.
    #[instrument(skip_all, fields(alert_id = %context.alert().id(), top_k))]
    pub async fn retrieve(
        &self,
        context: &EnrichedContext,
        top_k: usize,
    ) -> Result<Vec<RetrievedChunk>, AppError> {
        if top_k == 0 {
            return Ok(Vec::new());
        }

        let query_embedding = self.embedding.embed_context(context).await?;
        let candidates = self
            .store
            .search(&query_embedding, top_k * OVER_FETCH_FACTOR)
            .await?;

        debug!(candidates = candidates.len(), "vector candidates fetched");

        let alert = context.alert();
        let resource = context.resource();

        let mut retrieved: Vec<RetrievedChunk> = candidates
            .into_iter()
            .map(|scored| {
                let boost = tag_boost(scored.chunk.tags(), alert)
                    + shape_boost(scored.chunk.applicable_shapes(), resource);
                RetrievedChunk {
                    final_score: scored.similarity_score + boost,
                    similarity_score: scored.similarity_score,
                    metadata_boost: boost,
                    chunk: scored.chunk,
                }
            })
            .collect();

        // Stable sort keeps the store's tie order intact.
        retrieved.sort_by(|a, b| {
            b.final_score
                .partial_cmp(&a.final_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        retrieved.truncate(top_k);

        debug!(results = retrieved.len(), "retrieval ranked");
        Ok(retrieved)
    }
}
