use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::AppError;
use crate::types::chunk::{RunbookChunk, ScoredChunk};
use crate::vector::{cosine_similarity, VectorStoreRepository};

/// Linear-scan in-memory store. Chunks are held in insertion order so that
/// equal-score search results tie-break deterministically.
///
/// The first stored chunk pins the embedding dimension; later chunks with a
/// different dimension are rejected with a validation error.
#[derive(Default)]
pub struct InMemoryVectorStore {
    chunks: RwLock<Vec<RunbookChunk>>,
}

impl InMemoryVectorStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.chunks.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.chunks.read().await.is_empty()
    }

    fn check_dimension(existing: &[RunbookChunk], chunk: &RunbookChunk) -> Result<(), AppError> {
        if let Some(first) = existing.first() {
            if first.embedding_len() != chunk.embedding_len() {
                return Err(AppError::Validation(format!(
                    "chunk {} embedding dimension {} does not match store dimension {}",
                    chunk.id(),
                    chunk.embedding_len(),
                    first.embedding_len()
                )));
            }
        }
        Ok(())
    }

    fn upsert(chunks: &mut Vec<RunbookChunk>, chunk: RunbookChunk) {
        if let Some(existing) = chunks.iter_mut().find(|c| c.id() == chunk.id()) {
            *existing = chunk;
        } else {
            chunks.push(chunk);
        }
    }
}

#[async_trait]
impl VectorStoreRepository for InMemoryVectorStore {
    fn provider_type(&self) -> &'static str {
        "local"
    }

    async fn store(&self, chunk: RunbookChunk) -> Result<(), AppError> {
        let mut chunks = self.chunks.write().await;
        Self::check_dimension(&chunks, &chunk)?;
        Self::upsert(&mut chunks, chunk);
        Ok(())
    }

    async fn store_batch(&self, batch: Vec<RunbookChunk>) -> Result<(), AppError> {
        // One write-lock acquisition keeps the whole batch invisible to
        // concurrent searches until it lands.
        let mut chunks = self.chunks.write().await;
        for chunk in &batch {
            Self::check_dimension(&chunks, chunk)?;
        }
        for chunk in batch {
            Self::upsert(&mut chunks, chunk);
        }
        Ok(())
    }

    async fn search(
        &self,
        query_embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<ScoredChunk>, AppError> {
        let chunks = self.chunks.read().await;

        let mut scored: Vec<ScoredChunk> = chunks
            .iter()
            .map(|chunk| ScoredChunk {
                similarity_score: cosine_similarity(chunk.embedding(), query_embedding),
                chunk: chunk.clone(),
            })
            .collect();

        // Stable sort preserves insertion order on ties.
        scored.sort_by(|a, b| {
            b.similarity_score
                .partial_cmp(&a.similarity_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(top_k);
        Ok(scored)
    }

    async fn delete_by_runbook(&self, runbook_path: &str) -> Result<u64, AppError> {
        let mut chunks = self.chunks.write().await;
        let before = chunks.len();
        chunks.retain(|chunk| chunk.runbook_path() != runbook_path);
        Ok((before - chunks.len()) as u64)
    }

    async fn ping(&self) -> Result<(), AppError> {
        Ok(())
    }
}
