pub mod memory;
pub mod surreal;

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::AppError;
use crate::storage::db::SurrealDbClient;
use crate::types::chunk::{RunbookChunk, ScoredChunk};
use crate::utils::config::{AppConfig, VectorStoreKind};

pub use memory::InMemoryVectorStore;
pub use surreal::SurrealVectorStore;

/// Authoritative home of runbook chunks.
///
/// Single-key operations are linearizable and `store_batch` is atomic with
/// respect to concurrent searches in both implementations.
#[async_trait]
pub trait VectorStoreRepository: Send + Sync {
    fn provider_type(&self) -> &'static str;

    /// Durable insert; replaces an existing chunk with the same id.
    async fn store(&self, chunk: RunbookChunk) -> Result<(), AppError>;

    /// Durable insert of a batch with atomic visibility.
    async fn store_batch(&self, chunks: Vec<RunbookChunk>) -> Result<(), AppError>;

    /// Top-k chunks by cosine similarity, descending, ties in insertion order.
    async fn search(
        &self,
        query_embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<ScoredChunk>, AppError>;

    /// Removes every chunk whose `runbook_path` equals the argument; returns
    /// how many were removed.
    async fn delete_by_runbook(&self, runbook_path: &str) -> Result<u64, AppError>;

    /// Cheap liveness probe used by the health endpoint.
    async fn ping(&self) -> Result<(), AppError>;
}

/// Cosine similarity with a zero-norm guard: either norm being zero yields
/// 0.0 rather than NaN.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }
    let mut dot = 0.0_f32;
    let mut norm_a = 0.0_f32;
    let mut norm_b = 0.0_f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

/// Builds the vector store selected by `vector_store.provider`. The
/// `dimension` is what the configured LLM reports for its embedding model.
pub async fn vector_store_from_config(
    cfg: &AppConfig,
    dimension: usize,
) -> Result<Arc<dyn VectorStoreRepository>, AppError> {
    match cfg.vector_store.provider {
        VectorStoreKind::Local => Ok(Arc::new(InMemoryVectorStore::new())),
        VectorStoreKind::Surreal => {
            let db = SurrealDbClient::new(&cfg.surrealdb)
                .await
                .map_err(|e| AppError::Config(format!("surrealdb connection failed: {e}")))?;
            let store = SurrealVectorStore::new(db, dimension);
            store.ensure_index().await?;
            Ok(Arc::new(store))
        }
    }
}
