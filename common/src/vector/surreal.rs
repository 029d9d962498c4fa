use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::AppError;
use crate::storage::db::SurrealDbClient;
use crate::types::chunk::{RunbookChunk, ScoredChunk};
use crate::vector::VectorStoreRepository;

const TABLE: &str = "runbook_chunk";
const INDEX: &str = "idx_embedding_runbook_chunk";

/// External vector store delegating k-NN to SurrealDB's HNSW index.
///
/// Chunk metadata travels in the same row as the vector so search results can
/// be rehydrated without a second lookup. The embedding dimension is fixed at
/// construction (what the configured LLM reports) and enforced before insert.
pub struct SurrealVectorStore {
    db: SurrealDbClient,
    dimension: usize,
}

/// Row shape persisted for each chunk. The chunk id doubles as the record key
/// and is mirrored in `chunk_id` so rows deserialize without Thing handling.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ChunkRow {
    chunk_id: String,
    runbook_path: String,
    section_title: String,
    content: String,
    tags: Vec<String>,
    applicable_shapes: Vec<String>,
    embedding: Vec<f32>,
}

#[derive(Debug, Deserialize)]
struct ScoredRow {
    chunk_id: String,
    runbook_path: String,
    section_title: String,
    content: String,
    tags: Vec<String>,
    applicable_shapes: Vec<String>,
    embedding: Vec<f32>,
    score: f32,
}

impl ChunkRow {
    fn from_chunk(chunk: &RunbookChunk) -> Self {
        Self {
            chunk_id: chunk.id().to_string(),
            runbook_path: chunk.runbook_path().to_string(),
            section_title: chunk.section_title().to_string(),
            content: chunk.content().to_string(),
            tags: chunk.tags().to_vec(),
            applicable_shapes: chunk.applicable_shapes().to_vec(),
            embedding: chunk.embedding().to_vec(),
        }
    }
}

impl From<ScoredRow> for ScoredChunk {
    fn from(row: ScoredRow) -> Self {
        let score = if row.score.is_finite() { row.score } else { 0.0 };
        ScoredChunk {
            chunk: RunbookChunk::new(
                row.chunk_id,
                row.runbook_path,
                row.section_title,
                row.content,
                row.tags,
                row.applicable_shapes,
                &row.embedding,
            ),
            similarity_score: score,
        }
    }
}

impl SurrealVectorStore {
    pub fn new(db: SurrealDbClient, dimension: usize) -> Self {
        Self { db, dimension }
    }

    /// Defines the chunk table and (re)defines the HNSW index with the
    /// configured dimension. Must run before the first search.
    pub async fn ensure_index(&self) -> Result<(), AppError> {
        self.db
            .client
            .query(format!(
                "DEFINE TABLE IF NOT EXISTS {TABLE} SCHEMALESS;
                 DEFINE INDEX OVERWRITE {INDEX} ON TABLE {TABLE} FIELDS embedding HNSW DIMENSION {dimension};",
                dimension = self.dimension
            ))
            .await
            .map_err(AppError::Database)?
            .check()
            .map_err(AppError::Database)?;
        Ok(())
    }

    fn check_dimension(&self, chunk: &RunbookChunk) -> Result<(), AppError> {
        if chunk.embedding_len() != self.dimension {
            return Err(AppError::Validation(format!(
                "chunk {} embedding dimension {} does not match index dimension {}",
                chunk.id(),
                chunk.embedding_len(),
                self.dimension
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl VectorStoreRepository for SurrealVectorStore {
    fn provider_type(&self) -> &'static str {
        "surreal"
    }

    async fn store(&self, chunk: RunbookChunk) -> Result<(), AppError> {
        self.check_dimension(&chunk)?;
        let row = ChunkRow::from_chunk(&chunk);

        self.db
            .client
            .query(format!(
                "UPSERT type::thing('{TABLE}', $chunk_id) CONTENT $row;"
            ))
            .bind(("chunk_id", row.chunk_id.clone()))
            .bind(("row", row))
            .await
            .map_err(AppError::Database)?
            .check()
            .map_err(AppError::Database)?;
        Ok(())
    }

    async fn store_batch(&self, chunks: Vec<RunbookChunk>) -> Result<(), AppError> {
        if chunks.is_empty() {
            return Ok(());
        }
        for chunk in &chunks {
            self.check_dimension(chunk)?;
        }

        // One transaction keeps the batch invisible to concurrent searches
        // until commit.
        let mut request = self.db.client.query("BEGIN TRANSACTION;");
        for (i, chunk) in chunks.iter().enumerate() {
            let row = ChunkRow::from_chunk(chunk);
            request = request
                .query(format!(
                    "UPSERT type::thing('{TABLE}', $chunk_id_{i}) CONTENT $row_{i};"
                ))
                .bind((format!("chunk_id_{i}"), row.chunk_id.clone()))
                .bind((format!("row_{i}"), row));
        }
        request = request.query("COMMIT TRANSACTION;");

        let response = request.await.map_err(AppError::Database)?;
        response.check().map_err(AppError::Database)?;

        debug!(count = chunks.len(), "stored chunk batch");
        Ok(())
    }

    async fn search(
        &self,
        query_embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<ScoredChunk>, AppError> {
        if top_k == 0 {
            return Ok(Vec::new());
        }

        let sql = format!(
            r#"
            SELECT
                chunk_id,
                runbook_path,
                section_title,
                content,
                tags,
                applicable_shapes,
                embedding,
                vector::similarity::cosine(embedding, $embedding) AS score
            FROM {TABLE}
            WHERE embedding <|{top_k},40|> $embedding
            ORDER BY score DESC
            LIMIT {top_k};
            "#
        );

        let mut response = self
            .db
            .client
            .query(&sql)
            .bind(("embedding", query_embedding.to_vec()))
            .await
            .map_err(|e| AppError::InternalError(format!("Surreal query failed: {e}")))?;

        let rows: Vec<ScoredRow> = response.take::<Vec<ScoredRow>>(0).unwrap_or_default();
        Ok(rows.into_iter().map(ScoredChunk::from).collect())
    }

    async fn delete_by_runbook(&self, runbook_path: &str) -> Result<u64, AppError> {
        let mut response = self
            .db
            .client
            .query(format!(
                "SELECT VALUE chunk_id FROM {TABLE} WHERE runbook_path = $path;"
            ))
            .query(format!("DELETE {TABLE} WHERE runbook_path = $path;"))
            .bind(("path", runbook_path.to_string()))
            .await
            .map_err(AppError::Database)?;

        let ids: Vec<String> = response.take::<Vec<String>>(0).unwrap_or_default();
        Ok(ids.len() as u64)
    }

    async fn ping(&self) -> Result<(), AppError> {
        self.db
            .client
            .query("RETURN true")
            .await
            .map_err(AppError::Database)?;
        Ok(())
    }
}
