use std::sync::Arc;

use futures::{stream, StreamExt};
use tokio_retry::{
    strategy::{jitter, ExponentialBackoff},
    Retry,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use common::{
    error::AppError,
    llm::LlmProvider,
    storage::store::RunbookStore,
    types::chunk::RunbookChunk,
    vector::VectorStoreRepository,
};

use crate::chunker::{chunk_runbook, ChunkerConfig};

/// Outcome of one ingestion run. Per-document failures are collected here
/// rather than aborting the run.
#[derive(Debug, Default)]
pub struct IngestionReport {
    pub documents_processed: usize,
    pub chunks_stored: usize,
    pub errors: Vec<DocumentError>,
}

#[derive(Debug)]
pub struct DocumentError {
    pub runbook_path: String,
    pub message: String,
}

/// Re-indexes runbooks from object storage into the vector store.
///
/// Per document: delete prior chunks (last writer wins per path), fetch,
/// chunk, batch-embed, store. Documents are processed concurrently.
pub struct IngestionService {
    store: RunbookStore,
    vector_store: Arc<dyn VectorStoreRepository>,
    llm: Arc<dyn LlmProvider>,
    chunker: ChunkerConfig,
    concurrency: usize,
}

impl IngestionService {
    pub fn new(
        store: RunbookStore,
        vector_store: Arc<dyn VectorStoreRepository>,
        llm: Arc<dyn LlmProvider>,
        chunker: ChunkerConfig,
        concurrency: usize,
    ) -> Self {
        Self {
            store,
            vector_store,
            llm,
            chunker,
            concurrency: concurrency.max(1),
        }
    }

    /// Ingests every runbook below the prefix. Listing failures abort the
    /// run; per-document failures are surfaced in the report.
    #[instrument(skip_all, fields(bucket = %self.store.bucket()))]
    pub async fn ingest_all(&self, prefix: Option<&str>) -> Result<IngestionReport, AppError> {
        let keys = self.store.list_runbooks(prefix).await?;
        info!(runbooks = keys.len(), "starting runbook ingestion");

        let results: Vec<(String, Result<usize, AppError>)> = stream::iter(keys)
            .map(|key| async move {
                let outcome = self.ingest_document(&key).await;
                (key, outcome)
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        let mut report = IngestionReport::default();
        for (key, outcome) in results {
            report.documents_processed += 1;
            match outcome {
                Ok(count) => report.chunks_stored += count,
                Err(err) => {
                    warn!(runbook = %key, error = %err, "runbook ingestion failed");
                    report.errors.push(DocumentError {
                        runbook_path: key,
                        message: err.to_string(),
                    });
                }
            }
        }

        info!(
            documents = report.documents_processed,
            chunks = report.chunks_stored,
            failed = report.errors.len(),
            "runbook ingestion finished"
        );
        Ok(report)
    }

    /// Re-indexes one runbook; returns how many chunks were stored.
    #[instrument(skip_all, fields(runbook = %key))]
    pub async fn ingest_document(&self, key: &str) -> Result<usize, AppError> {
        self.vector_store.delete_by_runbook(key).await?;

        let Some(content) = self.store.get_runbook_content(key).await? else {
            return Ok(0);
        };

        let parsed = chunk_runbook(&content, &self.chunker);
        if parsed.is_empty() {
            return Ok(0);
        }

        let texts: Vec<String> = parsed.iter().map(|chunk| chunk.content.clone()).collect();
        let retry_strategy = ExponentialBackoff::from_millis(100).map(jitter).take(3);
        let embeddings =
            Retry::spawn(retry_strategy, || self.llm.generate_embeddings(&texts)).await?;

        if embeddings.len() != parsed.len() {
            return Err(AppError::LLMParsing(format!(
                "embedding count {} does not match chunk count {} for {key}",
                embeddings.len(),
                parsed.len()
            )));
        }

        let chunks: Vec<RunbookChunk> = parsed
            .into_iter()
            .zip(embeddings)
            .map(|(chunk, embedding)| {
                RunbookChunk::new(
                    Uuid::new_v4().to_string(),
                    key.to_string(),
                    chunk.section_title,
                    chunk.content,
                    chunk.tags,
                    chunk.applicable_shapes,
                    &embedding,
                )
            })
            .collect();

        let stored = chunks.len();
        self.vector_store.store_batch(chunks).await?;
        Ok(stored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use common::llm::{GenerationOptions, StubLlmProvider};
    use common::vector::InMemoryVectorStore;

    fn service_with(
        store: RunbookStore,
        vector_store: Arc<InMemoryVectorStore>,
        llm: Arc<dyn LlmProvider>,
    ) -> IngestionService {
        IngestionService::new(store, vector_store, llm, ChunkerConfig::new(10, 2000), 2)
    }

    async fn seeded_store(entries: &[(&str, &str)]) -> RunbookStore {
        let store = RunbookStore::in_memory("runbooks");
        for (key, body) in entries {
            store.put_runbook(key, body).await.expect("seed runbook");
        }
        store
    }

    /// Provider that fails embedding whenever the batch mentions a marker.
    struct PoisonedLlm {
        inner: StubLlmProvider,
        marker: &'static str,
    }

    #[async_trait]
    impl LlmProvider for PoisonedLlm {
        fn provider_id(&self) -> &str {
            "poisoned"
        }

        fn embedding_dimension(&self) -> usize {
            self.inner.embedding_dimension()
        }

        async fn generate_text(
            &self,
            prompt: &str,
            options: &GenerationOptions,
        ) -> Result<String, AppError> {
            self.inner.generate_text(prompt, options).await
        }

        async fn generate_embedding(&self, text: &str) -> Result<Vec<f32>, AppError> {
            self.inner.generate_embedding(text).await
        }

        async fn generate_embeddings(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, AppError> {
            if texts.iter().any(|text| text.contains(self.marker)) {
                return Err(AppError::Upstream("embedding backend unavailable".into()));
            }
            self.inner.generate_embeddings(texts).await
        }
    }

    #[tokio::test]
    async fn test_ingest_all_stores_chunks_for_every_runbook() {
        let store = seeded_store(&[
            (
                "memory.md",
                "---\ntags: [memory]\n---\n## Check\nRun free -h and look at available memory.",
            ),
            (
                "disk.md",
                "## Check\nRun df -h and look for filesystems above ninety percent.",
            ),
        ])
        .await;
        let vector_store = Arc::new(InMemoryVectorStore::new());
        let llm = Arc::new(StubLlmProvider::new(32));
        let service = service_with(store, Arc::clone(&vector_store), llm);

        let report = service.ingest_all(None).await.expect("ingest");
        assert_eq!(report.documents_processed, 2);
        assert!(report.errors.is_empty());
        assert_eq!(report.chunks_stored, vector_store.len().await);
        assert!(report.chunks_stored >= 2);
    }

    #[tokio::test]
    async fn test_reingestion_replaces_prior_chunks() {
        let store = seeded_store(&[(
            "a.md",
            "## Only\nOriginal body with a single section of text.",
        )])
        .await;
        let vector_store = Arc::new(InMemoryVectorStore::new());
        let llm = Arc::new(StubLlmProvider::new(32));
        let service = service_with(store.clone(), Arc::clone(&vector_store), llm);

        service.ingest_all(None).await.expect("first ingest");
        let first_count = vector_store.len().await;
        assert!(first_count >= 1);

        // Update the document to a different body with more sections.
        store
            .put_runbook(
                "a.md",
                "## One\nFirst replacement section body, long enough to emit.\n## Two\nSecond replacement section body, also long enough to emit.",
            )
            .await
            .expect("update runbook");
        service.ingest_all(None).await.expect("second ingest");

        let results = vector_store
            .search(&vec![0.0_f32; 32], usize::MAX)
            .await
            .expect("scan");
        assert!(results
            .iter()
            .all(|scored| scored.chunk.runbook_path() == "a.md"));
        assert!(results
            .iter()
            .all(|scored| !scored.chunk.content().contains("Original body")));
        assert!(results
            .iter()
            .any(|scored| scored.chunk.content().contains("First replacement")));
    }

    #[tokio::test]
    async fn test_reingestion_is_idempotent_for_identical_source() {
        let store = seeded_store(&[(
            "a.md",
            "---\ntags: [memory]\napplicable_shapes: [\"VM.*\"]\n---\n## Check\nInspect memory consumption with free -h output.",
        )])
        .await;
        let vector_store = Arc::new(InMemoryVectorStore::new());
        let llm = Arc::new(StubLlmProvider::new(32));
        let service = service_with(store, Arc::clone(&vector_store), llm);

        service.ingest_all(None).await.expect("first ingest");
        let first: Vec<_> = vector_store
            .search(&vec![0.0_f32; 32], usize::MAX)
            .await
            .expect("scan")
            .into_iter()
            .map(|scored| {
                (
                    scored.chunk.runbook_path().to_string(),
                    scored.chunk.section_title().to_string(),
                    scored.chunk.content().to_string(),
                    scored.chunk.tags().to_vec(),
                    scored.chunk.applicable_shapes().to_vec(),
                )
            })
            .collect();

        service.ingest_all(None).await.expect("second ingest");
        let second: Vec<_> = vector_store
            .search(&vec![0.0_f32; 32], usize::MAX)
            .await
            .expect("scan")
            .into_iter()
            .map(|scored| {
                (
                    scored.chunk.runbook_path().to_string(),
                    scored.chunk.section_title().to_string(),
                    scored.chunk.content().to_string(),
                    scored.chunk.tags().to_vec(),
                    scored.chunk.applicable_shapes().to_vec(),
                )
            })
            .collect();

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_one_failing_document_does_not_abort_the_run() {
        let store = seeded_store(&[
            (
                "good.md",
                "## Fine\nThis document embeds without any problem at all.",
            ),
            (
                "bad.md",
                "## Broken\nThis section mentions POISON and cannot be embedded.",
            ),
        ])
        .await;
        let vector_store = Arc::new(InMemoryVectorStore::new());
        let llm = Arc::new(PoisonedLlm {
            inner: StubLlmProvider::new(32),
            marker: "POISON",
        });
        let service = service_with(store, Arc::clone(&vector_store), llm);

        let report = service.ingest_all(None).await.expect("ingest");
        assert_eq!(report.documents_processed, 2);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].runbook_path, "bad.md");
        assert!(report.chunks_stored >= 1);

        let results = vector_store
            .search(&vec![0.0_f32; 32], usize::MAX)
            .await
            .expect("scan");
        assert!(results
            .iter()
            .all(|scored| scored.chunk.runbook_path() == "good.md"));
    }

    #[tokio::test]
    async fn test_missing_document_counts_zero_chunks() {
        let store = RunbookStore::in_memory("runbooks");
        let vector_store = Arc::new(InMemoryVectorStore::new());
        let llm = Arc::new(StubLlmProvider::new(32));
        let service = service_with(store, vector_store, llm);

        let count = service
            .ingest_document("never-uploaded.md")
            .await
            .expect("missing runbook is not an error");
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn test_empty_document_stores_nothing() {
        let store = seeded_store(&[("empty.md", "\n\n")]).await;
        let vector_store = Arc::new(InMemoryVectorStore::new());
        let llm = Arc::new(StubLlmProvider::new(32));
        let service = service_with(store, Arc::clone(&vector_store), llm);

        let count = service.ingest_document("empty.md").await.expect("ingest");
        assert_eq!(count, 0);
        assert!(vector_store.is_empty().await);
    }
}
