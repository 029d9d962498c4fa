use async_trait::async_trait;

use common::{
    error::AppError,
    types::alert::Alert,
    types::checklist::DynamicChecklist,
    types::context::EnrichedContext,
};
use retrieval_pipeline::{RetrievedChunk, Retriever};

use crate::enrichment::EnrichmentService;
use crate::generator::ChecklistGenerator;

/// The three stage implementations the pipeline drives. A trait so tests can
/// substitute recording mocks for the real services.
#[async_trait]
pub trait PipelineServices: Send + Sync {
    async fn enrich(&self, alert: Alert) -> Result<EnrichedContext, AppError>;

    async fn retrieve(
        &self,
        context: &EnrichedContext,
        top_k: usize,
    ) -> Result<Vec<RetrievedChunk>, AppError>;

    async fn generate(
        &self,
        context: &EnrichedContext,
        chunks: &[RetrievedChunk],
    ) -> Result<DynamicChecklist, AppError>;
}

pub struct DefaultPipelineServices {
    enrichment: EnrichmentService,
    retriever: Retriever,
    generator: ChecklistGenerator,
}

impl DefaultPipelineServices {
    pub fn new(
        enrichment: EnrichmentService,
        retriever: Retriever,
        generator: ChecklistGenerator,
    ) -> Self {
        Self {
            enrichment,
            retriever,
            generator,
        }
    }
}

#[async_trait]
impl PipelineServices for DefaultPipelineServices {
    async fn enrich(&self, alert: Alert) -> Result<EnrichedContext, AppError> {
        // Enrichment degrades internally and cannot fail.
        Ok(self.enrichment.enrich(alert).await)
    }

    async fn retrieve(
        &self,
        context: &EnrichedContext,
        top_k: usize,
    ) -> Result<Vec<RetrievedChunk>, AppError> {
        self.retriever.retrieve(context, top_k).await
    }

    async fn generate(
        &self,
        context: &EnrichedContext,
        chunks: &[RetrievedChunk],
    ) -> Result<DynamicChecklist, AppError> {
        self.generator.generate(context, chunks).await
    }
}
