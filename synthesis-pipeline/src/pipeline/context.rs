use common::{
    error::AppError,
    types::alert::Alert,
    types::checklist::DynamicChecklist,
    types::context::EnrichedContext,
};
use retrieval_pipeline::RetrievedChunk;
use tracing::error;

use super::services::PipelineServices;

pub struct PipelineContext<'a> {
    pub alert: &'a Alert,
    pub alert_id: String,
    pub correlation_id: String,
    pub top_k: usize,
    pub services: &'a dyn PipelineServices,
    pub enriched: Option<EnrichedContext>,
    pub chunks: Vec<RetrievedChunk>,
    pub checklist: Option<DynamicChecklist>,
}

impl<'a> PipelineContext<'a> {
    pub fn new(
        alert: &'a Alert,
        correlation_id: String,
        top_k: usize,
        services: &'a dyn PipelineServices,
    ) -> Self {
        let alert_id = alert.id().to_string();
        Self {
            alert,
            alert_id,
            correlation_id,
            top_k,
            services,
            enriched: None,
            chunks: Vec::new(),
            checklist: None,
        }
    }

    pub fn enriched(&self) -> Result<&EnrichedContext, AppError> {
        self.enriched.as_ref().ok_or_else(|| {
            AppError::InternalError("enriched context expected to be available".into())
        })
    }

    pub fn take_checklist(&mut self) -> Result<DynamicChecklist, AppError> {
        self.checklist
            .take()
            .ok_or_else(|| AppError::InternalError("checklist expected to be available".into()))
    }

    pub fn abort(&mut self, err: AppError) -> AppError {
        error!(
            alert_id = %self.alert_id,
            correlation_id = %self.correlation_id,
            error = %err,
            "alert pipeline aborted"
        );
        err
    }
}
