use std::sync::Arc;

use common::{
    adapters::NormalizerRegistry, utils::config::AppConfig, vector::VectorStoreRepository,
};
use ingestion_pipeline::IngestionService;
use synthesis_pipeline::AlertPipeline;
use webhook_dispatcher::WebhookDispatcher;

/// Everything the API handlers need, built once at startup.
#[derive(Clone)]
pub struct ApiState {
    pub pipeline: Arc<AlertPipeline>,
    pub dispatcher: Arc<WebhookDispatcher>,
    pub ingestion: Arc<IngestionService>,
    pub normalizers: NormalizerRegistry,
    pub vector_store: Arc<dyn VectorStoreRepository>,
    pub config: AppConfig,
}
