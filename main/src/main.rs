use std::sync::Arc;

use api_router::{api_routes_v1, api_state::ApiState};
use axum::{extract::FromRef, Router};
use common::{
    adapters::{default_normalizers, CloudAdapters},
    llm::{llm_provider_from_config, LlmProvider},
    storage::store::RunbookStore,
    utils::{config::get_config, embedding::EmbeddingService},
    vector::vector_store_from_config,
};
use ingestion_pipeline::{ChunkerConfig, IngestionService};
use retrieval_pipeline::Retriever;
use synthesis_pipeline::{
    AlertPipeline, ChecklistGenerator, DefaultPipelineServices, EnrichmentService,
};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use webhook_dispatcher::WebhookDispatcher;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Set up tracing
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env())
        .try_init()
        .ok();

    // Get config; startup dies on a misconfigured provider or LLM params.
    let config = get_config()?;

    // Three independent provider axes: cloud adapters, vector store, LLM.
    let llm = llm_provider_from_config(&config)?;
    let vector_store = vector_store_from_config(&config, llm.embedding_dimension()).await?;
    let adapters = CloudAdapters::from_config(&config)?;
    let storage = RunbookStore::new(&config).await?;

    info!(
        cloud = ?config.cloud.provider,
        vector_store = ?config.vector_store.provider,
        llm = llm.provider_id(),
        embedding_dimension = llm.embedding_dimension(),
        "providers initialized"
    );

    let embedding = EmbeddingService::new(Arc::clone(&llm));
    let ingestion = Arc::new(IngestionService::new(
        storage,
        Arc::clone(&vector_store),
        Arc::clone(&llm),
        ChunkerConfig::new(
            config.runbooks.min_chunk_size,
            config.runbooks.max_chunk_size,
        ),
        config.runbooks.ingest_concurrency,
    ));

    let enrichment = EnrichmentService::from_settings(adapters, &config.enrichment);
    let retriever = Retriever::new(embedding, Arc::clone(&vector_store));
    let generator = ChecklistGenerator::from_settings(Arc::clone(&llm), &config.llm)?;
    let pipeline = Arc::new(AlertPipeline::new(Arc::new(DefaultPipelineServices::new(
        enrichment, retriever, generator,
    ))));

    let dispatcher = Arc::new(WebhookDispatcher::from_config(&config).await?);

    let api_state = ApiState {
        pipeline,
        dispatcher,
        ingestion: Arc::clone(&ingestion),
        normalizers: default_normalizers(),
        vector_store,
        config: config.clone(),
    };

    // Seed the index in the background; the server must not block on it.
    if config.runbooks.ingest_on_startup {
        tokio::spawn(async move {
            match ingestion.ingest_all(None).await {
                Ok(report) => info!(
                    documents = report.documents_processed,
                    chunks = report.chunks_stored,
                    failed = report.errors.len(),
                    "startup runbook ingestion finished"
                ),
                Err(err) => warn!(
                    error = %err,
                    "startup runbook ingestion failed; serving with an empty index"
                ),
            }
        });
    }

    // Create Axum router
    let app = Router::new()
        .nest("/api/v1", api_routes_v1())
        .with_state(AppState { api_state });

    info!("Starting server listening on 0.0.0.0:{}", config.http_port);
    let serve_address = format!("0.0.0.0:{}", config.http_port);
    let listener = tokio::net::TcpListener::bind(serve_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[derive(Clone, FromRef)]
struct AppState {
    api_state: ApiState,
}
