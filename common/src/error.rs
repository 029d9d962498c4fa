use async_openai::error::OpenAIError;
use thiserror::Error;
use tokio::task::JoinError;

// Core internal errors
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] surrealdb::Error),
    #[error("LLM transport error: {0}")]
    OpenAI(#[from] OpenAIError),
    #[error("Object storage error: {0}")]
    ObjectStore(#[from] object_store::Error),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Upstream unavailable: {0}")]
    Upstream(String),
    #[error("Timed out: {0}")]
    Timeout(String),
    #[error("LLM parsing error: {0}")]
    LLMParsing(String),
    #[error("Task join error: {0}")]
    Join(#[from] JoinError),
    #[error("IoError: {0}")]
    Io(#[from] std::io::Error),
    #[error("Reqwest error: {0}")]
    Reqwest(#[from] reqwest::Error),
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("{stage} stage failed: {source}")]
    PipelineStage {
        stage: &'static str,
        #[source]
        source: Box<AppError>,
    },
    #[error("Internal service error: {0}")]
    InternalError(String),
}

impl AppError {
    /// Wraps an error with the identity of the pipeline stage it came from.
    pub fn in_stage(self, stage: &'static str) -> Self {
        match self {
            already @ AppError::PipelineStage { .. } => already,
            other => AppError::PipelineStage {
                stage,
                source: Box::new(other),
            },
        }
    }

    /// The stage name carried by a pipeline-stage wrapper, if any.
    pub fn stage(&self) -> Option<&'static str> {
        match self {
            AppError::PipelineStage { stage, .. } => Some(stage),
            _ => None,
        }
    }
}
