use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::time::timeout;
use tracing::{debug, instrument, warn};

use common::{
    error::AppError,
    llm::{GenerationOptions, LlmProvider},
    types::checklist::{ChecklistStep, DynamicChecklist},
    types::context::EnrichedContext,
    utils::config::LlmSettings,
};
use retrieval_pipeline::RetrievedChunk;

use crate::parser::parse_response;
use crate::prompt::build_prompt;

const SUMMARY_MAX_CHARS: usize = 200;

const FALLBACK_INSTRUCTION: &str = "Structured steps could not be recovered from the \
model response. Review the raw model output and fall back on general \
troubleshooting practice for this alert.";

/// Turns an enriched context plus retrieved chunks into a checklist.
///
/// Model output that matches neither dialect degrades to a single fallback
/// step; only transport failures and deadline overruns are errors.
pub struct ChecklistGenerator {
    llm: Arc<dyn LlmProvider>,
    options: GenerationOptions,
    generation_timeout: Duration,
}

impl ChecklistGenerator {
    pub fn new(
        llm: Arc<dyn LlmProvider>,
        options: GenerationOptions,
        generation_timeout: Duration,
    ) -> Self {
        Self {
            llm,
            options,
            generation_timeout,
        }
    }

    pub fn from_settings(llm: Arc<dyn LlmProvider>, settings: &LlmSettings) -> Result<Self, AppError> {
        let options = GenerationOptions::new(settings.temperature, settings.max_tokens)?;
        Ok(Self::new(
            llm,
            options,
            Duration::from_secs(settings.generation_timeout_secs),
        ))
    }

    #[instrument(skip_all, fields(alert_id = %context.alert().id(), chunks = chunks.len()))]
    pub async fn generate(
        &self,
        context: &EnrichedContext,
        chunks: &[RetrievedChunk],
    ) -> Result<DynamicChecklist, AppError> {
        let prompt = build_prompt(context, chunks);

        let response = timeout(
            self.generation_timeout,
            self.llm.generate_text(&prompt, &self.options),
        )
        .await
        .map_err(|_| {
            AppError::Timeout(format!(
                "llm text generation exceeded {}s",
                self.generation_timeout.as_secs()
            ))
        })??;

        let parsed = parse_response(&response);
        let steps = if parsed.steps.is_empty() {
            warn!(
                alert_id = %context.alert().id(),
                "model response matched neither dialect; emitting fallback step"
            );
            vec![ChecklistStep::new(1, FALLBACK_INSTRUCTION.to_string())]
        } else {
            parsed.steps
        };

        let summary = parsed
            .summary
            .unwrap_or_else(|| derive_summary(&response));

        debug!(steps = steps.len(), "checklist assembled");

        Ok(DynamicChecklist {
            alert_id: context.alert().id().to_string(),
            summary,
            steps,
            source_runbooks: source_runbooks(chunks),
            generated_at: Utc::now(),
            llm_provider_id: self.llm.provider_id().to_string(),
        })
    }
}

/// First non-empty line of the response, truncated to 200 characters with an
/// ellipsis.
fn derive_summary(response: &str) -> String {
    let line = response
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or_default();

    if line.chars().count() <= SUMMARY_MAX_CHARS {
        line.to_string()
    } else {
        let mut truncated: String = line.chars().take(SUMMARY_MAX_CHARS).collect();
        truncated.push('…');
        truncated
    }
}

/// Distinct runbook paths cited by the input chunks, in order of first
/// appearance.
fn source_runbooks(chunks: &[RetrievedChunk]) -> Vec<String> {
    let mut paths = Vec::new();
    for retrieved in chunks {
        let path = retrieved.chunk.runbook_path();
        if !paths.iter().any(|existing| existing == path) {
            paths.push(path.to_string());
        }
    }
    paths
}
