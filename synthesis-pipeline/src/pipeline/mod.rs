mod context;
mod services;
mod state;

#[allow(clippy::module_name_repetitions)]
pub use services::{DefaultPipelineServices, PipelineServices};

use std::sync::Arc;
use std::time::Instant;

use state_machines::core::GuardError;
use tracing::{info, instrument};
use uuid::Uuid;

use common::{
    error::AppError,
    types::alert::Alert,
    types::checklist::DynamicChecklist,
};

use self::context::PipelineContext;
use self::state::{ready, Enriched, Ready, Retrieved, SynthesisMachine};

/// Orchestrates one alert through enrich → retrieve → generate.
///
/// Each stage's error propagates wrapped with the stage identity; the
/// typestate machine makes a skipped or reordered stage unrepresentable.
pub struct AlertPipeline {
    services: Arc<dyn PipelineServices>,
}

impl AlertPipeline {
    pub fn new(services: Arc<dyn PipelineServices>) -> Self {
        Self { services }
    }

    #[instrument(skip_all, fields(alert_id = %alert.id(), top_k))]
    pub async fn process_alert(
        &self,
        alert: Alert,
        top_k: usize,
        correlation_id: Option<String>,
    ) -> Result<DynamicChecklist, AppError> {
        if alert.id().trim().is_empty() || alert.title().trim().is_empty() {
            return Err(AppError::Validation(
                "alert id and title must be non-empty".into(),
            ));
        }
        let correlation_id = correlation_id.unwrap_or_else(|| Uuid::new_v4().to_string());

        let mut ctx = PipelineContext::new(&alert, correlation_id, top_k, self.services.as_ref());
        let machine = ready();

        let pipeline_started = Instant::now();

        let stage_start = Instant::now();
        let machine = enrich(machine, &mut ctx)
            .await
            .map_err(|err| ctx.abort(err))?;
        let enrich_ms = stage_start.elapsed().as_millis() as u64;

        let stage_start = Instant::now();
        let machine = retrieve(machine, &mut ctx)
            .await
            .map_err(|err| ctx.abort(err))?;
        let retrieve_ms = stage_start.elapsed().as_millis() as u64;

        let stage_start = Instant::now();
        let _machine = generate(machine, &mut ctx)
            .await
            .map_err(|err| ctx.abort(err))?;
        let generate_ms = stage_start.elapsed().as_millis() as u64;

        let checklist = ctx.take_checklist()?;

        info!(
            alert_id = %ctx.alert_id,
            correlation_id = %ctx.correlation_id,
            total_ms = pipeline_started.elapsed().as_millis() as u64,
            enrich_ms,
            retrieve_ms,
            generate_ms,
            steps = checklist.steps.len(),
            "alert pipeline finished"
        );

        Ok(checklist)
    }
}

async fn enrich(
    machine: SynthesisMachine<(), Ready>,
    ctx: &mut PipelineContext<'_>,
) -> Result<SynthesisMachine<(), Enriched>, AppError> {
    let enriched = ctx
        .services
        .enrich(ctx.alert.clone())
        .await
        .map_err(|err| err.in_stage("enrich"))?;
    ctx.enriched = Some(enriched);

    machine
        .enrich()
        .map_err(|(_, guard)| map_guard_error("enrich", &guard))
}

async fn retrieve(
    machine: SynthesisMachine<(), Enriched>,
    ctx: &mut PipelineContext<'_>,
) -> Result<SynthesisMachine<(), Retrieved>, AppError> {
    let top_k = ctx.top_k;
    let chunks = {
        let enriched = ctx.enriched()?;
        ctx.services
            .retrieve(enriched, top_k)
            .await
            .map_err(|err| err.in_stage("retrieve"))?
    };
    ctx.chunks = chunks;

    machine
        .retrieve()
        .map_err(|(_, guard)| map_guard_error("retrieve", &guard))
}

async fn generate(
    machine: SynthesisMachine<(), Retrieved>,
    ctx: &mut PipelineContext<'_>,
) -> Result<SynthesisMachine<(), state::Generated>, AppError> {
    let checklist = {
        let enriched = ctx.enriched()?;
        ctx.services
            .generate(enriched, &ctx.chunks)
            .await
            .map_err(|err| err.in_stage("generate"))?
    };
    ctx.checklist = Some(checklist);

    machine
        .generate()
        .map_err(|(_, guard)| map_guard_error("generate", &guard))
}

fn map_guard_error(event: &str, guard: &GuardError) -> AppError {
    AppError::InternalError(format!(
        "invalid alert pipeline transition during {event}: {guard:?}"
    ))
}

#[cfg(test)]
mod tests;
