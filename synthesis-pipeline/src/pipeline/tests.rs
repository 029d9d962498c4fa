use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use common::{
    error::AppError,
    types::alert::{Alert, AlertSeverity},
    types::checklist::{ChecklistStep, DynamicChecklist},
    types::context::EnrichedContext,
};
use retrieval_pipeline::RetrievedChunk;

use super::{AlertPipeline, PipelineServices};

struct MockServices {
    fail_stage: Option<&'static str>,
    calls: Mutex<Vec<&'static str>>,
}

impl MockServices {
    fn new() -> Self {
        Self {
            fail_stage: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    fn failing_at(stage: &'static str) -> Self {
        Self {
            fail_stage: Some(stage),
            calls: Mutex::new(Vec::new()),
        }
    }

    async fn record(&self, stage: &'static str) -> Result<(), AppError> {
        self.calls.lock().await.push(stage);
        if self.fail_stage == Some(stage) {
            return Err(AppError::Upstream(format!("{stage} backend down")));
        }
        Ok(())
    }
}

#[async_trait]
impl PipelineServices for MockServices {
    async fn enrich(&self, alert: Alert) -> Result<EnrichedContext, AppError> {
        self.record("enrich").await?;
        Ok(EnrichedContext::bare(alert))
    }

    async fn retrieve(
        &self,
        _context: &EnrichedContext,
        _top_k: usize,
    ) -> Result<Vec<RetrievedChunk>, AppError> {
        self.record("retrieve").await?;
        Ok(Vec::new())
    }

    async fn generate(
        &self,
        context: &EnrichedContext,
        _chunks: &[RetrievedChunk],
    ) -> Result<DynamicChecklist, AppError> {
        self.record("generate").await?;
        Ok(DynamicChecklist {
            alert_id: context.alert().id().to_string(),
            summary: "mock summary".into(),
            steps: vec![ChecklistStep::new(1, "check things".into())],
            source_runbooks: Vec::new(),
            generated_at: Utc::now(),
            llm_provider_id: "mock".into(),
        })
    }
}

fn alert(id: &str, title: &str) -> Alert {
    Alert::new(
        id.into(),
        title.into(),
        String::new(),
        AlertSeverity::Warning,
        String::new(),
        BTreeMap::new(),
        BTreeMap::new(),
        Utc::now(),
        serde_json::Value::Null,
    )
}

#[tokio::test]
async fn test_stages_run_in_order() {
    let services = Arc::new(MockServices::new());
    let pipeline = AlertPipeline::new(Arc::clone(&services) as Arc<dyn PipelineServices>);

    let checklist = pipeline
        .process_alert(alert("a-1", "t"), 5, None)
        .await
        .expect("pipeline succeeds");

    assert_eq!(checklist.alert_id, "a-1");
    let calls = services.calls.lock().await.clone();
    assert_eq!(calls, vec!["enrich", "retrieve", "generate"]);
}

#[tokio::test]
async fn test_retrieve_failure_stops_before_generate() {
    let services = Arc::new(MockServices::failing_at("retrieve"));
    let pipeline = AlertPipeline::new(Arc::clone(&services) as Arc<dyn PipelineServices>);

    let err = pipeline
        .process_alert(alert("a-1", "t"), 5, None)
        .await
        .expect_err("retrieve failure propagates");

    assert_eq!(err.stage(), Some("retrieve"));
    let calls = services.calls.lock().await.clone();
    assert_eq!(calls, vec!["enrich", "retrieve"]);
}

#[tokio::test]
async fn test_generate_failure_carries_stage_identity() {
    let services = Arc::new(MockServices::failing_at("generate"));
    let pipeline = AlertPipeline::new(Arc::clone(&services) as Arc<dyn PipelineServices>);

    let err = pipeline
        .process_alert(alert("a-1", "t"), 5, None)
        .await
        .expect_err("generate failure propagates");

    assert_eq!(err.stage(), Some("generate"));
    assert!(err.to_string().contains("generate"));
}

#[tokio::test]
async fn test_blank_alert_is_rejected_before_any_stage() {
    let services = Arc::new(MockServices::new());
    let pipeline = AlertPipeline::new(Arc::clone(&services) as Arc<dyn PipelineServices>);

    let err = pipeline
        .process_alert(alert("", "t"), 5, None)
        .await
        .expect_err("blank id rejected");
    assert!(matches!(err, AppError::Validation(_)));

    let err = pipeline
        .process_alert(alert("a-1", "  "), 5, None)
        .await
        .expect_err("blank title rejected");
    assert!(matches!(err, AppError::Validation(_)));

    assert!(services.calls.lock().await.is_empty());
}

#[tokio::test]
async fn test_caller_correlation_id_is_used() {
    let services = Arc::new(MockServices::new());
    let pipeline = AlertPipeline::new(services as Arc<dyn PipelineServices>);

    // Mainly asserting the call path accepts an externally supplied id.
    pipeline
        .process_alert(alert("a-1", "t"), 5, Some("corr-42".into()))
        .await
        .expect("pipeline succeeds");
}
