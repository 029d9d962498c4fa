pub mod destinations;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;
use tokio::sync::RwLock;
use tokio::time::timeout;
use tracing::{debug, info, instrument, warn};

use common::{
    error::AppError,
    types::alert::AlertSeverity,
    types::checklist::DynamicChecklist,
    types::webhook::{WebhookConfig, WebhookKind, WebhookResult},
    utils::config::AppConfig,
};

use destinations::{
    FileDestination, GenericDestination, PagerDutyDestination, SlackDestination,
};

/// One egress endpoint. `send` performs exactly one outbound delivery per
/// checklist; retries, if ever added, belong inside an implementation.
#[async_trait]
pub trait Destination: Send + Sync {
    fn config(&self) -> &WebhookConfig;

    async fn send(
        &self,
        checklist: &DynamicChecklist,
        severity: AlertSeverity,
    ) -> Result<WebhookResult, AppError>;
}

/// Fans a checklist out to every configured destination concurrently.
///
/// The dispatcher owns its destination list exclusively. A leg that fails or
/// overruns its deadline becomes a failure `WebhookResult`, never an error of
/// the dispatch itself.
pub struct WebhookDispatcher {
    destinations: RwLock<Vec<Arc<dyn Destination>>>,
    send_timeout: Duration,
    client: reqwest::Client,
}

impl WebhookDispatcher {
    pub fn new(send_timeout: Duration) -> Result<Self, AppError> {
        let client = reqwest::Client::builder().timeout(send_timeout).build()?;
        Ok(Self {
            destinations: RwLock::new(Vec::new()),
            send_timeout,
            client,
        })
    }

    /// Builds the dispatcher from `output.webhooks` plus the optional file
    /// sink. Duplicate names in configuration fail startup.
    pub async fn from_config(cfg: &AppConfig) -> Result<Self, AppError> {
        let dispatcher = Self::new(Duration::from_secs(cfg.dispatch.timeout_secs))?;

        for webhook in &cfg.output.webhooks {
            dispatcher.register(webhook.clone()).await?;
        }

        if cfg.output.file.enabled {
            dispatcher
                .register(WebhookConfig {
                    name: cfg.output.file.name.clone(),
                    kind: WebhookKind::File,
                    url: cfg.output.file.output_directory.clone(),
                    enabled: true,
                    headers: Default::default(),
                    filter: Vec::new(),
                })
                .await?;
        }

        Ok(dispatcher)
    }

    /// Registers a destination at runtime; the name must be unique.
    pub async fn register(&self, config: WebhookConfig) -> Result<WebhookConfig, AppError> {
        config.validate()?;

        let destination = self.build_destination(config)?;
        let mut destinations = self.destinations.write().await;
        if destinations
            .iter()
            .any(|existing| existing.config().name == destination.config().name)
        {
            return Err(AppError::Conflict(format!(
                "webhook '{}' is already registered",
                destination.config().name
            )));
        }

        let registered = destination.config().clone();
        info!(name = %registered.name, kind = ?registered.kind, "webhook destination registered");
        destinations.push(destination);
        Ok(registered)
    }

    /// Registers a caller-built destination; used by tests.
    pub async fn register_destination(
        &self,
        destination: Arc<dyn Destination>,
    ) -> Result<(), AppError> {
        let mut destinations = self.destinations.write().await;
        if destinations
            .iter()
            .any(|existing| existing.config().name == destination.config().name)
        {
            return Err(AppError::Conflict(format!(
                "webhook '{}' is already registered",
                destination.config().name
            )));
        }
        destinations.push(destination);
        Ok(())
    }

    pub async fn configs(&self) -> Vec<WebhookConfig> {
        self.destinations
            .read()
            .await
            .iter()
            .map(|destination| destination.config().clone())
            .collect()
    }

    /// Delivers the checklist to every enabled destination whose severity
    /// filter accepts the originating alert. Resolves once all selected legs
    /// have terminated or timed out; leg order is not meaningful.
    #[instrument(skip_all, fields(alert_id = %checklist.alert_id, severity = %severity))]
    pub async fn dispatch(
        &self,
        checklist: &DynamicChecklist,
        severity: AlertSeverity,
    ) -> Vec<WebhookResult> {
        let selected: Vec<Arc<dyn Destination>> = self
            .destinations
            .read()
            .await
            .iter()
            .filter(|destination| destination.config().accepts(severity))
            .map(Arc::clone)
            .collect();

        debug!(selected = selected.len(), "dispatching checklist");

        let legs = selected.into_iter().map(|destination| {
            let name = destination.config().name.clone();
            async move {
                match timeout(self.send_timeout, destination.send(checklist, severity)).await {
                    Ok(Ok(result)) => result,
                    Ok(Err(err)) => {
                        warn!(destination = %name, error = %err, "webhook delivery failed");
                        WebhookResult::failure(name, None, err.to_string())
                    }
                    Err(_) => {
                        warn!(destination = %name, "webhook delivery timed out");
                        WebhookResult::failure(
                            name,
                            None,
                            format!("timed out after {}s", self.send_timeout.as_secs()),
                        )
                    }
                }
            }
        });

        join_all(legs).await
    }

    fn build_destination(&self, config: WebhookConfig) -> Result<Arc<dyn Destination>, AppError> {
        let destination: Arc<dyn Destination> = match config.kind {
            WebhookKind::Slack => Arc::new(SlackDestination::new(config, self.client.clone())),
            WebhookKind::Pagerduty => {
                Arc::new(PagerDutyDestination::new(config, self.client.clone()))
            }
            WebhookKind::Generic => Arc::new(GenericDestination::new(config, self.client.clone())),
            WebhookKind::File => Arc::new(FileDestination::new(config)?),
        };
        Ok(destination)
    }
}
