use async_trait::async_trait;
use tracing::debug;

use common::{
    error::AppError,
    types::alert::AlertSeverity,
    types::checklist::DynamicChecklist,
    types::webhook::{WebhookConfig, WebhookResult},
};

use crate::Destination;

/// Posts the checklist JSON unchanged with the configured headers. The
/// catch-all sink for anything speaking plain webhooks.
pub struct GenericDestination {
    config: WebhookConfig,
    client: reqwest::Client,
}

impl GenericDestination {
    pub fn new(config: WebhookConfig, client: reqwest::Client) -> Self {
        Self { config, client }
    }
}

#[async_trait]
impl Destination for GenericDestination {
    fn config(&self) -> &WebhookConfig {
        &self.config
    }

    async fn send(
        &self,
        checklist: &DynamicChecklist,
        _severity: AlertSeverity,
    ) -> Result<WebhookResult, AppError> {
        let mut request = self.client.post(&self.config.url).json(checklist);
        for (name, value) in &self.config.headers {
            request = request.header(name, value);
        }

        debug!(destination = %self.config.name, url = %self.config.url, "POST generic webhook");
        let response = request.send().await?;
        let code = response.status().as_u16();

        if response.status().is_success() {
            Ok(WebhookResult::success(self.config.name.clone(), Some(code)))
        } else {
            Ok(WebhookResult::failure(
                self.config.name.clone(),
                Some(code),
                format!("webhook returned {code}"),
            ))
        }
    }
}
