use async_trait::async_trait;
use serde::Serialize;
use tracing::debug;

use common::{
    error::AppError,
    types::alert::AlertSeverity,
    types::checklist::DynamicChecklist,
    types::webhook::{WebhookConfig, WebhookResult},
};

use crate::Destination;

const ROUTING_KEY_HEADER: &str = "routingKey";

/// Enqueues a PagerDuty Events v2 trigger carrying the checklist as custom
/// details. The routing key comes from the destination's `routingKey` header.
pub struct PagerDutyDestination {
    config: WebhookConfig,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct EventsV2Request<'a> {
    routing_key: &'a str,
    event_action: &'static str,
    dedup_key: String,
    payload: EventsV2Payload<'a>,
}

#[derive(Serialize)]
struct EventsV2Payload<'a> {
    summary: &'a str,
    source: &'static str,
    severity: &'static str,
    custom_details: &'a DynamicChecklist,
}

impl PagerDutyDestination {
    pub fn new(config: WebhookConfig, client: reqwest::Client) -> Self {
        Self { config, client }
    }
}

pub fn pagerduty_severity(severity: AlertSeverity) -> &'static str {
    match severity {
        AlertSeverity::Critical => "critical",
        AlertSeverity::Warning => "warning",
        AlertSeverity::Info => "info",
    }
}

#[async_trait]
impl Destination for PagerDutyDestination {
    fn config(&self) -> &WebhookConfig {
        &self.config
    }

    async fn send(
        &self,
        checklist: &DynamicChecklist,
        severity: AlertSeverity,
    ) -> Result<WebhookResult, AppError> {
        let Some(routing_key) = self.config.headers.get(ROUTING_KEY_HEADER) else {
            return Ok(WebhookResult::failure(
                self.config.name.clone(),
                None,
                "pagerduty destination is missing the routingKey header",
            ));
        };

        let body = EventsV2Request {
            routing_key,
            event_action: "trigger",
            dedup_key: format!("runbook-synthesizer-{}", checklist.alert_id),
            payload: EventsV2Payload {
                summary: &checklist.summary,
                source: "runbook-synthesizer",
                severity: pagerduty_severity(severity),
                custom_details: checklist,
            },
        };

        debug!(destination = %self.config.name, "POST pagerduty events v2");
        let response = self.client.post(&self.config.url).json(&body).send().await?;
        let code = response.status().as_u16();

        if response.status().is_success() {
            Ok(WebhookResult::success(self.config.name.clone(), Some(code)))
        } else {
            Ok(WebhookResult::failure(
                self.config.name.clone(),
                Some(code),
                format!("pagerduty returned {code}"),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_mapping_covers_all_levels() {
        assert_eq!(pagerduty_severity(AlertSeverity::Critical), "critical");
        assert_eq!(pagerduty_severity(AlertSeverity::Warning), "warning");
        assert_eq!(pagerduty_severity(AlertSeverity::Info), "info");
    }
}
