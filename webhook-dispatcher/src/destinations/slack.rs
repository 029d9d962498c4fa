use std::fmt::Write;

use async_trait::async_trait;
use serde::Serialize;
use tracing::debug;

use common::{
    error::AppError,
    types::alert::AlertSeverity,
    types::checklist::{DynamicChecklist, StepPriority},
    types::webhook::{WebhookConfig, WebhookResult},
};

use crate::Destination;

/// Posts the checklist as a Slack incoming-webhook message.
pub struct SlackDestination {
    config: WebhookConfig,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct SlackMessage {
    text: String,
}

impl SlackDestination {
    pub fn new(config: WebhookConfig, client: reqwest::Client) -> Self {
        Self { config, client }
    }
}

/// Renders the checklist in Slack mrkdwn.
pub fn format_message(checklist: &DynamicChecklist, severity: AlertSeverity) -> String {
    let mut text = String::new();
    let _ = writeln!(
        text,
        "*[{severity}] Troubleshooting checklist for alert {}*",
        checklist.alert_id
    );
    let _ = writeln!(text, "_{}_", checklist.summary);

    for step in &checklist.steps {
        let marker = match step.priority {
            StepPriority::High => " :red_circle:",
            StepPriority::Medium => "",
            StepPriority::Low => " :white_circle:",
        };
        let _ = writeln!(text, "{}. {}{marker}", step.order, step.instruction);
        for command in &step.commands {
            let _ = writeln!(text, "    `{command}`");
        }
    }

    if !checklist.source_runbooks.is_empty() {
        let _ = writeln!(text, "Sources: {}", checklist.source_runbooks.join(", "));
    }
    text
}

#[async_trait]
impl Destination for SlackDestination {
    fn config(&self) -> &WebhookConfig {
        &self.config
    }

    async fn send(
        &self,
        checklist: &DynamicChecklist,
        severity: AlertSeverity,
    ) -> Result<WebhookResult, AppError> {
        let message = SlackMessage {
            text: format_message(checklist, severity),
        };

        let mut request = self.client.post(&self.config.url).json(&message);
        for (name, value) in &self.config.headers {
            request = request.header(name, value);
        }

        debug!(destination = %self.config.name, "POST slack webhook");
        let response = request.send().await?;
        let code = response.status().as_u16();

        if response.status().is_success() {
            Ok(WebhookResult::success(self.config.name.clone(), Some(code)))
        } else {
            Ok(WebhookResult::failure(
                self.config.name.clone(),
                Some(code),
                format!("slack webhook returned {code}"),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use common::types::checklist::ChecklistStep;

    use super::*;

    #[test]
    fn test_format_includes_steps_commands_and_sources() {
        let checklist = DynamicChecklist {
            alert_id: "a-1".into(),
            summary: "memory pressure".into(),
            steps: vec![
                ChecklistStep {
                    order: 1,
                    instruction: "check memory".into(),
                    rationale: None,
                    current_value: None,
                    expected_value: None,
                    priority: StepPriority::High,
                    commands: vec!["free -h".into()],
                },
                ChecklistStep::new(2, "watch top".into()),
            ],
            source_runbooks: vec!["runbooks/memory.md".into()],
            generated_at: Utc::now(),
            llm_provider_id: "stub".into(),
        };

        let text = format_message(&checklist, AlertSeverity::Warning);
        assert!(text.contains("[WARNING]"));
        assert!(text.contains("alert a-1"));
        assert!(text.contains("1. check memory :red_circle:"));
        assert!(text.contains("`free -h`"));
        assert!(text.contains("2. watch top"));
        assert!(text.contains("Sources: runbooks/memory.md"));
    }
}
