use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::alert::AlertSeverity;

/// Kind of egress destination a webhook config describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WebhookKind {
    Slack,
    Pagerduty,
    Generic,
    File,
}

/// One configured egress destination. Immutable after registration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookConfig {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: WebhookKind,
    /// Endpoint URL, or the output directory for the file sink.
    pub url: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    /// Severities this destination accepts; empty means all.
    #[serde(default)]
    pub filter: Vec<AlertSeverity>,
}

impl WebhookConfig {
    /// Whether a checklist generated from an alert of `severity` should be
    /// delivered to this destination.
    pub fn accepts(&self, severity: AlertSeverity) -> bool {
        self.enabled && (self.filter.is_empty() || self.filter.contains(&severity))
    }

    /// HTTP destinations must carry a parseable http(s) URL; the file sink's
    /// `url` is a directory path and only needs to be non-empty.
    pub fn validate(&self) -> Result<(), crate::error::AppError> {
        use crate::error::AppError;

        if self.name.trim().is_empty() {
            return Err(AppError::Validation("webhook name must not be empty".into()));
        }

        match self.kind {
            WebhookKind::File => {
                if self.url.trim().is_empty() {
                    return Err(AppError::Validation(format!(
                        "webhook '{}' needs an output directory in url",
                        self.name
                    )));
                }
            }
            _ => {
                let parsed = url::Url::parse(&self.url).map_err(|e| {
                    AppError::Validation(format!("webhook '{}' url is invalid: {e}", self.name))
                })?;
                if parsed.scheme() != "http" && parsed.scheme() != "https" {
                    return Err(AppError::Validation(format!(
                        "webhook '{}' url must be http or https",
                        self.name
                    )));
                }
            }
        }
        Ok(())
    }
}

fn default_enabled() -> bool {
    true
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum WebhookStatus {
    Success,
    Failure,
}

/// Outcome of one delivery attempt to one destination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookResult {
    pub destination_name: String,
    pub status: WebhookStatus,
    #[serde(default)]
    pub http_code: Option<u16>,
    #[serde(default)]
    pub error: Option<String>,
}

impl WebhookResult {
    pub fn success(destination_name: impl Into<String>, http_code: Option<u16>) -> Self {
        Self {
            destination_name: destination_name.into(),
            status: WebhookStatus::Success,
            http_code,
            error: None,
        }
    }

    pub fn failure(
        destination_name: impl Into<String>,
        http_code: Option<u16>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            destination_name: destination_name.into(),
            status: WebhookStatus::Failure,
            http_code,
            error: Some(error.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(filter: Vec<AlertSeverity>, enabled: bool) -> WebhookConfig {
        WebhookConfig {
            name: "ops-channel".into(),
            kind: WebhookKind::Slack,
            url: "https://hooks.slack.example/T000".into(),
            enabled,
            headers: BTreeMap::new(),
            filter,
        }
    }

    #[test]
    fn test_empty_filter_accepts_all_severities() {
        let cfg = config(Vec::new(), true);
        for severity in AlertSeverity::ALL {
            assert!(cfg.accepts(severity));
        }
    }

    #[test]
    fn test_filter_restricts_severities() {
        let cfg = config(vec![AlertSeverity::Critical], true);
        assert!(cfg.accepts(AlertSeverity::Critical));
        assert!(!cfg.accepts(AlertSeverity::Warning));
        assert!(!cfg.accepts(AlertSeverity::Info));
    }

    #[test]
    fn test_disabled_destination_accepts_nothing() {
        let cfg = config(Vec::new(), false);
        assert!(!cfg.accepts(AlertSeverity::Critical));
    }

    #[test]
    fn test_validate_rejects_non_http_urls() {
        let mut cfg = config(Vec::new(), true);
        cfg.validate().expect("https url is fine");

        cfg.url = "ftp://example.com/hook".into();
        assert!(cfg.validate().is_err());

        cfg.url = "not a url".into();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_validate_accepts_file_sink_directory() {
        let cfg = WebhookConfig {
            name: "file".into(),
            kind: WebhookKind::File,
            url: "./checklists".into(),
            enabled: true,
            headers: BTreeMap::new(),
            filter: Vec::new(),
        };
        cfg.validate().expect("directory path is fine");
    }

    #[test]
    fn test_config_serde_uses_type_field() {
        let cfg = config(vec![AlertSeverity::Warning], true);
        let value = serde_json::to_value(&cfg).expect("serialize config");
        assert_eq!(value["type"], "slack");
        assert_eq!(value["filter"][0], "WARNING");
        let back: WebhookConfig = serde_json::from_value(value).expect("deserialize config");
        assert_eq!(back, cfg);
    }
}
