use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Severity of an incoming alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AlertSeverity {
    Critical,
    Warning,
    Info,
}

impl AlertSeverity {
    pub const ALL: [AlertSeverity; 3] = [
        AlertSeverity::Critical,
        AlertSeverity::Warning,
        AlertSeverity::Info,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AlertSeverity::Critical => "CRITICAL",
            AlertSeverity::Warning => "WARNING",
            AlertSeverity::Info => "INFO",
        }
    }

    /// Parses the uppercase wire form.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "CRITICAL" => Some(AlertSeverity::Critical),
            "WARNING" => Some(AlertSeverity::Warning),
            "INFO" => Some(AlertSeverity::Info),
            _ => None,
        }
    }
}

impl fmt::Display for AlertSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canonical ingress record. Dimensions and labels are immutable once the
/// alert is constructed; callers get borrowed views.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    id: String,
    title: String,
    #[serde(default)]
    message: String,
    severity: AlertSeverity,
    #[serde(default)]
    source_service: String,
    #[serde(default)]
    dimensions: BTreeMap<String, String>,
    #[serde(default)]
    labels: BTreeMap<String, String>,
    timestamp: DateTime<Utc>,
    #[serde(default)]
    raw_payload: serde_json::Value,
}

impl Alert {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: String,
        title: String,
        message: String,
        severity: AlertSeverity,
        source_service: String,
        dimensions: BTreeMap<String, String>,
        labels: BTreeMap<String, String>,
        timestamp: DateTime<Utc>,
        raw_payload: serde_json::Value,
    ) -> Self {
        Self {
            id,
            title,
            message,
            severity,
            source_service,
            dimensions,
            labels,
            timestamp,
            raw_payload,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn severity(&self) -> AlertSeverity {
        self.severity
    }

    pub fn source_service(&self) -> &str {
        &self.source_service
    }

    pub fn dimensions(&self) -> &BTreeMap<String, String> {
        &self.dimensions
    }

    pub fn labels(&self) -> &BTreeMap<String, String> {
        &self.labels
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn raw_payload(&self) -> &serde_json::Value {
        &self.raw_payload
    }

    pub fn dimension(&self, key: &str) -> Option<&str> {
        self.dimensions.get(key).map(String::as_str)
    }

    /// Resolves the compute resource this alert targets: `resourceId` with an
    /// `instanceId` fallback.
    pub fn resource_id(&self) -> Option<&str> {
        self.dimension("resourceId").or_else(|| self.dimension("instanceId"))
    }
}
