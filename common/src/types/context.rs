use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::alert::Alert;

/// What an enrichment adapter could resolve about the alert's target
/// resource. `None` at the call site when the resource does not exist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceMetadata {
    pub resource_id: String,
    pub display_name: String,
    #[serde(default)]
    pub compartment_or_account: String,
    #[serde(default)]
    pub shape: String,
    #[serde(default)]
    pub zone: String,
    #[serde(default)]
    pub freeform_tags: BTreeMap<String, String>,
    #[serde(default)]
    pub defined_tags: BTreeMap<String, String>,
}

/// One datapoint from a metrics backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricSnapshot {
    pub name: String,
    pub namespace: String,
    pub value: f64,
    #[serde(default)]
    pub unit: String,
    pub timestamp: DateTime<Utc>,
}

/// One entry from a log backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub level: String,
    pub message: String,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

/// An alert augmented with everything enrichment could gather. Collections
/// are fixed at construction; accessors expose borrowed views.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedContext {
    alert: Alert,
    resource: Option<ResourceMetadata>,
    recent_metrics: Vec<MetricSnapshot>,
    recent_logs: Vec<LogEntry>,
    custom_properties: BTreeMap<String, String>,
}

impl EnrichedContext {
    pub fn new(
        alert: Alert,
        resource: Option<ResourceMetadata>,
        recent_metrics: Vec<MetricSnapshot>,
        recent_logs: Vec<LogEntry>,
        custom_properties: BTreeMap<String, String>,
    ) -> Self {
        Self {
            alert,
            resource,
            recent_metrics,
            recent_logs,
            custom_properties,
        }
    }

    /// A context carrying nothing beyond the alert itself.
    pub fn bare(alert: Alert) -> Self {
        Self::new(alert, None, Vec::new(), Vec::new(), BTreeMap::new())
    }

    pub fn alert(&self) -> &Alert {
        &self.alert
    }

    pub fn resource(&self) -> Option<&ResourceMetadata> {
        self.resource.as_ref()
    }

    pub fn recent_metrics(&self) -> &[MetricSnapshot] {
        &self.recent_metrics
    }

    pub fn recent_logs(&self) -> &[LogEntry] {
        &self.recent_logs
    }

    pub fn custom_properties(&self) -> &BTreeMap<String, String> {
        &self.custom_properties
    }
}
