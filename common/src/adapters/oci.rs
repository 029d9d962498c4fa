//! Thin REST clients for the OCI core, monitoring, and logging-search APIs.
//!
//! These adapters speak plain JSON against configurable endpoints with a
//! static auth header; request signing is a deployment concern (an API
//! gateway or sidecar) per the collaborator contract.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::adapters::{ComputeMetadataAdapter, LogSourceAdapter, MetricsSourceAdapter};
use crate::error::AppError;
use crate::types::context::{LogEntry, MetricSnapshot, ResourceMetadata};
use crate::utils::config::OciSettings;

const COMPUTE_API_VERSION: &str = "20160918";
const MONITORING_API_VERSION: &str = "20180401";
const LOGGING_API_VERSION: &str = "20190909";
const METRICS_NAMESPACE: &str = "oci_computeagent";
const SUMMARIZED_METRICS: [&str; 2] = ["CpuUtilization", "MemoryUtilization"];

/// The three OCI adapters share one HTTP client and auth material.
pub struct OciAdapters {
    pub metadata: OciComputeMetadataAdapter,
    pub metrics: OciMetricsAdapter,
    pub logs: OciLogsAdapter,
}

#[derive(Clone)]
struct OciHttp {
    client: reqwest::Client,
    auth_header: Option<String>,
}

impl OciHttp {
    fn request(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.auth_header {
            Some(value) => builder.header("Authorization", value),
            None => builder,
        }
    }
}

impl OciAdapters {
    pub fn from_settings(settings: &OciSettings) -> Result<Self, AppError> {
        let compute_endpoint = require(settings.compute_endpoint.as_ref(), "oci.compute_endpoint")?;
        let monitoring_endpoint = require(
            settings.monitoring_endpoint.as_ref(),
            "oci.monitoring_endpoint",
        )?;
        let logging_endpoint = require(settings.logging_endpoint.as_ref(), "oci.logging_endpoint")?;
        let compartment_id = require(settings.compartment_id.as_ref(), "oci.compartment_id")?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        let http = OciHttp {
            client,
            auth_header: settings.auth_header.clone(),
        };

        Ok(Self {
            metadata: OciComputeMetadataAdapter {
                http: http.clone(),
                endpoint: compute_endpoint,
            },
            metrics: OciMetricsAdapter {
                http: http.clone(),
                endpoint: monitoring_endpoint,
                compartment_id: compartment_id.clone(),
            },
            logs: OciLogsAdapter {
                http,
                endpoint: logging_endpoint,
                compartment_id,
            },
        })
    }
}

fn require(value: Option<&String>, key: &str) -> Result<String, AppError> {
    value
        .filter(|v| !v.trim().is_empty())
        .map(|v| v.trim_end_matches('/').to_string())
        .ok_or_else(|| AppError::Config(format!("{key} is required for cloud.provider=oci")))
}

async fn upstream_error(context: &str, response: reqwest::Response) -> AppError {
    let status = response.status();
    let snippet: String = response
        .text()
        .await
        .unwrap_or_default()
        .chars()
        .take(240)
        .collect();
    AppError::Upstream(format!("{context} returned {status}: {snippet}"))
}

pub struct OciComputeMetadataAdapter {
    http: OciHttp,
    endpoint: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OciInstance {
    id: String,
    display_name: String,
    compartment_id: String,
    shape: String,
    availability_domain: String,
    #[serde(default)]
    freeform_tags: BTreeMap<String, String>,
    #[serde(default)]
    defined_tags: BTreeMap<String, BTreeMap<String, serde_json::Value>>,
}

impl From<OciInstance> for ResourceMetadata {
    fn from(instance: OciInstance) -> Self {
        let mut defined_tags = BTreeMap::new();
        for (namespace, tags) in instance.defined_tags {
            for (key, value) in tags {
                let rendered = match value {
                    serde_json::Value::String(s) => s,
                    other => other.to_string(),
                };
                defined_tags.insert(format!("{namespace}.{key}"), rendered);
            }
        }

        ResourceMetadata {
            resource_id: instance.id,
            display_name: instance.display_name,
            compartment_or_account: instance.compartment_id,
            shape: instance.shape,
            zone: instance.availability_domain,
            freeform_tags: instance.freeform_tags,
            defined_tags,
        }
    }
}

#[async_trait]
impl ComputeMetadataAdapter for OciComputeMetadataAdapter {
    fn provider_type(&self) -> &'static str {
        "oci"
    }

    async fn get_instance(
        &self,
        resource_id: &str,
    ) -> Result<Option<ResourceMetadata>, AppError> {
        let url = format!(
            "{}/{}/instances/{}",
            self.endpoint, COMPUTE_API_VERSION, resource_id
        );
        debug!(%url, "GET oci instance");

        let response = self.http.request(self.http.client.get(&url)).send().await?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                let instance: OciInstance = response.json().await?;
                Ok(Some(instance.into()))
            }
            _ => Err(upstream_error("oci compute", response).await),
        }
    }
}

pub struct OciMetricsAdapter {
    http: OciHttp,
    endpoint: String,
    compartment_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SummarizeMetricsRequest {
    namespace: String,
    query: String,
    start_time: String,
    end_time: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MetricSummary {
    #[serde(default)]
    name: String,
    #[serde(default)]
    namespace: String,
    #[serde(default)]
    aggregated_datapoints: Vec<AggregatedDatapoint>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AggregatedDatapoint {
    timestamp: DateTime<Utc>,
    value: f64,
}

#[async_trait]
impl MetricsSourceAdapter for OciMetricsAdapter {
    fn provider_type(&self) -> &'static str {
        "oci"
    }

    async fn fetch_metrics(
        &self,
        resource_id: &str,
        lookback: Duration,
    ) -> Result<Vec<MetricSnapshot>, AppError> {
        let end = Utc::now();
        let start = end
            - chrono::Duration::from_std(lookback).unwrap_or_else(|_| chrono::Duration::hours(1));
        let url = format!(
            "{}/{}/metrics/actions/summarizeMetricsData?compartmentId={}",
            self.endpoint, MONITORING_API_VERSION, self.compartment_id
        );

        let mut snapshots = Vec::new();
        for metric_name in SUMMARIZED_METRICS {
            let body = SummarizeMetricsRequest {
                namespace: METRICS_NAMESPACE.to_string(),
                query: format!("{metric_name}[1m]{{resourceId = \"{resource_id}\"}}.mean()"),
                start_time: start.to_rfc3339(),
                end_time: end.to_rfc3339(),
            };

            let response = self
                .http
                .request(self.http.client.post(&url).json(&body))
                .send()
                .await?;

            if !response.status().is_success() {
                return Err(upstream_error("oci monitoring", response).await);
            }

            let summaries: Vec<MetricSummary> = response.json().await?;
            for summary in summaries {
                let name = if summary.name.is_empty() {
                    metric_name.to_string()
                } else {
                    summary.name
                };
                for datapoint in summary.aggregated_datapoints {
                    snapshots.push(MetricSnapshot {
                        name: name.clone(),
                        namespace: if summary.namespace.is_empty() {
                            METRICS_NAMESPACE.to_string()
                        } else {
                            summary.namespace.clone()
                        },
                        value: datapoint.value,
                        unit: "Percent".to_string(),
                        timestamp: datapoint.timestamp,
                    });
                }
            }
        }

        Ok(snapshots)
    }
}

pub struct OciLogsAdapter {
    http: OciHttp,
    endpoint: String,
    compartment_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LogSearchRequest {
    time_start: String,
    time_end: String,
    search_query: String,
    is_return_field_info: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LogSearchResponse {
    #[serde(default)]
    results: Vec<LogSearchResult>,
}

#[derive(Debug, Deserialize)]
struct LogSearchResult {
    #[serde(default)]
    data: serde_json::Value,
}

#[async_trait]
impl LogSourceAdapter for OciLogsAdapter {
    fn provider_type(&self) -> &'static str {
        "oci"
    }

    async fn fetch_logs(
        &self,
        resource_id: &str,
        lookback: Duration,
        query: Option<&str>,
    ) -> Result<Vec<LogEntry>, AppError> {
        let end = Utc::now();
        let start = end
            - chrono::Duration::from_std(lookback).unwrap_or_else(|_| chrono::Duration::hours(1));
        let url = format!("{}/{}/search", self.endpoint, LOGGING_API_VERSION);

        let search_query = match query {
            Some(custom) => custom.to_string(),
            None => format!(
                "search \"{}\" | where data.resourceId = '{}' | sort by datetime desc",
                self.compartment_id, resource_id
            ),
        };

        let body = LogSearchRequest {
            time_start: start.to_rfc3339(),
            time_end: end.to_rfc3339(),
            search_query,
            is_return_field_info: false,
        };

        let response = self
            .http
            .request(self.http.client.post(&url).json(&body))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(upstream_error("oci logging search", response).await);
        }

        let parsed: LogSearchResponse = response.json().await?;
        Ok(parsed.results.into_iter().map(to_log_entry).collect())
    }
}

fn to_log_entry(result: LogSearchResult) -> LogEntry {
    let data = &result.data;

    let timestamp = data
        .get("datetime")
        .and_then(serde_json::Value::as_i64)
        .and_then(|millis| Utc.timestamp_millis_opt(millis).single())
        .unwrap_or_else(Utc::now);

    let id = data
        .get("id")
        .and_then(serde_json::Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let level = data
        .get("level")
        .or_else(|| data.get("severity"))
        .and_then(serde_json::Value::as_str)
        .unwrap_or("INFO")
        .to_string();

    let message = data
        .get("message")
        .and_then(serde_json::Value::as_str)
        .map_or_else(|| data.to_string(), str::to_string);

    LogEntry {
        id,
        timestamp,
        level,
        message,
        metadata: BTreeMap::new(),
    }
}
