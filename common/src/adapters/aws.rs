//! Thin REST clients for EC2, CloudWatch, and CloudWatch Logs.
//!
//! CloudWatch and CloudWatch Logs speak their JSON target protocols;
//! DescribeInstances uses the EC2 query protocol with a minimal XML field
//! scan. Auth is a static header from configuration; SigV4 signing is a
//! deployment concern (signing proxy or LocalStack) per the collaborator
//! contract.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::adapters::{ComputeMetadataAdapter, LogSourceAdapter, MetricsSourceAdapter};
use crate::error::AppError;
use crate::types::context::{LogEntry, MetricSnapshot, ResourceMetadata};
use crate::utils::config::AwsSettings;

const EC2_API_VERSION: &str = "2016-11-15";
const CLOUDWATCH_TARGET: &str = "GraniteServiceVersion20100801.GetMetricData";
const LOGS_TARGET: &str = "Logs_20140328.FilterLogEvents";
const DEFAULT_LOG_GROUP: &str = "/aws/ec2/instances";

pub struct AwsAdapters {
    pub metadata: AwsComputeMetadataAdapter,
    pub metrics: AwsMetricsAdapter,
    pub logs: AwsLogsAdapter,
}

#[derive(Clone)]
struct AwsHttp {
    client: reqwest::Client,
    auth_header: Option<String>,
}

impl AwsHttp {
    fn request(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.auth_header {
            Some(value) => builder.header("Authorization", value),
            None => builder,
        }
    }
}

impl AwsAdapters {
    pub fn from_settings(settings: &AwsSettings) -> Result<Self, AppError> {
        let region = settings.region.trim();
        if region.is_empty() {
            return Err(AppError::Config(
                "aws.region must not be empty for cloud.provider=aws".into(),
            ));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        let http = AwsHttp {
            client,
            auth_header: settings.auth_header.clone(),
        };

        let ec2_endpoint = endpoint_or_default(&settings.ec2_endpoint, "ec2", region);
        let cloudwatch_endpoint =
            endpoint_or_default(&settings.cloudwatch_endpoint, "monitoring", region);
        let logs_endpoint = endpoint_or_default(&settings.logs_endpoint, "logs", region);

        Ok(Self {
            metadata: AwsComputeMetadataAdapter {
                http: http.clone(),
                endpoint: ec2_endpoint,
            },
            metrics: AwsMetricsAdapter {
                http: http.clone(),
                endpoint: cloudwatch_endpoint,
            },
            logs: AwsLogsAdapter {
                http,
                endpoint: logs_endpoint,
                log_group: settings
                    .log_group
                    .clone()
                    .unwrap_or_else(|| DEFAULT_LOG_GROUP.to_string()),
            },
        })
    }
}

fn endpoint_or_default(configured: &Option<String>, service: &str, region: &str) -> String {
    configured
        .as_ref()
        .filter(|endpoint| !endpoint.trim().is_empty())
        .map(|endpoint| endpoint.trim_end_matches('/').to_string())
        .unwrap_or_else(|| format!("https://{service}.{region}.amazonaws.com"))
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

pub struct AwsComputeMetadataAdapter {
    http: AwsHttp,
    endpoint: String,
}

/// Pulls the text content of the first `<tag>...</tag>` span.
fn extract_xml_field(xml: &str, tag: &str) -> Option<String> {
    let open = format!("<{tag}>");
    let close = format!("</{tag}>");
    let start = xml.find(&open)? + open.len();
    let end = xml[start..].find(&close)? + start;
    Some(xml[start..end].trim().to_string())
}

/// Pulls the `Name` tag value out of a `tagSet` block.
fn extract_name_tag(xml: &str) -> Option<String> {
    let marker = "<key>Name</key>";
    let at = xml.find(marker)? + marker.len();
    extract_xml_field(&xml[at..], "value")
}

#[async_trait]
impl ComputeMetadataAdapter for AwsComputeMetadataAdapter {
    fn provider_type(&self) -> &'static str {
        "aws"
    }

    async fn get_instance(
        &self,
        resource_id: &str,
    ) -> Result<Option<ResourceMetadata>, AppError> {
        debug!(resource_id, "DescribeInstances");
        let params = [
            ("Action", "DescribeInstances"),
            ("Version", EC2_API_VERSION),
            ("InstanceId.1", resource_id),
        ];

        let response = self
            .http
            .request(self.http.client.post(&self.endpoint).form(&params))
            .send()
            .await?;

        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            if body.contains("InvalidInstanceID") {
                return Ok(None);
            }
            return Err(AppError::Upstream(format!(
                "aws ec2 DescribeInstances failed: {}",
                body.chars().take(240).collect::<String>()
            )));
        }

        let xml = response.text().await?;
        if !xml.contains("<instanceId>") {
            return Ok(None);
        }

        let shape = extract_xml_field(&xml, "instanceType").unwrap_or_default();
        let zone = extract_xml_field(&xml, "availabilityZone").unwrap_or_default();
        let account = extract_xml_field(&xml, "ownerId").unwrap_or_default();
        let display_name = extract_name_tag(&xml).unwrap_or_else(|| resource_id.to_string());

        Ok(Some(ResourceMetadata {
            resource_id: resource_id.to_string(),
            display_name,
            compartment_or_account: account,
            shape,
            zone,
            freeform_tags: BTreeMap::new(),
            defined_tags: BTreeMap::new(),
        }))
    }
}

pub struct AwsMetricsAdapter {
    http: AwsHttp,
    endpoint: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct GetMetricDataRequest {
    metric_data_queries: Vec<MetricDataQuery>,
    start_time: i64,
    end_time: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct MetricDataQuery {
    id: String,
    metric_stat: MetricStat,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct MetricStat {
    metric: MetricSpec,
    period: u32,
    stat: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct MetricSpec {
    namespace: String,
    metric_name: String,
    dimensions: Vec<MetricDimension>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct MetricDimension {
    name: String,
    value: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct GetMetricDataResponse {
    #[serde(default)]
    metric_data_results: Vec<MetricDataResult>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct MetricDataResult {
    #[serde(default)]
    label: String,
    #[serde(default)]
    timestamps: Vec<f64>,
    #[serde(default)]
    values: Vec<f64>,
}

#[async_trait]
impl MetricsSourceAdapter for AwsMetricsAdapter {
    fn provider_type(&self) -> &'static str {
        "aws"
    }

    async fn fetch_metrics(
        &self,
        resource_id: &str,
        lookback: Duration,
    ) -> Result<Vec<MetricSnapshot>, AppError> {
        let end = Utc::now();
        let start = end
            - chrono::Duration::from_std(lookback).unwrap_or_else(|_| chrono::Duration::hours(1));

        let queries = [("AWS/EC2", "CPUUtilization"), ("CWAgent", "mem_used_percent")]
            .iter()
            .enumerate()
            .map(|(i, (namespace, metric_name))| MetricDataQuery {
                id: format!("m{i}"),
                metric_stat: MetricStat {
                    metric: MetricSpec {
                        namespace: (*namespace).to_string(),
                        metric_name: (*metric_name).to_string(),
                        dimensions: vec![MetricDimension {
                            name: "InstanceId".to_string(),
                            value: resource_id.to_string(),
                        }],
                    },
                    period: 60,
                    stat: "Average".to_string(),
                },
            })
            .collect();

        let body = GetMetricDataRequest {
            metric_data_queries: queries,
            start_time: start.timestamp(),
            end_time: end.timestamp(),
        };

        let response = self
            .http
            .request(
                self.http
                    .client
                    .post(&self.endpoint)
                    .header("X-Amz-Target", CLOUDWATCH_TARGET)
                    .header("Content-Type", "application/x-amz-json-1.0")
                    .json(&body),
            )
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(upstream_error("aws cloudwatch", response).await);
        }

        let parsed: GetMetricDataResponse = response.json().await?;
        let mut snapshots = Vec::new();
        for result in parsed.metric_data_results {
            for (timestamp, value) in result.timestamps.iter().zip(result.values.iter()) {
                let at = Utc
                    .timestamp_opt(*timestamp as i64, 0)
                    .single()
                    .unwrap_or_else(Utc::now);
                snapshots.push(MetricSnapshot {
                    name: result.label.clone(),
                    namespace: "cloudwatch".to_string(),
                    value: *value,
                    unit: String::new(),
                    timestamp: at,
                });
            }
        }
        Ok(snapshots)
    }
}

pub struct AwsLogsAdapter {
    http: AwsHttp,
    endpoint: String,
    log_group: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FilterLogEventsRequest {
    log_group_name: String,
    start_time: i64,
    end_time: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    filter_pattern: Option<String>,
    limit: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FilterLogEventsResponse {
    #[serde(default)]
    events: Vec<FilteredLogEvent>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FilteredLogEvent {
    #[serde(default)]
    event_id: String,
    #[serde(default)]
    timestamp: i64,
    #[serde(default)]
    message: String,
    #[serde(default)]
    log_stream_name: String,
}

#[async_trait]
impl LogSourceAdapter for AwsLogsAdapter {
    fn provider_type(&self) -> &'static str {
        "aws"
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

        let filter_pattern = match query {
            Some(custom) => Some(custom.to_string()),
            None => Some(format!("\"{resource_id}\"")),
        };

        let body = FilterLogEventsRequest {
            log_group_name: self.log_group.clone(),
            start_time: start.timestamp_millis(),
            end_time: end.timestamp_millis(),
            filter_pattern,
            limit: 100,
        };

        let response = self
            .http
            .request(
                self.http
                    .client
                    .post(&self.endpoint)
                    .header("X-Amz-Target", LOGS_TARGET)
                    .header("Content-Type", "application/x-amz-json-1.1")
                    .json(&body),
            )
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(upstream_error("aws cloudwatch logs", response).await);
        }

        let parsed: FilterLogEventsResponse = response.json().await?;
        Ok(parsed
            .events
            .into_iter()
            .map(|event| {
                let timestamp = Utc
                    .timestamp_millis_opt(event.timestamp)
                    .single()
                    .unwrap_or_else(Utc::now);
                let mut metadata = BTreeMap::new();
                if !event.log_stream_name.is_empty() {
                    metadata.insert("logStreamName".to_string(), event.log_stream_name);
                }
                LogEntry {
                    id: event.event_id,
                    timestamp,
                    level: String::new(),
                    message: event.message,
                    metadata,
                }
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_endpoints_follow_region() {
        let mut settings = AwsSettings::default();
        settings.region = "eu-west-1".into();
        let adapters = AwsAdapters::from_settings(&settings).expect("build");
        assert_eq!(
            adapters.metadata.endpoint,
            "https://ec2.eu-west-1.amazonaws.com"
        );
        assert_eq!(
            adapters.metrics.endpoint,
            "https://monitoring.eu-west-1.amazonaws.com"
        );
        assert_eq!(
            adapters.logs.endpoint,
            "https://logs.eu-west-1.amazonaws.com"
        );
        assert_eq!(adapters.logs.log_group, DEFAULT_LOG_GROUP);
    }

    #[test]
    fn test_empty_region_fails_fast() {
        let mut settings = AwsSettings::default();
        settings.region = "  ".into();
        assert!(AwsAdapters::from_settings(&settings).is_err());
    }

    #[test]
    fn test_xml_field_extraction() {
        let xml = r"<DescribeInstancesResponse>
            <ownerId>123456789012</ownerId>
            <instanceId>i-abc</instanceId>
            <instanceType>t3.medium</instanceType>
            <availabilityZone>us-east-1a</availabilityZone>
            <tagSet><item><key>Name</key><value>web-1</value></item></tagSet>
        </DescribeInstancesResponse>";

        assert_eq!(
            extract_xml_field(xml, "instanceType").as_deref(),
            Some("t3.medium")
        );
        assert_eq!(
            extract_xml_field(xml, "availabilityZone").as_deref(),
            Some("us-east-1a")
        );
        assert_eq!(extract_name_tag(xml).as_deref(), Some("web-1"));
        assert_eq!(extract_xml_field(xml, "absent"), None);
    }
}
