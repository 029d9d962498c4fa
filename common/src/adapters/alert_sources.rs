use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use crate::error::AppError;
use crate::types::alert::{Alert, AlertSeverity};

/// Coerces one provider's alarm payload into the canonical [`Alert`].
pub trait AlertSourceAdapter: Send + Sync {
    fn source_service(&self) -> &'static str;

    fn can_handle(&self, raw: &Value) -> bool;

    fn parse_alert(&self, raw: &Value) -> Result<Alert, AppError>;
}

/// Ordered set of provider normalizers with a canonical-body fallback.
#[derive(Clone)]
pub struct NormalizerRegistry {
    adapters: Vec<Arc<dyn AlertSourceAdapter>>,
}

impl NormalizerRegistry {
    pub fn new(adapters: Vec<Arc<dyn AlertSourceAdapter>>) -> Self {
        Self { adapters }
    }

    /// The first adapter claiming the payload wins; otherwise the body is
    /// treated as the canonical alert-request form and validated as such.
    pub fn normalize(&self, raw: &Value) -> Result<Alert, AppError> {
        for adapter in &self.adapters {
            if adapter.can_handle(raw) {
                debug!(source = adapter.source_service(), "normalizing provider payload");
                return adapter.parse_alert(raw);
            }
        }
        canonical_alert_from_value(raw)
    }
}

/// Parses the canonical alert-request body, enforcing the ingress contract:
/// `title` must be present and non-empty, `severity` must be a known value.
pub fn canonical_alert_from_value(raw: &Value) -> Result<Alert, AppError> {
    let title = raw
        .get("title")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::Validation("title is required".into()))?;

    let severity_raw = raw
        .get("severity")
        .and_then(Value::as_str)
        .unwrap_or_default();
    let severity = AlertSeverity::parse(severity_raw).ok_or_else(|| {
        AppError::Validation(format!(
            "severity must be one of CRITICAL, WARNING, INFO; got '{severity_raw}'"
        ))
    })?;

    let id = raw
        .get("id")
        .and_then(Value::as_str)
        .map_or_else(|| Uuid::new_v4().to_string(), str::to_string);

    let message = raw
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    let source_service = raw
        .get("sourceService")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    let timestamp = raw
        .get("timestamp")
        .and_then(Value::as_str)
        .and_then(|value| DateTime::parse_from_rfc3339(value).ok())
        .map_or_else(Utc::now, |parsed| parsed.with_timezone(&Utc));

    Ok(Alert::new(
        id,
        title.to_string(),
        message,
        severity,
        source_service,
        string_map(raw.get("dimensions")),
        string_map(raw.get("labels")),
        timestamp,
        raw.clone(),
    ))
}

fn string_map(value: Option<&Value>) -> BTreeMap<String, String> {
    let mut map = BTreeMap::new();
    if let Some(Value::Object(entries)) = value {
        for (key, entry) in entries {
            let rendered = match entry {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            map.insert(key.clone(), rendered);
        }
    }
    map
}

/// Normalizer for OCI Monitoring alarm messages.
pub struct OciMonitoringAlertSource;

impl AlertSourceAdapter for OciMonitoringAlertSource {
    fn source_service(&self) -> &'static str {
        "oci-monitoring"
    }

    fn can_handle(&self, raw: &Value) -> bool {
        raw.get("dedupeKey").is_some() || raw.get("alarmMetaData").is_some()
    }

    fn parse_alert(&self, raw: &Value) -> Result<Alert, AppError> {
        let alarm = raw
            .get("alarmMetaData")
            .and_then(Value::as_array)
            .and_then(|items| items.first());

        let title = raw
            .get("title")
            .and_then(Value::as_str)
            .filter(|t| !t.trim().is_empty())
            .or_else(|| {
                alarm
                    .and_then(|a| a.get("alarmSummary"))
                    .and_then(Value::as_str)
            })
            .ok_or_else(|| {
                AppError::Validation("OCI alarm payload carries no title or alarmSummary".into())
            })?;

        let severity_raw = raw
            .get("severity")
            .or_else(|| alarm.and_then(|a| a.get("severity")))
            .and_then(Value::as_str)
            .unwrap_or("CRITICAL");
        let severity = AlertSeverity::parse(severity_raw).unwrap_or(AlertSeverity::Critical);

        let id = raw
            .get("dedupeKey")
            .and_then(Value::as_str)
            .map_or_else(|| Uuid::new_v4().to_string(), str::to_string);

        let message = raw
            .get("body")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        let timestamp = raw
            .get("timestampEpochMillis")
            .and_then(Value::as_i64)
            .and_then(|millis| Utc.timestamp_millis_opt(millis).single())
            .unwrap_or_else(Utc::now);

        // OCI puts alarm dimensions in a list of maps; the first entry carries
        // the firing resource.
        let mut dimensions = BTreeMap::new();
        if let Some(list) = alarm
            .and_then(|a| a.get("dimensions"))
            .and_then(Value::as_array)
        {
            if let Some(Value::Object(first)) = list.first() {
                for (key, value) in first {
                    if let Some(rendered) = value.as_str() {
                        dimensions.insert(key.clone(), rendered.to_string());
                    }
                }
            }
        }

        let mut labels = BTreeMap::new();
        if let Some(namespace) = alarm
            .and_then(|a| a.get("namespace"))
            .and_then(Value::as_str)
        {
            labels.insert("namespace".to_string(), namespace.to_string());
        }
        if let Some(query) = alarm.and_then(|a| a.get("query")).and_then(Value::as_str) {
            labels.insert("query".to_string(), query.to_string());
        }

        Ok(Alert::new(
            id,
            title.to_string(),
            message,
            severity,
            self.source_service().to_string(),
            dimensions,
            labels,
            timestamp,
            raw.clone(),
        ))
    }
}

/// Normalizer for CloudWatch alarm notifications (SNS message body).
pub struct CloudWatchAlertSource;

impl AlertSourceAdapter for CloudWatchAlertSource {
    fn source_service(&self) -> &'static str {
        "aws-cloudwatch"
    }

    fn can_handle(&self, raw: &Value) -> bool {
        raw.get("AlarmName").is_some() && raw.get("NewStateValue").is_some()
    }

    fn parse_alert(&self, raw: &Value) -> Result<Alert, AppError> {
        let title = raw
            .get("AlarmName")
            .and_then(Value::as_str)
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| AppError::Validation("CloudWatch payload has empty AlarmName".into()))?;

        let severity = match raw.get("NewStateValue").and_then(Value::as_str) {
            Some("ALARM") => AlertSeverity::Critical,
            Some("INSUFFICIENT_DATA") => AlertSeverity::Warning,
            _ => AlertSeverity::Info,
        };

        let message = raw
            .get("NewStateReason")
            .and_then(Value::as_str)
            .or_else(|| raw.get("AlarmDescription").and_then(Value::as_str))
            .unwrap_or_default()
            .to_string();

        let timestamp = raw
            .get("StateChangeTime")
            .and_then(Value::as_str)
            .and_then(parse_cloudwatch_time)
            .unwrap_or_else(Utc::now);

        let trigger = raw.get("Trigger");
        let mut dimensions = BTreeMap::new();
        if let Some(list) = trigger
            .and_then(|t| t.get("Dimensions"))
            .and_then(Value::as_array)
        {
            for entry in list {
                let name = entry.get("name").and_then(Value::as_str);
                let value = entry.get("value").and_then(Value::as_str);
                if let (Some(name), Some(value)) = (name, value) {
                    if name == "InstanceId" {
                        // Canonical resource lookup key alongside the original.
                        dimensions.insert("instanceId".to_string(), value.to_string());
                    }
                    dimensions.insert(name.to_string(), value.to_string());
                }
            }
        }

        let mut labels = BTreeMap::new();
        for (label, key) in [("namespace", "Namespace"), ("metricName", "MetricName")] {
            if let Some(value) = trigger.and_then(|t| t.get(key)).and_then(Value::as_str) {
                labels.insert(label.to_string(), value.to_string());
            }
        }
        if let Some(account) = raw.get("AWSAccountId").and_then(Value::as_str) {
            labels.insert("accountId".to_string(), account.to_string());
        }

        Ok(Alert::new(
            Uuid::new_v4().to_string(),
            title.to_string(),
            message,
            severity,
            self.source_service().to_string(),
            dimensions,
            labels,
            timestamp,
            raw.clone(),
        ))
    }
}

fn parse_cloudwatch_time(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.3f%z")
        .or_else(|_| DateTime::parse_from_rfc3339(value))
        .ok()
        .map(|parsed| parsed.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::default_normalizers;

    #[test]
    fn test_canonical_round_trip_preserves_fields() {
        let raw = serde_json::json!({
            "title": "High Memory",
            "message": "Memory >90%",
            "severity": "WARNING",
            "sourceService": "direct",
            "dimensions": {"resourceId": "i-abc"},
            "labels": {"team": "sre"}
        });

        let alert = canonical_alert_from_value(&raw).expect("canonical parse");
        assert_eq!(alert.title(), "High Memory");
        assert_eq!(alert.severity(), AlertSeverity::Warning);
        assert_eq!(alert.dimension("resourceId"), Some("i-abc"));
        assert_eq!(alert.labels().get("team"), Some(&"sre".to_string()));
        assert_eq!(alert.raw_payload(), &raw);
    }

    #[test]
    fn test_canonical_rejects_missing_title() {
        let raw = serde_json::json!({"message": "x", "severity": "WARNING"});
        let err = canonical_alert_from_value(&raw).expect_err("missing title");
        assert!(matches!(err, AppError::Validation(_)));
        assert!(err.to_string().contains("title"));
    }

    #[test]
    fn test_canonical_rejects_unknown_severity_naming_allowed_values() {
        let raw = serde_json::json!({"title": "t", "severity": "UNKNOWN"});
        let err = canonical_alert_from_value(&raw).expect_err("unknown severity");
        let message = err.to_string();
        assert!(message.contains("CRITICAL"));
        assert!(message.contains("WARNING"));
        assert!(message.contains("INFO"));
    }

    #[test]
    fn test_oci_alarm_payload_normalizes() {
        let raw = serde_json::json!({
            "dedupeKey": "dedupe-123",
            "title": "CPU alarm",
            "body": "CPU above 95% for 5 minutes",
            "severity": "CRITICAL",
            "timestampEpochMillis": 1700000000000_i64,
            "alarmMetaData": [{
                "namespace": "oci_computeagent",
                "query": "CpuUtilization[1m].mean() > 95",
                "dimensions": [{"resourceId": "ocid1.instance.oc1..xyz"}]
            }]
        });

        let registry = default_normalizers();
        let alert = registry.normalize(&raw).expect("normalize");
        assert_eq!(alert.source_service(), "oci-monitoring");
        assert_eq!(alert.id(), "dedupe-123");
        assert_eq!(alert.severity(), AlertSeverity::Critical);
        assert_eq!(alert.resource_id(), Some("ocid1.instance.oc1..xyz"));
        assert_eq!(
            alert.labels().get("namespace"),
            Some(&"oci_computeagent".to_string())
        );
        assert_eq!(alert.raw_payload(), &raw);
    }

    #[test]
    fn test_cloudwatch_alarm_payload_normalizes() {
        let raw = serde_json::json!({
            "AlarmName": "mem-used-high",
            "AlarmDescription": "Memory usage is high",
            "AWSAccountId": "123456789012",
            "NewStateValue": "ALARM",
            "NewStateReason": "Threshold crossed: 92% > 90%",
            "StateChangeTime": "2026-07-30T21:30:00.000+0000",
            "Trigger": {
                "MetricName": "mem_used_percent",
                "Namespace": "CWAgent",
                "Dimensions": [{"value": "i-0abc", "name": "InstanceId"}]
            }
        });

        let registry = default_normalizers();
        let alert = registry.normalize(&raw).expect("normalize");
        assert_eq!(alert.source_service(), "aws-cloudwatch");
        assert_eq!(alert.severity(), AlertSeverity::Critical);
        assert_eq!(alert.title(), "mem-used-high");
        assert_eq!(alert.resource_id(), Some("i-0abc"));
        assert_eq!(
            alert.labels().get("metricName"),
            Some(&"mem_used_percent".to_string())
        );
    }

    #[test]
    fn test_cloudwatch_ok_state_maps_to_info() {
        let raw = serde_json::json!({
            "AlarmName": "mem-used-high",
            "NewStateValue": "OK"
        });
        let alert = CloudWatchAlertSource.parse_alert(&raw).expect("parse");
        assert_eq!(alert.severity(), AlertSeverity::Info);
    }

    #[test]
    fn test_registry_falls_back_to_canonical_form() {
        let raw = serde_json::json!({"title": "direct", "severity": "INFO"});
        let registry = default_normalizers();
        let alert = registry.normalize(&raw).expect("normalize");
        assert_eq!(alert.title(), "direct");
        assert_eq!(alert.source_service(), "");
    }
}
