use std::collections::BTreeMap;
use std::time::Duration;

use tokio::time::timeout;
use tracing::{debug, instrument, warn};

use common::{
    adapters::CloudAdapters,
    types::alert::Alert,
    types::context::{EnrichedContext, LogEntry, MetricSnapshot, ResourceMetadata},
    utils::config::EnrichmentSettings,
};

/// Augments an alert with resource metadata, metrics, and logs.
///
/// Best effort, never aborts: each adapter call has its own deadline, and a
/// slice that times out or errors degrades to an empty result. Enrichment
/// always hands an `EnrichedContext` to the next stage.
pub struct EnrichmentService {
    adapters: CloudAdapters,
    lookback: Duration,
    adapter_timeout: Duration,
}

impl EnrichmentService {
    pub fn new(adapters: CloudAdapters, lookback: Duration, adapter_timeout: Duration) -> Self {
        Self {
            adapters,
            lookback,
            adapter_timeout,
        }
    }

    pub fn from_settings(adapters: CloudAdapters, settings: &EnrichmentSettings) -> Self {
        Self::new(
            adapters,
            Duration::from_secs(settings.lookback_secs),
            Duration::from_secs(settings.adapter_timeout_secs),
        )
    }

    #[instrument(skip_all, fields(alert_id = %alert.id()))]
    pub async fn enrich(&self, alert: Alert) -> EnrichedContext {
        let Some(resource_id) = alert.resource_id().map(str::to_string) else {
            debug!("alert carries no resource id; skipping adapter fetches");
            return EnrichedContext::bare(alert);
        };

        let (resource, metrics, logs) = tokio::join!(
            self.fetch_resource(&resource_id),
            self.fetch_metrics(&resource_id),
            self.fetch_logs(&resource_id),
        );

        debug!(
            resource_found = resource.is_some(),
            metrics = metrics.len(),
            logs = logs.len(),
            "enrichment assembled"
        );

        EnrichedContext::new(alert, resource, metrics, logs, BTreeMap::new())
    }

    async fn fetch_resource(&self, resource_id: &str) -> Option<ResourceMetadata> {
        match timeout(
            self.adapter_timeout,
            self.adapters.metadata.get_instance(resource_id),
        )
        .await
        {
            Ok(Ok(resource)) => resource,
            Ok(Err(err)) => {
                warn!(resource_id, error = %err, "metadata fetch failed; continuing without");
                None
            }
            Err(_) => {
                warn!(resource_id, "metadata fetch timed out; continuing without");
                None
            }
        }
    }

    async fn fetch_metrics(&self, resource_id: &str) -> Vec<MetricSnapshot> {
        match timeout(
            self.adapter_timeout,
            self.adapters.metrics.fetch_metrics(resource_id, self.lookback),
        )
        .await
        {
            Ok(Ok(snapshots)) => snapshots,
            Ok(Err(err)) => {
                warn!(resource_id, error = %err, "metrics fetch failed; continuing without");
                Vec::new()
            }
            Err(_) => {
                warn!(resource_id, "metrics fetch timed out; continuing without");
                Vec::new()
            }
        }
    }

    async fn fetch_logs(&self, resource_id: &str) -> Vec<LogEntry> {
        match timeout(
            self.adapter_timeout,
            self.adapters.logs.fetch_logs(resource_id, self.lookback, None),
        )
        .await
        {
            Ok(Ok(entries)) => entries,
            Ok(Err(err)) => {
                warn!(resource_id, error = %err, "log fetch failed; continuing without");
                Vec::new()
            }
            Err(_) => {
                warn!(resource_id, "log fetch timed out; continuing without");
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::Arc;

    use async_trait::async_trait;
    use chrono::Utc;

    use common::adapters::{
        CloudAdapters, ComputeMetadataAdapter, LogSourceAdapter, MetricsSourceAdapter,
    };
    use common::error::AppError;
    use common::types::alert::{Alert, AlertSeverity};

    use super::*;

    struct StaticMetadata {
        resource: Option<ResourceMetadata>,
        delay: Duration,
    }

    #[async_trait]
    impl ComputeMetadataAdapter for StaticMetadata {
        fn provider_type(&self) -> &'static str {
            "test"
        }

        async fn get_instance(
            &self,
            _resource_id: &str,
        ) -> Result<Option<ResourceMetadata>, AppError> {
            tokio::time::sleep(self.delay).await;
            Ok(self.resource.clone())
        }
    }

    struct SlowMetrics {
        delay: Duration,
    }

    #[async_trait]
    impl MetricsSourceAdapter for SlowMetrics {
        fn provider_type(&self) -> &'static str {
            "test"
        }

        async fn fetch_metrics(
            &self,
            _resource_id: &str,
            _lookback: Duration,
        ) -> Result<Vec<MetricSnapshot>, AppError> {
            tokio::time::sleep(self.delay).await;
            Ok(vec![MetricSnapshot {
                name: "cpu".into(),
                namespace: "host".into(),
                value: 0.5,
                unit: "ratio".into(),
                timestamp: Utc::now(),
            }])
        }
    }

    struct StaticLogs {
        entries: usize,
        fail: bool,
    }

    #[async_trait]
    impl LogSourceAdapter for StaticLogs {
        fn provider_type(&self) -> &'static str {
            "test"
        }

        async fn fetch_logs(
            &self,
            _resource_id: &str,
            _lookback: Duration,
            _query: Option<&str>,
        ) -> Result<Vec<LogEntry>, AppError> {
            if self.fail {
                return Err(AppError::Upstream("log backend down".into()));
            }
            Ok((0..self.entries)
                .map(|i| LogEntry {
                    id: format!("l{i}"),
                    timestamp: Utc::now(),
                    level: "ERROR".into(),
                    message: format!("entry {i}"),
                    metadata: BTreeMap::new(),
                })
                .collect())
        }
    }

    fn resource(shape: &str) -> ResourceMetadata {
        ResourceMetadata {
            resource_id: "i-abc".into(),
            display_name: "web-1".into(),
            compartment_or_account: String::new(),
            shape: shape.into(),
            zone: String::new(),
            freeform_tags: BTreeMap::new(),
            defined_tags: BTreeMap::new(),
        }
    }

    fn alert(with_resource: bool) -> Alert {
        let mut dimensions = BTreeMap::new();
        if with_resource {
            dimensions.insert("resourceId".to_string(), "i-abc".to_string());
        }
        Alert::new(
            "a-1".into(),
            "High Memory".into(),
            "Memory >90%".into(),
            AlertSeverity::Warning,
            String::new(),
            dimensions,
            BTreeMap::new(),
            Utc::now(),
            serde_json::Value::Null,
        )
    }

    fn adapters(
        metadata_delay: Duration,
        metrics_delay: Duration,
        logs: StaticLogs,
        shape: &str,
    ) -> CloudAdapters {
        CloudAdapters {
            metadata: Arc::new(StaticMetadata {
                resource: Some(resource(shape)),
                delay: metadata_delay,
            }),
            metrics: Arc::new(SlowMetrics {
                delay: metrics_delay,
            }),
            logs: Arc::new(logs),
        }
    }

    #[tokio::test]
    async fn test_enrich_gathers_all_three_slices() {
        let service = EnrichmentService::new(
            adapters(
                Duration::ZERO,
                Duration::ZERO,
                StaticLogs {
                    entries: 2,
                    fail: false,
                },
                "t3.medium",
            ),
            Duration::from_secs(3600),
            Duration::from_millis(500),
        );

        let context = service.enrich(alert(true)).await;
        assert_eq!(context.resource().map(|r| r.shape.as_str()), Some("t3.medium"));
        assert_eq!(context.recent_metrics().len(), 1);
        assert_eq!(context.recent_logs().len(), 2);
    }

    #[tokio::test]
    async fn test_missing_resource_id_skips_fetches() {
        let service = EnrichmentService::new(
            adapters(
                Duration::ZERO,
                Duration::ZERO,
                StaticLogs {
                    entries: 5,
                    fail: false,
                },
                "t3.medium",
            ),
            Duration::from_secs(3600),
            Duration::from_millis(500),
        );

        let context = service.enrich(alert(false)).await;
        assert!(context.resource().is_none());
        assert!(context.recent_metrics().is_empty());
        assert!(context.recent_logs().is_empty());
    }

    #[tokio::test]
    async fn test_metrics_timeout_degrades_to_empty_slice() {
        let service = EnrichmentService::new(
            adapters(
                Duration::ZERO,
                Duration::from_millis(300),
                StaticLogs {
                    entries: 2,
                    fail: false,
                },
                "t3.medium",
            ),
            Duration::from_secs(3600),
            Duration::from_millis(50),
        );

        let context = service.enrich(alert(true)).await;
        // The timed-out slice is empty; the others still land.
        assert!(context.recent_metrics().is_empty());
        assert!(context.resource().is_some());
        assert_eq!(context.recent_logs().len(), 2);
    }

    #[tokio::test]
    async fn test_log_backend_failure_degrades_to_empty_slice() {
        let service = EnrichmentService::new(
            adapters(
                Duration::ZERO,
                Duration::ZERO,
                StaticLogs {
                    entries: 0,
                    fail: true,
                },
                "t3.medium",
            ),
            Duration::from_secs(3600),
            Duration::from_millis(500),
        );

        let context = service.enrich(alert(true)).await;
        assert!(context.recent_logs().is_empty());
        assert!(context.resource().is_some());
        assert_eq!(context.recent_metrics().len(), 1);
    }
}
