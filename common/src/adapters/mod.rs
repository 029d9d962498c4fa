pub mod alert_sources;
pub mod aws;
pub mod local;
pub mod oci;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::AppError;
use crate::types::context::{LogEntry, MetricSnapshot, ResourceMetadata};
use crate::utils::config::{AppConfig, CloudProviderKind};

pub use alert_sources::{AlertSourceAdapter, NormalizerRegistry};

/// Resolves compute-resource metadata for an alert's target.
///
/// A resource that does not exist is a value (`None`), not an error; errors
/// mean the backend itself could not be consulted.
#[async_trait]
pub trait ComputeMetadataAdapter: Send + Sync {
    fn provider_type(&self) -> &'static str;

    async fn get_instance(&self, resource_id: &str)
        -> Result<Option<ResourceMetadata>, AppError>;
}

/// Fetches recent metric datapoints for a resource.
#[async_trait]
pub trait MetricsSourceAdapter: Send + Sync {
    fn provider_type(&self) -> &'static str;

    async fn fetch_metrics(
        &self,
        resource_id: &str,
        lookback: Duration,
    ) -> Result<Vec<MetricSnapshot>, AppError>;
}

/// Fetches recent log entries for a resource.
#[async_trait]
pub trait LogSourceAdapter: Send + Sync {
    fn provider_type(&self) -> &'static str;

    async fn fetch_logs(
        &self,
        resource_id: &str,
        lookback: Duration,
        query: Option<&str>,
    ) -> Result<Vec<LogEntry>, AppError>;
}

/// The adapter family for one cloud provider, built once at startup and
/// shared read-only afterwards.
#[derive(Clone)]
pub struct CloudAdapters {
    pub metadata: Arc<dyn ComputeMetadataAdapter>,
    pub metrics: Arc<dyn MetricsSourceAdapter>,
    pub logs: Arc<dyn LogSourceAdapter>,
}

impl CloudAdapters {
    /// Instantiates the family selected by `cloud.provider`. Misconfigured
    /// providers fail fast here rather than at first use.
    pub fn from_config(cfg: &AppConfig) -> Result<Self, AppError> {
        match cfg.cloud.provider {
            CloudProviderKind::Local => {
                let base = crate::storage::store::resolve_base_dir(&cfg.data_dir).join("fixtures");
                Ok(Self {
                    metadata: Arc::new(local::FixtureMetadataAdapter::new(base.clone())),
                    metrics: Arc::new(local::FixtureMetricsAdapter::new(base.clone())),
                    logs: Arc::new(local::FixtureLogsAdapter::new(base)),
                })
            }
            CloudProviderKind::Oci => {
                let adapters = oci::OciAdapters::from_settings(&cfg.oci)?;
                Ok(Self {
                    metadata: Arc::new(adapters.metadata),
                    metrics: Arc::new(adapters.metrics),
                    logs: Arc::new(adapters.logs),
                })
            }
            CloudProviderKind::Aws => {
                let adapters = aws::AwsAdapters::from_settings(&cfg.aws)?;
                Ok(Self {
                    metadata: Arc::new(adapters.metadata),
                    metrics: Arc::new(adapters.metrics),
                    logs: Arc::new(adapters.logs),
                })
            }
        }
    }
}

/// Registry of provider-specific alert normalizers, consulted in order.
pub fn default_normalizers() -> NormalizerRegistry {
    NormalizerRegistry::new(vec![
        Arc::new(alert_sources::OciMonitoringAlertSource),
        Arc::new(alert_sources::CloudWatchAlertSource),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_family_builds_from_defaults() {
        let cfg = AppConfig::default();
        let adapters = CloudAdapters::from_config(&cfg).expect("local family");
        assert_eq!(adapters.metadata.provider_type(), "local");
        assert_eq!(adapters.metrics.provider_type(), "local");
        assert_eq!(adapters.logs.provider_type(), "local");
    }

    #[test]
    fn test_oci_family_requires_endpoints() {
        let mut cfg = AppConfig::default();
        cfg.cloud.provider = CloudProviderKind::Oci;
        let err = CloudAdapters::from_config(&cfg)
            .err()
            .expect("missing endpoints must fail");
        assert!(matches!(err, AppError::Config(_)));
    }

    #[test]
    fn test_aws_family_builds_with_default_regional_endpoints() {
        let mut cfg = AppConfig::default();
        cfg.cloud.provider = CloudProviderKind::Aws;
        let adapters = CloudAdapters::from_config(&cfg).expect("aws family");
        assert_eq!(adapters.metrics.provider_type(), "aws");
    }
}
