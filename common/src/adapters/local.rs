use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tracing::debug;

use crate::adapters::{ComputeMetadataAdapter, LogSourceAdapter, MetricsSourceAdapter};
use crate::error::AppError;
use crate::types::context::{LogEntry, MetricSnapshot, ResourceMetadata};

/// Fixture-backed adapter family for the `local` provider.
///
/// Each adapter reads JSON documents from a directory keyed by resource id:
/// `fixtures/instances/<id>.json`, `fixtures/metrics/<id>.json`,
/// `fixtures/logs/<id>.json`. A missing file is the not-found value.
pub struct FixtureMetadataAdapter {
    base: PathBuf,
}

pub struct FixtureMetricsAdapter {
    base: PathBuf,
}

pub struct FixtureLogsAdapter {
    base: PathBuf,
}

impl FixtureMetadataAdapter {
    pub fn new(base: PathBuf) -> Self {
        Self { base }
    }
}

impl FixtureMetricsAdapter {
    pub fn new(base: PathBuf) -> Self {
        Self { base }
    }
}

impl FixtureLogsAdapter {
    pub fn new(base: PathBuf) -> Self {
        Self { base }
    }
}

fn fixture_file(base: &Path, subdir: &str, resource_id: &str) -> PathBuf {
    // Resource ids may contain path separators; keep lookups inside the
    // fixture directory.
    let safe_id: String = resource_id
        .chars()
        .map(|c| if c == '/' || c == '\\' { '_' } else { c })
        .collect();
    base.join(subdir).join(format!("{safe_id}.json"))
}

async fn read_fixture(path: &Path) -> Result<Option<String>, AppError> {
    match tokio::fs::read_to_string(path).await {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

#[async_trait]
impl ComputeMetadataAdapter for FixtureMetadataAdapter {
    fn provider_type(&self) -> &'static str {
        "local"
    }

    async fn get_instance(
        &self,
        resource_id: &str,
    ) -> Result<Option<ResourceMetadata>, AppError> {
        let path = fixture_file(&self.base, "instances", resource_id);
        let Some(content) = read_fixture(&path).await? else {
            debug!(resource_id, "no instance fixture");
            return Ok(None);
        };
        let metadata: ResourceMetadata = serde_json::from_str(&content)?;
        Ok(Some(metadata))
    }
}

#[async_trait]
impl MetricsSourceAdapter for FixtureMetricsAdapter {
    fn provider_type(&self) -> &'static str {
        "local"
    }

    async fn fetch_metrics(
        &self,
        resource_id: &str,
        lookback: Duration,
    ) -> Result<Vec<MetricSnapshot>, AppError> {
        let path = fixture_file(&self.base, "metrics", resource_id);
        let Some(content) = read_fixture(&path).await? else {
            return Ok(Vec::new());
        };
        let snapshots: Vec<MetricSnapshot> = serde_json::from_str(&content)?;

        let cutoff = Utc::now()
            - chrono::Duration::from_std(lookback)
                .unwrap_or_else(|_| chrono::Duration::hours(1));
        Ok(snapshots
            .into_iter()
            .filter(|snapshot| snapshot.timestamp >= cutoff)
            .collect())
    }
}

#[async_trait]
impl LogSourceAdapter for FixtureLogsAdapter {
    fn provider_type(&self) -> &'static str {
        "local"
    }

    async fn fetch_logs(
        &self,
        resource_id: &str,
        lookback: Duration,
        query: Option<&str>,
    ) -> Result<Vec<LogEntry>, AppError> {
        let path = fixture_file(&self.base, "logs", resource_id);
        let Some(content) = read_fixture(&path).await? else {
            return Ok(Vec::new());
        };
        let entries: Vec<LogEntry> = serde_json::from_str(&content)?;

        let cutoff = Utc::now()
            - chrono::Duration::from_std(lookback)
                .unwrap_or_else(|_| chrono::Duration::hours(1));
        Ok(entries
            .into_iter()
            .filter(|entry| entry.timestamp >= cutoff)
            .filter(|entry| match query {
                Some(needle) => entry.message.contains(needle),
                None => true,
            })
            .collect())
    }
}
