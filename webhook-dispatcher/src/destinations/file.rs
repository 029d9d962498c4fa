use std::path::PathBuf;

use async_trait::async_trait;
use tracing::debug;
use uuid::Uuid;

use common::{
    error::AppError,
    types::alert::AlertSeverity,
    types::checklist::DynamicChecklist,
    types::webhook::{WebhookConfig, WebhookResult},
};

use crate::Destination;

/// Writes each checklist as a JSON file into the configured directory.
///
/// Writes are atomic: the body lands in a temp file first and is renamed into
/// place, so a reader never observes a partial document at the final name.
pub struct FileDestination {
    config: WebhookConfig,
    directory: PathBuf,
}

impl FileDestination {
    pub fn new(config: WebhookConfig) -> Result<Self, AppError> {
        if config.url.trim().is_empty() {
            return Err(AppError::Validation(
                "file destination requires an output directory".into(),
            ));
        }
        let directory = PathBuf::from(config.url.trim());
        Ok(Self { config, directory })
    }

    fn final_name(checklist: &DynamicChecklist) -> String {
        let safe_alert_id: String = checklist
            .alert_id
            .chars()
            .map(|c| {
                if c.is_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        format!(
            "checklist-{safe_alert_id}-{}.json",
            checklist.generated_at.timestamp_millis()
        )
    }
}

#[async_trait]
impl Destination for FileDestination {
    fn config(&self) -> &WebhookConfig {
        &self.config
    }

    async fn send(
        &self,
        checklist: &DynamicChecklist,
        _severity: AlertSeverity,
    ) -> Result<WebhookResult, AppError> {
        tokio::fs::create_dir_all(&self.directory).await?;

        let body = serde_json::to_vec_pretty(checklist)?;
        let temp_path = self.directory.join(format!(".tmp-{}", Uuid::new_v4()));
        let final_path = self.directory.join(Self::final_name(checklist));

        tokio::fs::write(&temp_path, &body).await?;
        tokio::fs::rename(&temp_path, &final_path).await?;

        debug!(
            destination = %self.config.name,
            path = %final_path.display(),
            "checklist written"
        );
        Ok(WebhookResult::success(self.config.name.clone(), None))
    }
}
