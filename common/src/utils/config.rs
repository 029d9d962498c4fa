use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

use crate::types::webhook::WebhookConfig;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CloudProviderKind {
    Oci,
    Aws,
    Local,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VectorStoreKind {
    Local,
    Surreal,
}

#[derive(Clone, Debug, Deserialize)]
pub struct CloudSettings {
    #[serde(default = "default_cloud_provider")]
    pub provider: CloudProviderKind,
}

impl Default for CloudSettings {
    fn default() -> Self {
        Self {
            provider: default_cloud_provider(),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct VectorStoreSettings {
    #[serde(default = "default_vector_store_provider")]
    pub provider: VectorStoreKind,
}

impl Default for VectorStoreSettings {
    fn default() -> Self {
        Self {
            provider: default_vector_store_provider(),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct LlmSettings {
    #[serde(default = "default_llm_provider")]
    pub provider: String,
    /// API base for OpenAI-compatible endpoints. Defaults per provider when empty.
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_text_model")]
    pub text_model: String,
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,
    #[serde(default = "default_embedding_dimensions")]
    pub embedding_dimensions: usize,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_generation_timeout_secs")]
    pub generation_timeout_secs: u64,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            provider: default_llm_provider(),
            base_url: None,
            api_key: None,
            text_model: default_text_model(),
            embedding_model: default_embedding_model(),
            embedding_dimensions: default_embedding_dimensions(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            generation_timeout_secs: default_generation_timeout_secs(),
        }
    }
}

impl LlmSettings {
    /// Resolves the API base for the configured provider.
    pub fn resolved_base_url(&self) -> String {
        if let Some(url) = &self.base_url {
            if !url.trim().is_empty() {
                return url.trim_end_matches('/').to_string();
            }
        }
        match self.provider.as_str() {
            "ollama" => "http://localhost:11434/v1".to_string(),
            _ => "https://api.openai.com/v1".to_string(),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct RunbookSettings {
    #[serde(default = "default_runbook_bucket")]
    pub bucket: String,
    #[serde(default = "default_true")]
    pub ingest_on_startup: bool,
    #[serde(default = "default_min_chunk_size")]
    pub min_chunk_size: usize,
    #[serde(default = "default_max_chunk_size")]
    pub max_chunk_size: usize,
    #[serde(default = "default_ingest_concurrency")]
    pub ingest_concurrency: usize,
}

impl Default for RunbookSettings {
    fn default() -> Self {
        Self {
            bucket: default_runbook_bucket(),
            ingest_on_startup: default_true(),
            min_chunk_size: default_min_chunk_size(),
            max_chunk_size: default_max_chunk_size(),
            ingest_concurrency: default_ingest_concurrency(),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct EnrichmentSettings {
    #[serde(default = "default_lookback_secs")]
    pub lookback_secs: u64,
    #[serde(default = "default_adapter_timeout_secs")]
    pub adapter_timeout_secs: u64,
}

impl Default for EnrichmentSettings {
    fn default() -> Self {
        Self {
            lookback_secs: default_lookback_secs(),
            adapter_timeout_secs: default_adapter_timeout_secs(),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct RetrievalSettings {
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct OutputSettings {
    #[serde(default)]
    pub webhooks: Vec<WebhookConfig>,
    #[serde(default)]
    pub file: FileSinkSettings,
}

#[derive(Clone, Debug, Deserialize)]
pub struct FileSinkSettings {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_output_directory")]
    pub output_directory: String,
    #[serde(default = "default_file_sink_name")]
    pub name: String,
}

impl Default for FileSinkSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            output_directory: default_output_directory(),
            name: default_file_sink_name(),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct DispatchSettings {
    #[serde(default = "default_dispatch_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            timeout_secs: default_dispatch_timeout_secs(),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct SurrealSettings {
    #[serde(default = "default_surreal_address")]
    pub address: String,
    #[serde(default = "default_surreal_credential")]
    pub username: String,
    #[serde(default = "default_surreal_credential")]
    pub password: String,
    #[serde(default = "default_surreal_namespace")]
    pub namespace: String,
    #[serde(default = "default_surreal_database")]
    pub database: String,
}

impl Default for SurrealSettings {
    fn default() -> Self {
        Self {
            address: default_surreal_address(),
            username: default_surreal_credential(),
            password: default_surreal_credential(),
            namespace: default_surreal_namespace(),
            database: default_surreal_database(),
        }
    }
}

/// Endpoints and static auth material for the thin OCI REST adapters.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct OciSettings {
    #[serde(default)]
    pub compute_endpoint: Option<String>,
    #[serde(default)]
    pub monitoring_endpoint: Option<String>,
    #[serde(default)]
    pub logging_endpoint: Option<String>,
    #[serde(default)]
    pub object_storage_endpoint: Option<String>,
    #[serde(default)]
    pub compartment_id: Option<String>,
    #[serde(default)]
    pub auth_header: Option<String>,
}

/// Endpoints and static auth material for the thin AWS REST adapters.
#[derive(Clone, Debug, Deserialize)]
pub struct AwsSettings {
    #[serde(default)]
    pub ec2_endpoint: Option<String>,
    #[serde(default)]
    pub cloudwatch_endpoint: Option<String>,
    #[serde(default)]
    pub logs_endpoint: Option<String>,
    #[serde(default = "default_aws_region")]
    pub region: String,
    #[serde(default)]
    pub log_group: Option<String>,
    #[serde(default)]
    pub auth_header: Option<String>,
}

impl Default for AwsSettings {
    fn default() -> Self {
        Self {
            ec2_endpoint: None,
            cloudwatch_endpoint: None,
            logs_endpoint: None,
            region: default_aws_region(),
            log_group: None,
            auth_header: None,
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub cloud: CloudSettings,
    #[serde(default)]
    pub vector_store: VectorStoreSettings,
    #[serde(default)]
    pub llm: LlmSettings,
    #[serde(default)]
    pub runbooks: RunbookSettings,
    #[serde(default)]
    pub enrichment: EnrichmentSettings,
    #[serde(default)]
    pub retrieval: RetrievalSettings,
    #[serde(default)]
    pub dispatch: DispatchSettings,
    #[serde(default)]
    pub output: OutputSettings,
    #[serde(default)]
    pub surrealdb: SurrealSettings,
    #[serde(default)]
    pub oci: OciSettings,
    #[serde(default)]
    pub aws: AwsSettings,
    #[serde(default = "default_http_port")]
    pub http_port: u16,
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            cloud: CloudSettings::default(),
            vector_store: VectorStoreSettings::default(),
            llm: LlmSettings::default(),
            runbooks: RunbookSettings::default(),
            enrichment: EnrichmentSettings::default(),
            retrieval: RetrievalSettings::default(),
            dispatch: DispatchSettings::default(),
            output: OutputSettings::default(),
            surrealdb: SurrealSettings::default(),
            oci: OciSettings::default(),
            aws: AwsSettings::default(),
            http_port: default_http_port(),
            data_dir: default_data_dir(),
        }
    }
}

impl AppConfig {
    /// Validates cross-field constraints that serde defaults cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.llm.temperature) {
            return Err(ConfigError::Message(format!(
                "llm.temperature must be within [0, 1], got {}",
                self.llm.temperature
            )));
        }
        if self.llm.max_tokens == 0 {
            return Err(ConfigError::Message(
                "llm.max_tokens must be greater than zero".into(),
            ));
        }
        if self.runbooks.min_chunk_size == 0
            || self.runbooks.min_chunk_size > self.runbooks.max_chunk_size
        {
            return Err(ConfigError::Message(format!(
                "runbooks chunk bounds invalid: min={} max={}",
                self.runbooks.min_chunk_size, self.runbooks.max_chunk_size
            )));
        }
        if self.llm.embedding_dimensions == 0 {
            return Err(ConfigError::Message(
                "llm.embedding_dimensions must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

fn default_cloud_provider() -> CloudProviderKind {
    CloudProviderKind::Local
}

fn default_vector_store_provider() -> VectorStoreKind {
    VectorStoreKind::Local
}

fn default_llm_provider() -> String {
    "stub".to_string()
}

fn default_text_model() -> String {
    "llama3.1".to_string()
}

fn default_embedding_model() -> String {
    "nomic-embed-text".to_string()
}

fn default_embedding_dimensions() -> usize {
    384
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_tokens() -> u32 {
    1000
}

fn default_generation_timeout_secs() -> u64 {
    60
}

fn default_runbook_bucket() -> String {
    "runbook-synthesizer-runbooks".to_string()
}

fn default_true() -> bool {
    true
}

fn default_min_chunk_size() -> usize {
    100
}

fn default_max_chunk_size() -> usize {
    2000
}

fn default_ingest_concurrency() -> usize {
    4
}

fn default_lookback_secs() -> u64 {
    3600
}

fn default_adapter_timeout_secs() -> u64 {
    10
}

fn default_top_k() -> usize {
    5
}

fn default_dispatch_timeout_secs() -> u64 {
    10
}

fn default_output_directory() -> String {
    "./checklists".to_string()
}

fn default_file_sink_name() -> String {
    "file".to_string()
}

fn default_surreal_address() -> String {
    "ws://localhost:8000".to_string()
}

fn default_surreal_credential() -> String {
    "root".to_string()
}

fn default_surreal_namespace() -> String {
    "runbook_synthesizer".to_string()
}

fn default_surreal_database() -> String {
    "main".to_string()
}

fn default_aws_region() -> String {
    "us-east-1".to_string()
}

fn default_http_port() -> u16 {
    8080
}

fn default_data_dir() -> String {
    "./data".to_string()
}

/// Loads configuration from an optional `config` file with environment
/// variables layered on top (environment wins on conflicts).
pub fn get_config() -> Result<AppConfig, ConfigError> {
    let config = Config::builder()
        .add_source(File::with_name("config").required(false))
        .add_source(Environment::default().separator("__"))
        .build()?;

    let app_config: AppConfig = config.try_deserialize()?;
    app_config.validate()?;

    Ok(app_config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_complete() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.cloud.provider, CloudProviderKind::Local);
        assert_eq!(cfg.vector_store.provider, VectorStoreKind::Local);
        assert_eq!(cfg.llm.provider, "stub");
        assert_eq!(cfg.runbooks.bucket, "runbook-synthesizer-runbooks");
        assert!(cfg.runbooks.ingest_on_startup);
        assert_eq!(cfg.runbooks.min_chunk_size, 100);
        assert_eq!(cfg.runbooks.max_chunk_size, 2000);
        assert_eq!(cfg.enrichment.adapter_timeout_secs, 10);
        assert_eq!(cfg.llm.generation_timeout_secs, 60);
        cfg.validate().expect("defaults should validate");
    }

    #[test]
    fn test_ollama_base_url_default() {
        let mut cfg = AppConfig::default();
        cfg.llm.provider = "ollama".into();
        assert_eq!(cfg.llm.resolved_base_url(), "http://localhost:11434/v1");

        cfg.llm.base_url = Some("http://llm.internal:9000/v1/".into());
        assert_eq!(cfg.llm.resolved_base_url(), "http://llm.internal:9000/v1");
    }

    #[test]
    fn test_validate_rejects_out_of_range_temperature() {
        let mut cfg = AppConfig::default();
        cfg.llm.temperature = 1.5;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_inverted_chunk_bounds() {
        let mut cfg = AppConfig::default();
        cfg.runbooks.min_chunk_size = 3000;
        assert!(cfg.validate().is_err());
    }
}
