use std::path::PathBuf;
use std::sync::Arc;

use bytes::Bytes;
use futures::TryStreamExt;
use object_store::aws::AmazonS3Builder;
use object_store::local::LocalFileSystem;
use object_store::memory::InMemory;
use object_store::{path::Path as ObjPath, ObjectStore};

use crate::error::AppError;
use crate::utils::config::{AppConfig, CloudProviderKind};

pub type DynStore = Arc<dyn ObjectStore>;

/// Which backend a `RunbookStore` sits on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunbookStoreKind {
    Local,
    Memory,
    S3,
}

/// Object-storage home of the operator runbooks.
///
/// The `aws` cloud provider talks to S3 directly; the `oci` provider reuses
/// the same client against OCI Object Storage's S3-compatible endpoint; the
/// `local` provider maps the bucket onto a directory under `data_dir`.
#[derive(Clone)]
pub struct RunbookStore {
    store: DynStore,
    backend_kind: RunbookStoreKind,
    bucket: String,
    local_base: Option<PathBuf>,
}

impl RunbookStore {
    /// Builds the backend selected by `cloud.provider`.
    pub async fn new(cfg: &AppConfig) -> Result<Self, AppError> {
        let bucket = cfg.runbooks.bucket.clone();
        match cfg.cloud.provider {
            CloudProviderKind::Local => {
                let base = resolve_base_dir(&cfg.data_dir).join(&bucket);
                if !base.exists() {
                    tokio::fs::create_dir_all(&base).await?;
                }
                let store = LocalFileSystem::new_with_prefix(base.clone())?;
                Ok(Self {
                    store: Arc::new(store),
                    backend_kind: RunbookStoreKind::Local,
                    bucket,
                    local_base: Some(base),
                })
            }
            CloudProviderKind::Aws => {
                let store = AmazonS3Builder::from_env()
                    .with_bucket_name(&bucket)
                    .with_region(&cfg.aws.region)
                    .build()?;
                Ok(Self {
                    store: Arc::new(store),
                    backend_kind: RunbookStoreKind::S3,
                    bucket,
                    local_base: None,
                })
            }
            CloudProviderKind::Oci => {
                let endpoint = cfg.oci.object_storage_endpoint.clone().ok_or_else(|| {
                    AppError::Config(
                        "oci.object_storage_endpoint is required for cloud.provider=oci".into(),
                    )
                })?;
                let store = AmazonS3Builder::from_env()
                    .with_bucket_name(&bucket)
                    .with_endpoint(endpoint)
                    .with_virtual_hosted_style_request(false)
                    .build()?;
                Ok(Self {
                    store: Arc::new(store),
                    backend_kind: RunbookStoreKind::S3,
                    bucket,
                    local_base: None,
                })
            }
        }
    }

    /// Wraps a caller-provided backend; used by tests to inject `InMemory`.
    pub fn with_backend(store: DynStore, backend_kind: RunbookStoreKind, bucket: String) -> Self {
        Self {
            store,
            backend_kind,
            bucket,
            local_base: None,
        }
    }

    /// An in-memory store, empty until seeded with `put_runbook`.
    pub fn in_memory(bucket: impl Into<String>) -> Self {
        Self::with_backend(
            Arc::new(InMemory::new()),
            RunbookStoreKind::Memory,
            bucket.into(),
        )
    }

    pub fn backend_kind(&self) -> RunbookStoreKind {
        self.backend_kind
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Lists runbook object keys (`.md` only) below the optional prefix, in
    /// lexicographic order.
    pub async fn list_runbooks(&self, prefix: Option<&str>) -> Result<Vec<String>, AppError> {
        let prefix_path = prefix.map(ObjPath::from);
        let metas: Vec<object_store::ObjectMeta> = self
            .store
            .list(prefix_path.as_ref())
            .try_collect()
            .await?;

        let mut keys: Vec<String> = metas
            .into_iter()
            .map(|meta| meta.location.to_string())
            .filter(|key| key.ends_with(".md"))
            .collect();
        keys.sort();
        Ok(keys)
    }

    /// Fetches a runbook body. A missing object is a value, not an error.
    pub async fn get_runbook_content(&self, key: &str) -> Result<Option<String>, AppError> {
        let path = ObjPath::from(key);
        match self.store.get(&path).await {
            Ok(result) => {
                let bytes = result.bytes().await?;
                let content = String::from_utf8(bytes.to_vec()).map_err(|e| {
                    AppError::Validation(format!("runbook {key} is not valid UTF-8: {e}"))
                })?;
                Ok(Some(content))
            }
            Err(object_store::Error::NotFound { .. }) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Writes a runbook body; used by seeding and tests.
    pub async fn put_runbook(&self, key: &str, content: &str) -> Result<(), AppError> {
        let path = ObjPath::from(key);
        let payload = object_store::PutPayload::from_bytes(Bytes::from(content.as_bytes().to_vec()));
        self.store.put(&path, payload).await?;
        Ok(())
    }

    /// Removes a runbook object if present.
    pub async fn delete_runbook(&self, key: &str) -> Result<(), AppError> {
        let path = ObjPath::from(key);
        match self.store.delete(&path).await {
            Ok(()) => Ok(()),
            Err(object_store::Error::NotFound { .. }) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Resolves the absolute base directory for local storage from config.
///
/// A relative `data_dir` is resolved against the current working directory.
pub fn resolve_base_dir(data_dir: &str) -> PathBuf {
    if data_dir.starts_with('/') {
        PathBuf::from(data_dir)
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(data_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_list_runbooks_filters_non_markdown_and_sorts() {
        let store = RunbookStore::in_memory("runbooks");

        store
            .put_runbook("zeta.md", "# Zeta")
            .await
            .expect("put zeta");
        store
            .put_runbook("alpha.md", "# Alpha")
            .await
            .expect("put alpha");
        store
            .put_runbook("notes.txt", "not a runbook")
            .await
            .expect("put txt");

        let keys = store.list_runbooks(None).await.expect("list");
        assert_eq!(keys, vec!["alpha.md".to_string(), "zeta.md".to_string()]);
    }

    #[tokio::test]
    async fn test_list_runbooks_honors_prefix() {
        let store = RunbookStore::in_memory("runbooks");
        store
            .put_runbook("linux/memory.md", "# Memory")
            .await
            .expect("put");
        store
            .put_runbook("windows/disk.md", "# Disk")
            .await
            .expect("put");

        let keys = store.list_runbooks(Some("linux/")).await.expect("list");
        assert_eq!(keys, vec!["linux/memory.md".to_string()]);
    }

    #[tokio::test]
    async fn test_missing_runbook_is_none_not_error() {
        let store = RunbookStore::in_memory("runbooks");
        let content = store
            .get_runbook_content("does-not-exist.md")
            .await
            .expect("missing object should not error");
        assert!(content.is_none());
    }

    #[tokio::test]
    async fn test_put_then_get_round_trips_utf8() {
        let store = RunbookStore::in_memory("runbooks");
        let body = "---\ntitle: Test\n---\n## Section\ncontent with unicode: åäö";
        store.put_runbook("test.md", body).await.expect("put");

        let content = store
            .get_runbook_content("test.md")
            .await
            .expect("get")
            .expect("content present");
        assert_eq!(content, body);
    }

    #[tokio::test]
    async fn test_delete_runbook_is_idempotent() {
        let store = RunbookStore::in_memory("runbooks");
        store.put_runbook("gone.md", "# Gone").await.expect("put");
        store.delete_runbook("gone.md").await.expect("delete");
        store
            .delete_runbook("gone.md")
            .await
            .expect("second delete should be a no-op");
        assert!(store
            .get_runbook_content("gone.md")
            .await
            .expect("get")
            .is_none());
    }
}
