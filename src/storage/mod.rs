pub mod local;
pub mod memory;
pub mod traits;

use crate::{
    config::StorageConfig,
    error::{Result, TryOnError},
};
use std::sync::Arc;
use traits::BlobStorage;

pub use local::LocalBlobStorage;
pub use memory::MemoryBlobStorage;
pub use traits::{BlobStorage as BlobStorageTrait, StorageStats};

pub struct BlobStorageManager {
    backend: Arc<dyn BlobStorage>,
}

impl BlobStorageManager {
    /// Local directory when one is configured, in-memory otherwise.
    pub async fn new(config: StorageConfig) -> Result<Self> {
        let backend: Arc<dyn BlobStorage> = if config.root_dir.is_some() {
            Arc::new(LocalBlobStorage::new(config).await?)
        } else {
            log::warn!("No TRYON_STORAGE_DIR configured, stored results live in memory only");
            Arc::new(MemoryBlobStorage::from_config(&config))
        };

        Ok(Self { backend })
    }

    pub fn from_backend(backend: Arc<dyn BlobStorage>) -> Self {
        Self { backend }
    }

    pub fn storage(&self) -> &Arc<dyn BlobStorage> {
        &self.backend
    }
}

impl BlobStorageManager {
    pub async fn upload(&self, path: &str, content: Vec<u8>) -> Result<String> {
        self.backend.upload(path, content).await
    }

    pub async fn temp_url(&self, file_id: &str) -> Result<String> {
        self.backend.temp_url(file_id).await
    }

    pub async fn download(&self, file_id: &str) -> Result<Option<Vec<u8>>> {
        self.backend.download(file_id).await
    }

    pub async fn delete(&self, file_id: &str) -> Result<bool> {
        self.backend.delete(file_id).await
    }

    pub async fn stats(&self) -> Result<StorageStats> {
        self.backend.stats().await
    }

    pub async fn health_check(&self) -> Result<bool> {
        self.backend.health_check().await
    }

    pub fn serves_public_urls(&self) -> bool {
        self.backend.serves_public_urls()
    }
}

/// `{base}/blobs/{file_id}`, the route the server exposes stored blobs on.
pub(crate) fn blob_url(public_base_url: Option<&str>, file_id: &str) -> Result<String> {
    match public_base_url {
        Some(base) => Ok(format!("{}/blobs/{}", base.trim_end_matches('/'), file_id)),
        None => Err(TryOnError::StorageError(
            "TRYON_PUBLIC_URL is not set, stored blobs have no public URL".into(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn falls_back_to_memory_without_a_directory() {
        let manager = BlobStorageManager::new(StorageConfig::new()).await.unwrap();
        assert_eq!(manager.stats().await.unwrap().backend, "memory");
        assert!(!manager.serves_public_urls());
    }

    #[tokio::test]
    async fn memory_backend_honours_public_url_and_limit() {
        let manager = BlobStorageManager::new(
            StorageConfig::new()
                .with_public_base_url("http://localhost:8080")
                .with_memory_limit(4),
        )
        .await
        .unwrap();

        assert!(manager.serves_public_urls());
        let id = manager.upload("a.png", vec![0; 4]).await.unwrap();
        assert_eq!(
            manager.temp_url(&id).await.unwrap(),
            "http://localhost:8080/blobs/a.png"
        );
        assert!(manager.upload("b.png", vec![0; 5]).await.is_err());
    }

    #[test]
    fn blob_urls_need_a_base() {
        assert_eq!(
            blob_url(Some("https://tryon.example.com/"), "x/y.png").unwrap(),
            "https://tryon.example.com/blobs/x/y.png"
        );
        assert!(blob_url(None, "x/y.png").is_err());
    }

    #[tokio::test]
    async fn uses_local_directory_when_configured() {
        let dir = tempfile::tempdir().unwrap();
        let manager = BlobStorageManager::new(StorageConfig::new().with_root_dir(dir.path()))
            .await
            .unwrap();
        assert_eq!(manager.stats().await.unwrap().backend, "local");
        assert!(manager.health_check().await.unwrap());
    }
}
