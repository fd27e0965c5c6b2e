use std::collections::{HashMap, VecDeque};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{
    config::{StorageConfig, DEFAULT_MEMORY_LIMIT_BYTES},
    error::{Result, TryOnError},
    storage::{
        blob_url,
        traits::{BlobStorage, StorageStats},
    },
};

#[derive(Default)]
struct MemoryBlobs {
    blobs: HashMap<String, Vec<u8>>,
    /// Upload order, oldest first.
    order: VecDeque<String>,
    total_bytes: usize,
}

impl MemoryBlobs {
    fn remove(&mut self, file_id: &str) -> Option<Vec<u8>> {
        let blob = self.blobs.remove(file_id)?;
        self.total_bytes -= blob.len();
        self.order.retain(|id| id != file_id);
        Some(blob)
    }
}

/// Process-local blob store; contents vanish with the process. Once the
/// stored bytes pass the limit the oldest blobs are evicted.
pub struct MemoryBlobStorage {
    inner: RwLock<MemoryBlobs>,
    limit_bytes: usize,
    public_base_url: Option<String>,
}

impl Default for MemoryBlobStorage {
    fn default() -> Self {
        Self {
            inner: RwLock::new(MemoryBlobs::default()),
            limit_bytes: DEFAULT_MEMORY_LIMIT_BYTES,
            public_base_url: None,
        }
    }
}

impl MemoryBlobStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &StorageConfig) -> Self {
        Self {
            limit_bytes: config.memory_limit_bytes,
            public_base_url: config.public_base_url.clone(),
            ..Self::default()
        }
    }

    pub fn with_limit(mut self, limit_bytes: usize) -> Self {
        self.limit_bytes = limit_bytes;
        self
    }

    pub fn with_public_base_url(mut self, url: impl Into<String>) -> Self {
        self.public_base_url = Some(url.into());
        self
    }
}

#[async_trait]
impl BlobStorage for MemoryBlobStorage {
    async fn upload(&self, path: &str, content: Vec<u8>) -> Result<String> {
        if content.len() > self.limit_bytes {
            return Err(TryOnError::StorageError(format!(
                "blob of {} bytes exceeds the in-memory limit of {} bytes",
                content.len(),
                self.limit_bytes
            )));
        }

        let file_id = path.trim_start_matches('/').to_string();
        let mut inner = self.inner.write().await;
        inner.remove(&file_id);
        inner.total_bytes += content.len();
        inner.blobs.insert(file_id.clone(), content);
        inner.order.push_back(file_id.clone());

        while inner.total_bytes > self.limit_bytes {
            let Some(oldest) = inner.order.front().cloned() else {
                break;
            };
            inner.remove(&oldest);
            log::debug!("Evicted {} from in-memory storage", oldest);
        }

        Ok(file_id)
    }

    async fn temp_url(&self, file_id: &str) -> Result<String> {
        if !self.inner.read().await.blobs.contains_key(file_id) {
            return Err(TryOnError::StorageError(format!("no such file: {}", file_id)));
        }
        blob_url(self.public_base_url.as_deref(), file_id)
    }

    async fn download(&self, file_id: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.inner.read().await.blobs.get(file_id).cloned())
    }

    async fn delete(&self, file_id: &str) -> Result<bool> {
        Ok(self.inner.write().await.remove(file_id).is_some())
    }

    async fn stats(&self) -> Result<StorageStats> {
        let inner = self.inner.read().await;
        Ok(StorageStats {
            backend: "memory".to_string(),
            total_files: inner.blobs.len(),
            total_bytes: inner.total_bytes as u64,
        })
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    fn serves_public_urls(&self) -> bool {
        self.public_base_url.is_some()
    }
}
