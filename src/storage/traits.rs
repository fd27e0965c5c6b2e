use crate::error::Result;
use async_trait::async_trait;

#[async_trait]
pub trait BlobStorage: Send + Sync {
    /// Stores `content` at `path` and returns its file id.
    async fn upload(&self, path: &str, content: Vec<u8>) -> Result<String>;

    /// URL a client can render directly, served from the `/blobs` route.
    async fn temp_url(&self, file_id: &str) -> Result<String>;

    async fn download(&self, file_id: &str) -> Result<Option<Vec<u8>>>;

    async fn delete(&self, file_id: &str) -> Result<bool>;

    async fn stats(&self) -> Result<StorageStats>;

    async fn health_check(&self) -> Result<bool>;

    /// Whether `temp_url` yields an `http(s)` URL a client can load.
    fn serves_public_urls(&self) -> bool;
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct StorageStats {
    pub backend: String,
    pub total_files: usize,
    pub total_bytes: u64,
}
