use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;

use crate::{
    config::StorageConfig,
    error::{Result, TryOnError},
    storage::{
        blob_url,
        traits::{BlobStorage, StorageStats},
    },
};

/// Blobs as files under a root directory. File ids are paths relative to
/// the root; URLs point at the server's `/blobs` route under the public base URL.
pub struct LocalBlobStorage {
    root: PathBuf,
    public_base_url: Option<String>,
}

impl LocalBlobStorage {
    pub async fn new(config: StorageConfig) -> Result<Self> {
        let root = config
            .root_dir
            .ok_or_else(|| TryOnError::ConfigError("TRYON_STORAGE_DIR is required".into()))?;

        tokio::fs::create_dir_all(&root)
            .await
            .map_err(|e| TryOnError::StorageError(format!("cannot create {}: {}", root.display(), e)))?;

        let root = tokio::fs::canonicalize(&root)
            .await
            .map_err(|e| TryOnError::StorageError(e.to_string()))?;

        let storage = Self {
            root,
            public_base_url: config
                .public_base_url
                .map(|url| url.trim_end_matches('/').to_string()),
        };

        storage.health_check().await?;
        Ok(storage)
    }

    fn resolve(&self, file_id: &str) -> Result<PathBuf> {
        let relative = Path::new(file_id);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)));
        if file_id.is_empty() || escapes {
            return Err(TryOnError::StorageError(format!("invalid file id: {}", file_id)));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl BlobStorage for LocalBlobStorage {
    async fn upload(&self, path: &str, content: Vec<u8>) -> Result<String> {
        let file_id = path.trim_start_matches('/').to_string();
        let target = self.resolve(&file_id)?;

        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| TryOnError::StorageError(e.to_string()))?;
        }
        tokio::fs::write(&target, &content)
            .await
            .map_err(|e| TryOnError::StorageError(format!("write {} failed: {}", file_id, e)))?;

        log::debug!("Stored {} bytes at {}", content.len(), target.display());
        Ok(file_id)
    }

    async fn temp_url(&self, file_id: &str) -> Result<String> {
        let target = self.resolve(file_id)?;
        if !tokio::fs::try_exists(&target).await.unwrap_or(false) {
            return Err(TryOnError::StorageError(format!("no such file: {}", file_id)));
        }

        blob_url(self.public_base_url.as_deref(), file_id)
    }

    async fn download(&self, file_id: &str) -> Result<Option<Vec<u8>>> {
        let target = self.resolve(file_id)?;
        match tokio::fs::read(&target).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(TryOnError::StorageError(e.to_string())),
        }
    }

    async fn delete(&self, file_id: &str) -> Result<bool> {
        let target = self.resolve(file_id)?;
        match tokio::fs::remove_file(&target).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(TryOnError::StorageError(e.to_string())),
        }
    }

    async fn stats(&self) -> Result<StorageStats> {
        let mut total_files = 0;
        let mut total_bytes = 0;
        let mut pending = vec![self.root.clone()];

        while let Some(dir) = pending.pop() {
            let mut entries = tokio::fs::read_dir(&dir)
                .await
                .map_err(|e| TryOnError::StorageError(e.to_string()))?;
            while let Some(entry) = entries
                .next_entry()
                .await
                .map_err(|e| TryOnError::StorageError(e.to_string()))?
            {
                let metadata = entry
                    .metadata()
                    .await
                    .map_err(|e| TryOnError::StorageError(e.to_string()))?;
                if metadata.is_dir() {
                    pending.push(entry.path());
                } else {
                    total_files += 1;
                    total_bytes += metadata.len();
                }
            }
        }

        Ok(StorageStats {
            backend: "local".to_string(),
            total_files,
            total_bytes,
        })
    }

    async fn health_check(&self) -> Result<bool> {
        let metadata = tokio::fs::metadata(&self.root)
            .await
            .map_err(|e| TryOnError::StorageError(e.to_string()))?;
        Ok(metadata.is_dir() && !metadata.permissions().readonly())
    }

    fn serves_public_urls(&self) -> bool {
        self.public_base_url.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn stores_files_and_builds_public_urls() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalBlobStorage::new(
            StorageConfig::new()
                .with_root_dir(dir.path())
                .with_public_base_url("https://tryon.example.com/"),
        )
        .await
        .unwrap();

        let id = storage
            .upload("tryon_results/42_abc.jpg", vec![1, 2, 3])
            .await
            .unwrap();
        assert_eq!(id, "tryon_results/42_abc.jpg");
        assert_eq!(
            storage.temp_url(&id).await.unwrap(),
            "https://tryon.example.com/blobs/tryon_results/42_abc.jpg"
        );
        assert_eq!(storage.download(&id).await.unwrap(), Some(vec![1, 2, 3]));

        let stats = storage.stats().await.unwrap();
        assert_eq!(stats.total_files, 1);
        assert_eq!(stats.total_bytes, 3);
    }

    #[tokio::test]
    async fn no_url_without_public_base() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalBlobStorage::new(StorageConfig::new().with_root_dir(dir.path()))
            .await
            .unwrap();

        let id = storage.upload("a.png", vec![0]).await.unwrap();
        assert!(!storage.serves_public_urls());
        assert!(matches!(
            storage.temp_url(&id).await.unwrap_err(),
            TryOnError::StorageError(_)
        ));
    }

    #[tokio::test]
    async fn rejects_paths_escaping_the_root() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalBlobStorage::new(StorageConfig::new().with_root_dir(dir.path()))
            .await
            .unwrap();

        assert!(storage.upload("../outside.png", vec![0]).await.is_err());
        assert!(storage.temp_url("missing.png").await.is_err());
        assert!(!storage.delete("missing.png").await.unwrap());
    }
}
