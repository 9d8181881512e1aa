use anyhow::Result;
use async_trait::async_trait;
use std::path::PathBuf;
use tracing::debug;
use uuid::Uuid;

use crate::config::StorageConfig;
use crate::utils::error::ApiError;

/// Raw image upload, as received from a multipart form field.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// Blob storage for menu item images. The domain only ever sees opaque
/// relative paths; where the bytes live is this trait's concern.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Store image bytes and return the path they can be retrieved under.
    async fn store(&self, bytes: &[u8], extension: &str) -> Result<String, ApiError>;

    async fn delete(&self, path: &str) -> Result<(), ApiError>;

    async fn exists(&self, path: &str) -> bool;

    /// Well-known path used when a menu item has no uploaded image.
    fn placeholder(&self) -> &str;
}

/// Filesystem-backed image store.
pub struct LocalImageStore {
    root: PathBuf,
    placeholder: String,
}

impl LocalImageStore {
    pub fn new(config: &StorageConfig) -> Result<Self> {
        let root = PathBuf::from(&config.root_dir);
        std::fs::create_dir_all(root.join("menu-items"))?;

        Ok(Self {
            root,
            placeholder: config.placeholder_image.clone(),
        })
    }

    fn resolve(&self, path: &str) -> PathBuf {
        self.root.join(path)
    }
}

#[async_trait]
impl ImageStore for LocalImageStore {
    async fn store(&self, bytes: &[u8], extension: &str) -> Result<String, ApiError> {
        let path = format!("menu-items/{}.{}", Uuid::new_v4(), extension);
        let target = self.resolve(&path);

        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| ApiError::InternalError(format!("Failed to create image dir: {}", e)))?;
        }

        tokio::fs::write(&target, bytes)
            .await
            .map_err(|e| ApiError::InternalError(format!("Failed to store image: {}", e)))?;

        debug!("Stored image {} ({} bytes)", path, bytes.len());

        Ok(path)
    }

    async fn delete(&self, path: &str) -> Result<(), ApiError> {
        tokio::fs::remove_file(self.resolve(path))
            .await
            .map_err(|e| ApiError::InternalError(format!("Failed to delete image {}: {}", path, e)))?;

        debug!("Deleted image {}", path);

        Ok(())
    }

    async fn exists(&self, path: &str) -> bool {
        tokio::fs::try_exists(self.resolve(path)).await.unwrap_or(false)
    }

    fn placeholder(&self) -> &str {
        &self.placeholder
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_store() -> LocalImageStore {
        let root = std::env::temp_dir().join(format!("cafe-images-{}", Uuid::new_v4()));
        let config = StorageConfig {
            root_dir: root.to_string_lossy().into_owned(),
            placeholder_image: "menu-items/placeholder.png".to_string(),
        };
        LocalImageStore::new(&config).expect("create store")
    }

    #[tokio::test]
    async fn store_then_exists_then_delete() {
        let store = test_store();

        let path = store.store(b"fake png bytes", "png").await.expect("store");
        assert!(path.starts_with("menu-items/"));
        assert!(path.ends_with(".png"));
        assert!(store.exists(&path).await);

        store.delete(&path).await.expect("delete");
        assert!(!store.exists(&path).await);
    }

    #[tokio::test]
    async fn missing_path_does_not_exist() {
        let store = test_store();
        assert!(!store.exists("menu-items/nope.png").await);
    }

    #[test]
    fn placeholder_comes_from_config() {
        let store = test_store();
        assert_eq!(store.placeholder(), "menu-items/placeholder.png");
    }
}
