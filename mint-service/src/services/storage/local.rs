//! Filesystem store, served back by this service under `/assets`.

use super::{validate_path, AssetStore, StoreError};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;

pub struct LocalStore {
    base_path: PathBuf,
    public_base: String,
}

impl LocalStore {
    /// `public_base` is the URL prefix the files are reachable under,
    /// either absolute (`http://localhost:8080/assets`) or host-relative
    /// (`/assets`).
    pub async fn new(
        base_path: impl Into<PathBuf>,
        public_base: impl Into<String>,
    ) -> Result<Self, StoreError> {
        let base_path = base_path.into();
        if !base_path.exists() {
            fs::create_dir_all(&base_path).await?;
        }
        Ok(Self {
            base_path,
            public_base: public_base.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }
}

#[async_trait]
impl AssetStore for LocalStore {
    async fn put(&self, path: &str, bytes: Vec<u8>, _content_type: &str) -> Result<String, StoreError> {
        validate_path(path)?;

        let target = self.base_path.join(path);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&target, bytes).await?;

        Ok(format!("{}/{}", self.public_base, path))
    }
}
