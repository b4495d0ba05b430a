//! Asset storage boundary.
//!
//! Binary upload/delete is an external collaborator; the pipeline only
//! depends on the [`AssetStore`] trait. [`LocalAssetStore`] writes files
//! under a configured root directory and serves as the default backend.

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::path::PathBuf;

use crate::error::{AdvisorError, Result};

/// A file handed to the ingestion pipeline.
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub name: String,
    pub mime_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// Result of storing one binary asset.
#[derive(Debug, Clone)]
pub struct StoredAsset {
    pub url: String,
    pub public_id: String,
    pub bytes: i64,
    pub width: Option<i64>,
    pub height: Option<i64>,
}

#[async_trait]
pub trait AssetStore: Send + Sync {
    async fn upload(&self, file: &UploadFile, folder: &str) -> Result<StoredAsset>;
    async fn delete(&self, public_id: &str) -> Result<()>;
}

/// Stores assets on the local filesystem under `root/folder/`.
///
/// The public id is `folder/<hash-prefix>_<name>`, where the prefix is the
/// first 12 hex chars of the content's SHA-256, so re-uploading identical
/// bytes is idempotent.
pub struct LocalAssetStore {
    root: PathBuf,
}

impl LocalAssetStore {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    fn path_for(&self, public_id: &str) -> PathBuf {
        self.root.join(public_id)
    }
}

#[async_trait]
impl AssetStore for LocalAssetStore {
    async fn upload(&self, file: &UploadFile, folder: &str) -> Result<StoredAsset> {
        if file.bytes.is_empty() {
            return Err(AdvisorError::InvalidInput(format!(
                "file '{}' is empty",
                file.name
            )));
        }

        let mut hasher = Sha256::new();
        hasher.update(&file.bytes);
        let hash = format!("{:x}", hasher.finalize());

        let safe_name: String = file
            .name
            .chars()
            .map(|c| if c.is_alphanumeric() || c == '.' || c == '-' { c } else { '_' })
            .collect();
        let public_id = format!("{}/{}_{}", folder, &hash[..12], safe_name);

        let path = self.path_for(&public_id);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| AdvisorError::InvalidState(format!("asset root unwritable: {e}")))?;
        }
        tokio::fs::write(&path, &file.bytes)
            .await
            .map_err(|e| AdvisorError::InvalidState(format!("asset write failed: {e}")))?;

        Ok(StoredAsset {
            url: format!("file://{}", path.display()),
            public_id,
            bytes: file.bytes.len() as i64,
            width: None,
            height: None,
        })
    }

    async fn delete(&self, public_id: &str) -> Result<()> {
        let path = self.path_for(public_id);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(AdvisorError::NotFound(format!("asset {public_id}")))
            }
            Err(e) => Err(AdvisorError::InvalidState(format!(
                "asset delete failed: {e}"
            ))),
        }
    }
}
