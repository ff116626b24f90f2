use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::SheetStoreError;

/// Local directory holding the uploaded spreadsheet files.
#[derive(Debug, Clone)]
pub struct UploadStorage {
    root: PathBuf,
}

impl UploadStorage {
    pub async fn new(root: impl Into<PathBuf>) -> Result<Self, SheetStoreError> {
        let root = root.into();
        tokio::fs::create_dir_all(&root).await.map_err(|e| {
            SheetStoreError::ConfigError {
                message: format!("Failed to create upload directory {}: {}", root.display(), e),
            }
        })?;

        info!("Storing uploads under {}", root.display());
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// A collision-free file name for an upload: `<millis>-<random><.ext>`,
    /// keeping the lowercased extension of the original name.
    pub fn stored_name_for(original_name: &str) -> String {
        let extension = Path::new(original_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| format!(".{}", ext.to_ascii_lowercase()))
            .unwrap_or_default();

        format!(
            "{}-{}{}",
            chrono::Utc::now().timestamp_millis(),
            rand::random_range(0..1_000_000_000u32),
            extension
        )
    }

    pub fn path_for(&self, stored_name: &str) -> Result<PathBuf, SheetStoreError> {
        let is_plain_name = Path::new(stored_name)
            .file_name()
            .is_some_and(|name| name == stored_name);
        if !is_plain_name {
            return Err(SheetStoreError::InternalError {
                message: format!("Refusing to use stored name '{}'", stored_name),
            });
        }
        Ok(self.root.join(stored_name))
    }

    pub async fn save(&self, stored_name: &str, bytes: &[u8]) -> Result<PathBuf, SheetStoreError> {
        let path = self.path_for(stored_name)?;
        tokio::fs::write(&path, bytes).await?;

        debug!("Wrote {} bytes to {}", bytes.len(), path.display());
        Ok(path)
    }

    /// Remove a stored file. Returns `false` when there was nothing to remove.
    pub async fn remove(&self, stored_name: &str) -> Result<bool, SheetStoreError> {
        let path = self.path_for(stored_name)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                debug!("Removed {}", path.display());
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}
