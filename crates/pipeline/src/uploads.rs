//! Temporary storage for uploaded CSV files.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use psgc_core::entity::EntityType;
use psgc_core::intake::CSV_EXTENSION;
use uuid::Uuid;

/// Directory holding uploaded files until their job is cleaned up or swept.
#[derive(Debug, Clone)]
pub struct UploadStorage {
    dir: PathBuf,
}

impl UploadStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Create the upload directory if it does not exist.
    pub async fn ensure_dir(&self) -> std::io::Result<()> {
        tokio::fs::create_dir_all(&self.dir).await
    }

    /// Write `data` under a fresh collision-free name and return its path.
    pub async fn save(&self, entity_type: EntityType, data: &[u8]) -> std::io::Result<PathBuf> {
        self.ensure_dir().await?;
        let stored_filename = format!(
            "{}_{}.{CSV_EXTENSION}",
            entity_type.upload_type(),
            Uuid::new_v4().simple()
        );
        let path = self.dir.join(stored_filename);
        tokio::fs::write(&path, data).await?;
        Ok(path)
    }
}

/// Delete an uploaded file. A file that is already gone counts as removed.
pub async fn remove_upload(path: &Path) -> std::io::Result<()> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}
