//! File operations

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use crate::errors::BackupError;

/// A file wrapper with path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct File {
    path: PathBuf,
}

impl File {
    /// Create a new file reference
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Get the file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Check if the file exists
    pub async fn exists(&self) -> bool {
        fs::metadata(&self.path)
            .await
            .map(|m| m.is_file())
            .unwrap_or(false)
    }

    /// Size in bytes, `None` if the file does not exist
    pub async fn size(&self) -> Option<u64> {
        fs::metadata(&self.path)
            .await
            .ok()
            .filter(|m| m.is_file())
            .map(|m| m.len())
    }

    /// Read file contents as string
    pub async fn read_string(&self) -> Result<String, BackupError> {
        let mut file = fs::File::open(&self.path).await?;
        let mut contents = String::new();
        file.read_to_string(&mut contents).await?;
        Ok(contents)
    }

    /// Read file contents as bytes
    pub async fn read_bytes(&self) -> Result<Vec<u8>, BackupError> {
        let mut file = fs::File::open(&self.path).await?;
        let mut contents = Vec::new();
        file.read_to_end(&mut contents).await?;
        Ok(contents)
    }

    /// Read file as JSON
    pub async fn read_json<T: DeserializeOwned>(&self) -> Result<T, BackupError> {
        let contents = self.read_string().await?;
        let value = serde_json::from_str(&contents)?;
        Ok(value)
    }

    /// Write bytes to file
    pub async fn write_bytes(&self, contents: &[u8]) -> Result<(), BackupError> {
        // Ensure parent directory exists
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let mut file = fs::File::create(&self.path).await?;
        file.write_all(contents).await?;
        file.sync_all().await?;
        Ok(())
    }

    /// Copy this file to `dest`, replacing any existing file there
    pub async fn copy_to(&self, dest: &File) -> std::io::Result<()> {
        fs::copy(&self.path, &dest.path).await?;
        Ok(())
    }

    /// Move this file to `dest`, replacing any existing file there.
    ///
    /// Falls back to copy and delete when a rename is not possible, for
    /// example across filesystems.
    pub async fn move_to(&self, dest: &File) -> std::io::Result<()> {
        if fs::metadata(&dest.path).await.is_ok() {
            fs::remove_file(&dest.path).await?;
        }

        match fs::rename(&self.path, &dest.path).await {
            Ok(()) => Ok(()),
            Err(rename_err) => {
                if fs::copy(&self.path, &dest.path).await.is_err() {
                    return Err(rename_err);
                }
                fs::remove_file(&self.path).await
            }
        }
    }

    /// Delete the file
    pub async fn delete(&self) -> Result<(), BackupError> {
        if self.exists().await {
            fs::remove_file(&self.path).await?;
        }
        Ok(())
    }
}
