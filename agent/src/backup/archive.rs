//! Placement of received artifacts into the archive folders

use std::path::PathBuf;

use serde::Serialize;
use tracing::{debug, info};

use crate::errors::{ArchiveStage, BackupError};
use crate::filesys::file::File;
use crate::storage::layout::ArchiveLayout;
use crate::utils::sha256_hash;

/// Where an artifact ended up
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArchivedArtifact {
    /// `./{hostname}/{filename}`, latest of the day
    pub device_path: PathBuf,

    /// `./{yyMMdd} running-configs/{filename}`
    pub daily_path: PathBuf,

    /// Size in bytes
    pub size: u64,

    /// SHA256 of the content
    pub sha256: String,
}

/// Copies into the per-device folder, then moves into the daily folder
#[derive(Debug, Clone)]
pub struct ArchiveOrganizer {
    layout: ArchiveLayout,
}

impl ArchiveOrganizer {
    pub fn new(layout: ArchiveLayout) -> Self {
        Self { layout }
    }

    /// Archive `source` for `hostname` under `filename`.
    ///
    /// Existing files of the same name are replaced. On success `source` no
    /// longer exists.
    pub async fn archive(
        &self,
        source: &File,
        hostname: &str,
        filename: &str,
    ) -> Result<ArchivedArtifact, BackupError> {
        let device_dir = self.layout.device_dir(hostname);
        let device_file = device_dir.file(filename);
        device_dir
            .create()
            .await
            .map_err(|e| archive_error(ArchiveStage::DeviceCopy, e))?;
        source
            .copy_to(&device_file)
            .await
            .map_err(|e| archive_error(ArchiveStage::DeviceCopy, e))?;
        debug!(hostname, "Copied to {}", device_file.path().display());

        // Size and digest describe the archived copy
        let contents = device_file.read_bytes().await.map_err(|e| match e {
            BackupError::IoError(source) => archive_error(ArchiveStage::DeviceCopy, source),
            other => other,
        })?;

        let daily_dir = self.layout.daily_dir();
        let daily_file = daily_dir.file(filename);
        daily_dir
            .create()
            .await
            .map_err(|e| archive_error(ArchiveStage::DailyMove, e))?;
        source
            .move_to(&daily_file)
            .await
            .map_err(|e| archive_error(ArchiveStage::DailyMove, e))?;
        debug!(hostname, "Moved to {}", daily_file.path().display());

        info!(hostname, "Archived {} ({} bytes)", filename, contents.len());

        Ok(ArchivedArtifact {
            device_path: device_file.path().to_path_buf(),
            daily_path: daily_file.path().to_path_buf(),
            size: contents.len() as u64,
            sha256: sha256_hash(&contents),
        })
    }
}

fn archive_error(stage: ArchiveStage, source: std::io::Error) -> BackupError {
    BackupError::ArchiveIo { stage, source }
}
