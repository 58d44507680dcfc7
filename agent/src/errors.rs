//! Error types for the backup agent

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Which half of the archive step failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveStage {
    /// Copy into the per-device history folder
    DeviceCopy,

    /// Move into the daily aggregate folder
    DailyMove,
}

impl fmt::Display for ArchiveStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArchiveStage::DeviceCopy => write!(f, "per-device copy"),
            ArchiveStage::DailyMove => write!(f, "daily move"),
        }
    }
}

/// Main error type for the backup agent
#[derive(Error, Debug)]
pub enum BackupError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Receiver configuration artifact is absent. Fatal to the run.
    #[error("Receiver configuration missing: {}", .0.display())]
    ConfigMissing(PathBuf),

    #[error("Receiver start error: {0}")]
    ReceiverStart(String),

    /// Best-effort stop failure. Logged, never surfaced as a run failure.
    #[error("Receiver stop error: {0}")]
    ReceiverStop(String),

    #[error("Connect error: {0}")]
    ConnectError(String),

    #[error("Send error: {0}")]
    SendError(String),

    #[error("No command for brand '{brand}' and function '{function}'")]
    CommandResolution { brand: String, function: String },

    #[error("Artifact {} not received within {timeout_ms}ms", .path.display())]
    ArtifactTimeout { path: PathBuf, timeout_ms: u128 },

    #[error("Archive error ({stage}): {source}")]
    ArchiveIo {
        stage: ArchiveStage,
        #[source]
        source: std::io::Error,
    },

    #[error("Credentials error: {0}")]
    Credentials(String),

    #[error("Inventory error: {0}")]
    Inventory(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Run state error: {0}")]
    RunState(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<anyhow::Error> for BackupError {
    fn from(err: anyhow::Error) -> Self {
        BackupError::Internal(err.to_string())
    }
}
