//! Per-device outcomes and the run summary

use chrono::NaiveDate;

use crate::backup::archive::ArchivedArtifact;
use crate::backup::fsm::RunState;
use crate::errors::BackupError;

/// How one device's processing ended
#[derive(Debug)]
pub enum DeviceOutcome {
    /// Config received and archived in both folders
    Archived(ArchivedArtifact),

    /// Custom command sent, nothing to collect
    CommandSent,

    /// Processing failed; the batch continued
    Failed(BackupError),

    /// Not attempted because the run was cancelled
    Skipped,
}

impl DeviceOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, DeviceOutcome::Archived(_) | DeviceOutcome::CommandSent)
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, DeviceOutcome::Failed(_))
    }
}

/// Outcome for one inventory row
#[derive(Debug)]
pub struct DeviceReport {
    pub hostname: String,
    pub outcome: DeviceOutcome,
}

/// Summary of a whole run
#[derive(Debug)]
pub struct RunReport {
    pub run_id: String,
    pub date: NaiveDate,
    pub state: RunState,
    pub devices: Vec<DeviceReport>,
}

impl RunReport {
    pub fn succeeded(&self) -> usize {
        self.devices.iter().filter(|d| d.outcome.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.devices.iter().filter(|d| d.outcome.is_failure()).count()
    }

    pub fn skipped(&self) -> usize {
        self.devices
            .iter()
            .filter(|d| matches!(d.outcome, DeviceOutcome::Skipped))
            .count()
    }

    /// Outcome for a hostname
    pub fn outcome(&self, hostname: &str) -> Option<&DeviceOutcome> {
        self.devices
            .iter()
            .find(|d| d.hostname == hostname)
            .map(|d| &d.outcome)
    }
}
