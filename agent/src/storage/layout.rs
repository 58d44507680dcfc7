//! Archive layout under the working directory

use std::path::PathBuf;

use chrono::NaiveDate;

use crate::filesys::dir::Dir;
use crate::filesys::file::File;
use crate::utils::{artifact_filename, daily_dir_name, log_file_name};

/// Where artifacts land for one run day
#[derive(Debug, Clone)]
pub struct ArchiveLayout {
    /// Base directory for all generated folders
    pub work_dir: PathBuf,

    /// Run date, fixed for the whole run
    pub date: NaiveDate,
}

impl ArchiveLayout {
    /// Create a new archive layout
    pub fn new(work_dir: impl Into<PathBuf>, date: NaiveDate) -> Self {
        Self {
            work_dir: work_dir.into(),
            date,
        }
    }

    /// Artifact filename for a device on the run date
    pub fn filename(&self, hostname: &str) -> String {
        artifact_filename(self.date, hostname)
    }

    /// Per-device history folder: `./{hostname}/`
    pub fn device_dir(&self, hostname: &str) -> Dir {
        Dir::new(self.work_dir.join(hostname))
    }

    /// Daily aggregate folder: `./{yyMMdd} running-configs/`
    pub fn daily_dir(&self) -> Dir {
        Dir::new(self.work_dir.join(daily_dir_name(self.date)))
    }

    /// Per-device archive file
    pub fn device_file(&self, hostname: &str) -> File {
        self.device_dir(hostname).file(&self.filename(hostname))
    }

    /// Daily aggregate archive file
    pub fn daily_file(&self, hostname: &str) -> File {
        self.daily_dir().file(&self.filename(hostname))
    }

    /// Default log file: `./{yyMMdd} script.log`
    pub fn log_file(&self) -> File {
        File::new(self.work_dir.join(log_file_name(self.date)))
    }
}
