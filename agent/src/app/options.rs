//! Run configuration

use std::time::Duration;

use chrono::NaiveDate;

use crate::backup::waiter::WaitOptions;
use crate::filesys::dir::Dir;
use crate::storage::layout::ArchiveLayout;
use crate::storage::settings::Settings;

/// Everything one run needs to know, passed down explicitly
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Archive folders for the run date
    pub layout: ArchiveLayout,

    /// Directory the receiver writes uploads into
    pub receiver_root: Dir,

    /// Address devices upload to
    pub receiver_address: String,

    /// Session options
    pub session: SessionOptions,

    /// Artifact wait bounds
    pub wait: WaitOptions,
}

impl RunConfig {
    /// Build from settings for the given run date and receiver address
    pub fn from_settings(settings: &Settings, date: NaiveDate, receiver_address: String) -> Self {
        Self {
            layout: ArchiveLayout::new(settings.work_dir.clone(), date),
            receiver_root: Dir::new(settings.receiver.upload_dir(&settings.work_dir)),
            receiver_address,
            session: SessionOptions {
                port: settings.ssh.port,
                command_delay: Duration::from_millis(settings.ssh.command_delay_ms),
                linger: Duration::from_millis(settings.ssh.linger_ms),
            },
            wait: WaitOptions {
                timeout: Duration::from_millis(settings.wait.timeout_ms),
                poll_interval: Duration::from_millis(settings.wait.poll_interval_ms),
            },
        }
    }
}

/// Per-device session options
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// SSH port
    pub port: u16,

    /// Pause between the banner flush and the real command
    pub command_delay: Duration,

    /// Pause before closing after a fire-and-forget command
    pub linger: Duration,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            port: 22,
            command_delay: Duration::from_millis(500),
            linger: Duration::from_secs(1),
        }
    }
}
