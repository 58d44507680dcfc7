//! Transient file receiver (TFTP server) lifecycle

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use serde::Serialize;
use sysinfo::{ProcessesToUpdate, System};
use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

use crate::errors::BackupError;
use crate::filesys::file::File;
use crate::storage::settings::ReceiverSettings;

#[cfg(windows)]
const CREATE_NO_WINDOW: u32 = 0x0800_0000;

/// Receiver lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReceiverState {
    Stopped,
    Starting,
    Running,
    Stopping,
}

/// The service devices upload artifacts to
#[async_trait]
pub trait FileReceiver: Send {
    /// Current lifecycle state
    fn state(&self) -> ReceiverState;

    /// Launch the receiver. Any error is fatal to the run.
    async fn start(&mut self) -> Result<(), BackupError>;

    /// Terminate the receiver. A receiver that is not running is not an error.
    async fn stop(&mut self) -> Result<(), BackupError>;
}

/// External TFTP server process
pub struct TftpReceiver {
    program: String,
    args: Vec<String>,
    config_file: File,
    root_dir: PathBuf,
    process_name: Option<String>,
    child: Option<Child>,
    state: ReceiverState,
}

impl TftpReceiver {
    /// Create a receiver; relative paths resolve against `work_dir`
    pub fn new(settings: &ReceiverSettings, work_dir: &Path) -> Self {
        Self {
            program: settings.program.clone(),
            args: settings.args.clone(),
            config_file: File::new(work_dir.join(&settings.config_file)),
            root_dir: settings.upload_dir(work_dir),
            process_name: settings.process_name.clone(),
            child: None,
            state: ReceiverState::Stopped,
        }
    }

    /// Directory uploads land in
    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    async fn spawn(&mut self) -> Result<Child, BackupError> {
        if !self.config_file.exists().await {
            return Err(BackupError::ConfigMissing(self.config_file.path().to_path_buf()));
        }

        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .current_dir(&self.root_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(false);

        #[cfg(windows)]
        command.creation_flags(CREATE_NO_WINDOW);

        let mut child = command
            .spawn()
            .map_err(|e| BackupError::ReceiverStart(format!("Failed to launch {}: {}", self.program, e)))?;

        if let Ok(Some(status)) = child.try_wait() {
            return Err(BackupError::ReceiverStart(format!(
                "{} exited immediately ({})",
                self.program, status
            )));
        }

        Ok(child)
    }

    fn stop_by_name(&self) -> Result<(), BackupError> {
        let Some(name) = self.process_name.as_deref() else {
            warn!("Receiver is not running, nothing to stop");
            return Ok(());
        };

        let mut system = System::new();
        system.refresh_processes(ProcessesToUpdate::All, true);

        let killed = system
            .processes_by_exact_name(OsStr::new(name))
            .filter(|process| process.kill())
            .count();

        if killed == 0 {
            warn!("No running process named {}", name);
        } else {
            info!("Terminated {} {} process(es)", killed, name);
        }
        Ok(())
    }
}

#[async_trait]
impl FileReceiver for TftpReceiver {
    fn state(&self) -> ReceiverState {
        self.state
    }

    async fn start(&mut self) -> Result<(), BackupError> {
        if self.state != ReceiverState::Stopped {
            return Err(BackupError::ReceiverStart(format!(
                "receiver is {:?}",
                self.state
            )));
        }

        info!("Starting receiver {} in {}", self.program, self.root_dir.display());
        self.state = ReceiverState::Starting;

        match self.spawn().await {
            Ok(child) => {
                debug!("Receiver pid: {:?}", child.id());
                self.child = Some(child);
                self.state = ReceiverState::Running;
                Ok(())
            }
            Err(e) => {
                self.state = ReceiverState::Stopped;
                Err(e)
            }
        }
    }

    async fn stop(&mut self) -> Result<(), BackupError> {
        info!("Stopping receiver {}", self.program);
        self.state = ReceiverState::Stopping;

        let result = match self.child.take() {
            Some(mut child) => match child.try_wait() {
                Ok(Some(status)) => {
                    warn!("Receiver already exited ({})", status);
                    Ok(())
                }
                _ => child
                    .kill()
                    .await
                    .map_err(|e| BackupError::ReceiverStop(e.to_string())),
            },
            None => self.stop_by_name(),
        };

        self.state = ReceiverState::Stopped;
        result
    }
}
