//! Interactive shell sessions on devices

pub mod ssh;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::credentials::Credentials;
use crate::errors::BackupError;

/// Terminates every line written to a device shell
pub const LINE_ENDING: &str = "\r";

/// An open interactive shell
#[async_trait]
pub trait ShellSession: Send {
    /// Write raw bytes to the shell
    async fn write(&mut self, data: &[u8]) -> Result<(), BackupError>;

    /// Release the shell and its transport
    async fn close(&mut self) -> Result<(), BackupError>;
}

/// Opens interactive shells on devices
#[async_trait]
pub trait ShellTransport: Send + Sync {
    async fn open_shell(
        &self,
        address: &str,
        port: u16,
        credentials: &Credentials,
    ) -> Result<Box<dyn ShellSession>, BackupError>;
}

/// A shell session bound to one device
pub struct DeviceSession {
    hostname: String,
    shell: Box<dyn ShellSession>,
}

impl DeviceSession {
    /// Open a shell and flush the login banner with an empty line.
    ///
    /// Devices drop the first command typed into a fresh shell without it.
    pub async fn open(
        transport: &dyn ShellTransport,
        hostname: &str,
        address: &str,
        port: u16,
        credentials: &Credentials,
    ) -> Result<Self, BackupError> {
        debug!(hostname, "Opening session to {}:{}", address, port);

        let shell = transport
            .open_shell(address, port, credentials)
            .await
            .map_err(|e| match e {
                BackupError::ConnectError(_) => e,
                other => BackupError::ConnectError(other.to_string()),
            })?;

        let mut session = Self {
            hostname: hostname.to_string(),
            shell,
        };

        if let Err(e) = session.shell.write(LINE_ENDING.as_bytes()).await {
            session.close().await;
            return Err(BackupError::ConnectError(format!("banner flush failed: {}", e)));
        }

        Ok(session)
    }

    /// Send one command line. Does not wait for output.
    pub async fn send(&mut self, command: &str) -> Result<(), BackupError> {
        debug!(hostname = %self.hostname, "Sending: {}", command);
        let line = format!("{}{}", command, LINE_ENDING);
        self.shell.write(line.as_bytes()).await.map_err(|e| match e {
            BackupError::SendError(_) => e,
            other => BackupError::SendError(other.to_string()),
        })
    }

    /// Close the session. Failures are logged only.
    pub async fn close(mut self) {
        if let Err(e) = self.shell.close().await {
            warn!(hostname = %self.hostname, "Failed to close session: {}", e);
        } else {
            debug!(hostname = %self.hostname, "Session closed");
        }
    }
}
