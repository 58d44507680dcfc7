//! SSH transport backed by russh

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use russh::client::{self, Handle, Msg};
use russh::{Channel, Disconnect};
use russh_keys::key::PublicKey;
use secrecy::ExposeSecret;
use tracing::debug;

use crate::credentials::Credentials;
use crate::errors::BackupError;
use crate::session::{ShellSession, ShellTransport};

const TERMINAL: &str = "vt100";
const TERMINAL_COLS: u32 = 200;
const TERMINAL_ROWS: u32 = 24;

/// Accepts any host key. Keys are not tracked between runs.
struct AcceptHostKey;

#[async_trait]
impl client::Handler for AcceptHostKey {
    type Error = russh::Error;

    async fn check_server_key(&mut self, server_public_key: &PublicKey) -> Result<bool, Self::Error> {
        debug!("Server key fingerprint: {}", server_public_key.fingerprint());
        Ok(true)
    }
}

/// Opens password-authenticated SSH shells
#[derive(Debug, Clone)]
pub struct SshTransport {
    connect_timeout: Duration,
}

impl SshTransport {
    pub fn new(connect_timeout: Duration) -> Self {
        Self { connect_timeout }
    }

    async fn connect(
        &self,
        address: &str,
        port: u16,
        credentials: &Credentials,
    ) -> Result<SshShell, russh::Error> {
        let config = Arc::new(client::Config {
            inactivity_timeout: Some(Duration::from_secs(60)),
            ..Default::default()
        });

        let mut handle = client::connect(config, (address, port), AcceptHostKey).await?;

        let authenticated = handle
            .authenticate_password(
                credentials.username.clone(),
                credentials.password.expose_secret(),
            )
            .await?;
        if !authenticated {
            return Err(russh::Error::NotAuthenticated);
        }

        let channel = handle.channel_open_session().await?;
        channel
            .request_pty(false, TERMINAL, TERMINAL_COLS, TERMINAL_ROWS, 0, 0, &[])
            .await?;
        channel.request_shell(false).await?;

        Ok(SshShell { handle, channel })
    }
}

#[async_trait]
impl ShellTransport for SshTransport {
    async fn open_shell(
        &self,
        address: &str,
        port: u16,
        credentials: &Credentials,
    ) -> Result<Box<dyn ShellSession>, BackupError> {
        match tokio::time::timeout(self.connect_timeout, self.connect(address, port, credentials))
            .await
        {
            Ok(Ok(shell)) => Ok(Box::new(shell)),
            Ok(Err(e)) => Err(BackupError::ConnectError(format!("{}:{}: {}", address, port, e))),
            Err(_) => Err(BackupError::ConnectError(format!(
                "{}:{}: timed out after {:?}",
                address, port, self.connect_timeout
            ))),
        }
    }
}

struct SshShell {
    handle: Handle<AcceptHostKey>,
    channel: Channel<Msg>,
}

#[async_trait]
impl ShellSession for SshShell {
    async fn write(&mut self, data: &[u8]) -> Result<(), BackupError> {
        self.channel
            .data(data)
            .await
            .map_err(|e| BackupError::SendError(e.to_string()))
    }

    async fn close(&mut self) -> Result<(), BackupError> {
        let _ = self.channel.eof().await;
        let _ = self.channel.close().await;
        self.handle
            .disconnect(Disconnect::ByApplication, "", "en")
            .await
            .map_err(|e| BackupError::ConnectError(e.to_string()))
    }
}
