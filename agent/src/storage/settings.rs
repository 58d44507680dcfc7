//! Settings file management

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use secrecy::SecretString;
use serde::{Deserialize, Deserializer};
use tracing::debug;

use crate::errors::BackupError;
use crate::filesys::file::File;
use crate::logs::LogLevel;

/// Settings file looked up when none is given on the command line
pub const DEFAULT_SETTINGS_FILE: &str = "swbackup.json";

/// Agent settings
#[derive(Debug, Deserialize)]
pub struct Settings {
    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,

    /// Log file path, defaults to `{work_dir}/{yyMMdd} script.log`
    #[serde(default)]
    pub log_file: Option<PathBuf>,

    /// Write the log file at all
    #[serde(default = "default_true")]
    pub log_to_file: bool,

    /// Directory the archive folders are created in
    #[serde(default = "default_work_dir")]
    pub work_dir: PathBuf,

    /// Inventory column delimiter
    #[serde(default = "default_delimiter")]
    pub inventory_delimiter: char,

    /// File receiver (TFTP server) configuration
    #[serde(default)]
    pub receiver: ReceiverSettings,

    /// SSH session configuration
    #[serde(default)]
    pub ssh: SshSettings,

    /// Artifact wait configuration
    #[serde(default)]
    pub wait: WaitSettings,

    /// Extra command templates merged over the built-in catalog
    #[serde(default)]
    pub catalog_file: Option<PathBuf>,

    /// Device credentials
    #[serde(default)]
    pub credentials: CredentialSettings,
}

fn default_true() -> bool {
    true
}

fn default_work_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_delimiter() -> char {
    ';'
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Info,
            log_file: None,
            log_to_file: true,
            work_dir: default_work_dir(),
            inventory_delimiter: default_delimiter(),
            receiver: ReceiverSettings::default(),
            ssh: SshSettings::default(),
            wait: WaitSettings::default(),
            catalog_file: None,
            credentials: CredentialSettings::default(),
        }
    }
}

impl Settings {
    /// Load settings.
    ///
    /// An explicitly named file must exist. Without one, the default file is
    /// read if present and built-in defaults are used otherwise.
    pub async fn load(path: Option<&Path>) -> Result<Self, BackupError> {
        let file = File::new(path.unwrap_or_else(|| Path::new(DEFAULT_SETTINGS_FILE)));

        if !file.exists().await {
            if path.is_some() {
                return Err(BackupError::Config(format!(
                    "Settings file not found: {}",
                    file.path().display()
                )));
            }
            debug!("No settings file at {}, using defaults", file.path().display());
            return Ok(Self::default());
        }

        file.read_json().await
    }
}

/// File receiver settings
#[derive(Debug, Clone, Deserialize)]
pub struct ReceiverSettings {
    /// Program launched as the receiver
    #[serde(default = "default_receiver_program")]
    pub program: String,

    /// Arguments passed to the program
    #[serde(default)]
    pub args: Vec<String>,

    /// Configuration artifact the receiver needs, relative to the work dir
    #[serde(default = "default_receiver_config")]
    pub config_file: PathBuf,

    /// Directory uploads land in, defaults to the work dir
    #[serde(default)]
    pub root_dir: Option<PathBuf>,

    /// Process name matched when stopping a receiver this run did not spawn
    #[serde(default)]
    pub process_name: Option<String>,

    /// Address devices upload to, detected from the default interface if unset
    #[serde(default)]
    pub address: Option<String>,
}

#[cfg(windows)]
fn default_receiver_program() -> String {
    "tftpd64.exe".to_string()
}

#[cfg(not(windows))]
fn default_receiver_program() -> String {
    "in.tftpd".to_string()
}

#[cfg(windows)]
fn default_receiver_config() -> PathBuf {
    PathBuf::from("tftpd32.ini")
}

#[cfg(not(windows))]
fn default_receiver_config() -> PathBuf {
    PathBuf::from("tftpd.conf")
}

impl ReceiverSettings {
    /// Directory uploads land in, resolved against `work_dir`
    pub fn upload_dir(&self, work_dir: &Path) -> PathBuf {
        match &self.root_dir {
            Some(dir) => work_dir.join(dir),
            None => work_dir.to_path_buf(),
        }
    }
}

impl Default for ReceiverSettings {
    fn default() -> Self {
        Self {
            program: default_receiver_program(),
            args: Vec::new(),
            config_file: default_receiver_config(),
            root_dir: None,
            process_name: None,
            address: None,
        }
    }
}

/// SSH session settings
#[derive(Debug, Clone, Deserialize)]
pub struct SshSettings {
    /// SSH port
    #[serde(default = "default_ssh_port")]
    pub port: u16,

    /// Connect and authentication timeout in milliseconds
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    /// Pause between the banner flush and the real command
    #[serde(default = "default_command_delay_ms")]
    pub command_delay_ms: u64,

    /// Pause before closing a session after a fire-and-forget command
    #[serde(default = "default_linger_ms")]
    pub linger_ms: u64,
}

fn default_ssh_port() -> u16 {
    22
}

fn default_connect_timeout_ms() -> u64 {
    10_000
}

fn default_command_delay_ms() -> u64 {
    500
}

fn default_linger_ms() -> u64 {
    1_000
}

impl Default for SshSettings {
    fn default() -> Self {
        Self {
            port: default_ssh_port(),
            connect_timeout_ms: default_connect_timeout_ms(),
            command_delay_ms: default_command_delay_ms(),
            linger_ms: default_linger_ms(),
        }
    }
}

/// Artifact wait settings
#[derive(Debug, Clone, Deserialize)]
pub struct WaitSettings {
    /// Upper bound on waiting for an upload, in milliseconds
    #[serde(default = "default_wait_timeout_ms")]
    pub timeout_ms: u64,

    /// Poll interval in milliseconds
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

fn default_wait_timeout_ms() -> u64 {
    10_000
}

fn default_poll_interval_ms() -> u64 {
    200
}

impl Default for WaitSettings {
    fn default() -> Self {
        Self {
            timeout_ms: default_wait_timeout_ms(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

/// Credential settings
#[derive(Debug, Default, Deserialize)]
pub struct CredentialSettings {
    /// Shared set for devices flagged to use default credentials
    #[serde(default)]
    pub default: Option<LoginSettings>,

    /// Per-hostname sets for the remaining devices
    #[serde(default)]
    pub devices: HashMap<String, LoginSettings>,
}

/// One username/password pair
#[derive(Debug, Deserialize)]
pub struct LoginSettings {
    pub username: String,

    #[serde(deserialize_with = "deserialize_secret")]
    pub password: SecretString,
}

fn deserialize_secret<'de, D>(deserializer: D) -> Result<SecretString, D::Error>
where
    D: Deserializer<'de>,
{
    String::deserialize(deserializer).map(SecretString::from)
}
