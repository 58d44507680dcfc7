//! In-memory collaborators for driving the orchestrator

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::NaiveDate;

use swbackup::app::options::RunConfig;
use swbackup::backup::orchestrator::BackupOrchestrator;
use swbackup::catalog::CommandCatalog;
use swbackup::credentials::{CredentialSource, Credentials};
use swbackup::errors::BackupError;
use swbackup::inventory::Device;
use swbackup::receiver::{FileReceiver, ReceiverState};
use swbackup::session::{ShellSession, ShellTransport};
use swbackup::storage::settings::Settings;

pub const RECEIVER_ADDRESS: &str = "10.0.0.5";

pub fn date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 7).unwrap()
}

pub fn config(work_dir: &Path, date: NaiveDate) -> RunConfig {
    let settings = Settings {
        work_dir: work_dir.to_path_buf(),
        ..Default::default()
    };
    RunConfig::from_settings(&settings, date, RECEIVER_ADDRESS.to_string())
}

pub fn device(hostname: &str, address: &str, brand: &str) -> Device {
    Device {
        hostname: hostname.to_string(),
        address: address.to_string(),
        brand: brand.to_string(),
        function: "backup".to_string(),
        command: None,
        use_default_credentials: true,
    }
}

// ============================================================================
// Receiver
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct ReceiverCounters {
    pub starts: Arc<AtomicUsize>,
    pub stops: Arc<AtomicUsize>,
}

impl ReceiverCounters {
    pub fn starts(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }

    pub fn stops(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }
}

pub struct FakeReceiver {
    counters: ReceiverCounters,
    fail_start: bool,
    state: ReceiverState,
}

impl FakeReceiver {
    pub fn new(counters: ReceiverCounters) -> Self {
        Self {
            counters,
            fail_start: false,
            state: ReceiverState::Stopped,
        }
    }

    pub fn failing(counters: ReceiverCounters) -> Self {
        Self {
            fail_start: true,
            ..Self::new(counters)
        }
    }
}

#[async_trait]
impl FileReceiver for FakeReceiver {
    fn state(&self) -> ReceiverState {
        self.state
    }

    async fn start(&mut self) -> Result<(), BackupError> {
        self.counters.starts.fetch_add(1, Ordering::SeqCst);
        if self.fail_start {
            return Err(BackupError::ConfigMissing(PathBuf::from("tftpd.conf")));
        }
        self.state = ReceiverState::Running;
        Ok(())
    }

    async fn stop(&mut self) -> Result<(), BackupError> {
        self.counters.stops.fetch_add(1, Ordering::SeqCst);
        self.state = ReceiverState::Stopped;
        Ok(())
    }
}

// ============================================================================
// Shell transport
// ============================================================================

/// How a fake device reacts
#[derive(Debug, Clone)]
pub enum Behavior {
    /// Upload the given content when told to copy its config
    Upload(Vec<u8>),
    /// Accept every command, never upload
    Silent,
    /// Refuse the connection
    Refuse,
    /// Accept the session but fail every command after the banner flush
    FailSend,
}

#[derive(Debug, Default)]
pub struct TransportLog {
    pub opened: Vec<String>,
    pub lines: Vec<(String, String)>,
    pub closed: usize,
}

impl TransportLog {
    /// Commands written to `address`, banner flushes excluded
    pub fn commands(&self, address: &str) -> Vec<String> {
        self.lines
            .iter()
            .filter(|(a, line)| a == address && line != "\r")
            .map(|(_, line)| line.clone())
            .collect()
    }
}

#[derive(Clone)]
pub struct FakeTransport {
    upload_root: PathBuf,
    behaviors: HashMap<String, Behavior>,
    pub log: Arc<Mutex<TransportLog>>,
}

impl FakeTransport {
    pub fn new(upload_root: &Path) -> Self {
        Self {
            upload_root: upload_root.to_path_buf(),
            behaviors: HashMap::new(),
            log: Arc::new(Mutex::new(TransportLog::default())),
        }
    }

    pub fn with(mut self, address: &str, behavior: Behavior) -> Self {
        self.behaviors.insert(address.to_string(), behavior);
        self
    }

    pub fn opened(&self) -> usize {
        self.log.lock().unwrap().opened.len()
    }

    pub fn closed(&self) -> usize {
        self.log.lock().unwrap().closed
    }

    pub fn commands(&self, address: &str) -> Vec<String> {
        self.log.lock().unwrap().commands(address)
    }
}

#[async_trait]
impl ShellTransport for FakeTransport {
    async fn open_shell(
        &self,
        address: &str,
        _port: u16,
        _credentials: &Credentials,
    ) -> Result<Box<dyn ShellSession>, BackupError> {
        let behavior = self
            .behaviors
            .get(address)
            .cloned()
            .unwrap_or(Behavior::Silent);

        if let Behavior::Refuse = behavior {
            return Err(BackupError::ConnectError(format!(
                "{}: connection refused",
                address
            )));
        }

        self.log.lock().unwrap().opened.push(address.to_string());
        Ok(Box::new(FakeShell {
            address: address.to_string(),
            behavior,
            upload_root: self.upload_root.clone(),
            log: self.log.clone(),
        }))
    }
}

struct FakeShell {
    address: String,
    behavior: Behavior,
    upload_root: PathBuf,
    log: Arc<Mutex<TransportLog>>,
}

/// Filename a copy command asks for: the quoted argument, or the last URL
/// segment
fn requested_filename(line: &str) -> Option<String> {
    let line = line.trim_end_matches('\r');
    if !line.starts_with("copy running-config") {
        return None;
    }
    match (line.find('"'), line.rfind('"')) {
        (Some(start), Some(end)) if end > start => Some(line[start + 1..end].to_string()),
        _ => line.rsplit('/').next().map(str::to_string),
    }
}

#[async_trait]
impl ShellSession for FakeShell {
    async fn write(&mut self, data: &[u8]) -> Result<(), BackupError> {
        let line = String::from_utf8_lossy(data).to_string();
        self.log
            .lock()
            .unwrap()
            .lines
            .push((self.address.clone(), line.clone()));

        match &self.behavior {
            Behavior::FailSend if line != "\r" => {
                Err(BackupError::SendError("channel closed".to_string()))
            }
            Behavior::Upload(content) => {
                if let Some(filename) = requested_filename(&line) {
                    std::fs::write(self.upload_root.join(filename), content)?;
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    async fn close(&mut self) -> Result<(), BackupError> {
        self.log.lock().unwrap().closed += 1;
        Ok(())
    }
}

// ============================================================================
// Credentials
// ============================================================================

#[derive(Debug, Default)]
pub struct StaticCredentials {
    pub missing: HashSet<String>,
}

impl CredentialSource for StaticCredentials {
    fn resolve(&self, device: &Device) -> Result<Credentials, BackupError> {
        if self.missing.contains(&device.hostname) {
            return Err(BackupError::Credentials(format!(
                "no credentials for {}",
                device.hostname
            )));
        }
        Ok(Credentials::new("admin", "admin"))
    }
}

// ============================================================================
// Assembly
// ============================================================================

pub fn orchestrator(
    config: RunConfig,
    transport: &FakeTransport,
    receiver: FakeReceiver,
) -> BackupOrchestrator {
    orchestrator_with_credentials(config, transport, receiver, StaticCredentials::default())
}

pub fn orchestrator_with_credentials(
    config: RunConfig,
    transport: &FakeTransport,
    receiver: FakeReceiver,
    credentials: StaticCredentials,
) -> BackupOrchestrator {
    BackupOrchestrator::new(
        config,
        CommandCatalog::builtin(),
        Arc::new(credentials),
        Arc::new(transport.clone()),
        Box::new(receiver),
    )
}
