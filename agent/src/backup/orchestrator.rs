//! Device backup orchestration
//!
//! Starts the receiver once, walks the inventory one device at a time and
//! stops the receiver once at the end. Only a receiver start failure ends a
//! run early; every per-device failure is recorded and the loop moves on.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tracing::{error, info, info_span, warn, Instrument};

use crate::app::options::RunConfig;
use crate::backup::archive::ArchiveOrganizer;
use crate::backup::fsm::{RunEvent, RunFsm, RunState};
use crate::backup::report::{DeviceOutcome, DeviceReport, RunReport};
use crate::backup::waiter::{ArtifactWaiter, WaitOutcome};
use crate::catalog::CommandCatalog;
use crate::credentials::CredentialSource;
use crate::errors::BackupError;
use crate::inventory::Device;
use crate::receiver::FileReceiver;
use crate::session::{DeviceSession, ShellTransport};
use crate::utils::generate_uuid;

/// Drives one backup run
pub struct BackupOrchestrator {
    config: RunConfig,
    catalog: CommandCatalog,
    credentials: Arc<dyn CredentialSource>,
    transport: Arc<dyn ShellTransport>,
    receiver: Box<dyn FileReceiver>,
    archive: ArchiveOrganizer,
    fsm: RunFsm,
}

impl BackupOrchestrator {
    pub fn new(
        config: RunConfig,
        catalog: CommandCatalog,
        credentials: Arc<dyn CredentialSource>,
        transport: Arc<dyn ShellTransport>,
        receiver: Box<dyn FileReceiver>,
    ) -> Self {
        let archive = ArchiveOrganizer::new(config.layout.clone());
        Self {
            config,
            catalog,
            credentials,
            transport,
            receiver,
            archive,
            fsm: RunFsm::new(),
        }
    }

    /// Current run state
    pub fn state(&self) -> &RunState {
        self.fsm.state()
    }

    /// Run the batch.
    ///
    /// `sleep_fn` paces every wait in the run. When `shutdown_signal`
    /// resolves, devices not yet started are skipped and the run goes
    /// straight to receiver shutdown.
    pub async fn run<S, F>(
        &mut self,
        devices: &[Device],
        sleep_fn: S,
        shutdown_signal: impl Future<Output = ()>,
    ) -> Result<RunReport, BackupError>
    where
        S: Fn(Duration) -> F,
        F: Future<Output = ()>,
    {
        let run_id = generate_uuid();
        let span = info_span!("run", run_id = %run_id);
        self.run_impl(run_id, devices, sleep_fn, shutdown_signal)
            .instrument(span)
            .await
    }

    async fn run_impl<S, F>(
        &mut self,
        run_id: String,
        devices: &[Device],
        sleep_fn: S,
        shutdown_signal: impl Future<Output = ()>,
    ) -> Result<RunReport, BackupError>
    where
        S: Fn(Duration) -> F,
        F: Future<Output = ()>,
    {
        self.advance(RunEvent::StartReceiver)?;
        info!(
            "Starting backup of {} device(s), receiver at {}",
            devices.len(),
            self.config.receiver_address
        );

        if let Err(e) = self.receiver.start().await {
            error!("Receiver failed to start: {}", e);
            self.advance(RunEvent::ReceiverFailed(e.to_string()))?;
            return Err(e);
        }
        self.advance(RunEvent::ReceiverStarted)?;
        self.advance(RunEvent::BeginDevices)?;

        let processed = AssertUnwindSafe(self.process_devices(devices, &sleep_fn, shutdown_signal))
            .catch_unwind()
            .await;

        self.advance(RunEvent::StopReceiver)?;
        if let Err(e) = self.receiver.stop().await {
            warn!("Receiver did not stop cleanly: {}", e);
        }
        self.advance(RunEvent::ReceiverStopped)?;

        let reports = match processed {
            Ok(reports) => reports,
            Err(panic) => std::panic::resume_unwind(panic),
        };

        let report = RunReport {
            run_id,
            date: self.config.layout.date,
            state: self.fsm.state().clone(),
            devices: reports,
        };
        info!(
            "Run complete: {} succeeded, {} failed, {} skipped",
            report.succeeded(),
            report.failed(),
            report.skipped()
        );
        Ok(report)
    }

    fn advance(&mut self, event: RunEvent) -> Result<(), BackupError> {
        self.fsm.process(event).map_err(BackupError::RunState)
    }

    async fn process_devices<S, F>(
        &self,
        devices: &[Device],
        sleep_fn: &S,
        shutdown_signal: impl Future<Output = ()>,
    ) -> Vec<DeviceReport>
    where
        S: Fn(Duration) -> F,
        F: Future<Output = ()>,
    {
        let mut shutdown_signal = std::pin::pin!(shutdown_signal);
        let mut cancelled = false;
        let mut reports = Vec::with_capacity(devices.len());

        for device in devices {
            if !cancelled && shutdown_signal.as_mut().now_or_never().is_some() {
                warn!("Shutdown requested, skipping remaining devices");
                cancelled = true;
            }

            let outcome = if cancelled {
                DeviceOutcome::Skipped
            } else {
                self.process_device(device, sleep_fn)
                    .instrument(info_span!("device", hostname = %device.hostname))
                    .await
            };

            match &outcome {
                DeviceOutcome::Archived(artifact) => {
                    info!(hostname = %device.hostname, sha256 = %artifact.sha256, "Backup stored")
                }
                DeviceOutcome::CommandSent => {
                    info!(hostname = %device.hostname, "Command sent")
                }
                DeviceOutcome::Failed(e) => {
                    error!(hostname = %device.hostname, "Device failed: {}", e)
                }
                DeviceOutcome::Skipped => {}
            }

            reports.push(DeviceReport {
                hostname: device.hostname.clone(),
                outcome,
            });
        }

        reports
    }

    async fn process_device<S, F>(&self, device: &Device, sleep_fn: &S) -> DeviceOutcome
    where
        S: Fn(Duration) -> F,
        F: Future<Output = ()>,
    {
        info!("Processing {} ({}, {})", device.hostname, device.address, device.brand);

        let credentials = match self.credentials.resolve(device) {
            Ok(credentials) => credentials,
            Err(e) => return DeviceOutcome::Failed(e),
        };

        let mut session = match DeviceSession::open(
            self.transport.as_ref(),
            &device.hostname,
            &device.address,
            self.config.session.port,
            &credentials,
        )
        .await
        {
            Ok(session) => session,
            Err(e) => return DeviceOutcome::Failed(e),
        };
        drop(credentials);

        let result = self.dispatch(device, &mut session, sleep_fn).await;
        session.close().await;

        match result {
            Ok(outcome) => outcome,
            Err(e) => DeviceOutcome::Failed(e),
        }
    }

    async fn dispatch<S, F>(
        &self,
        device: &Device,
        session: &mut DeviceSession,
        sleep_fn: &S,
    ) -> Result<DeviceOutcome, BackupError>
    where
        S: Fn(Duration) -> F,
        F: Future<Output = ()>,
    {
        if !device.is_backup() {
            let command = device.command.as_deref().ok_or_else(|| {
                BackupError::CommandResolution {
                    brand: device.brand.clone(),
                    function: device.function.clone(),
                }
            })?;

            sleep_fn(self.config.session.command_delay).await;
            session.send(command).await?;
            sleep_fn(self.config.session.linger).await;
            return Ok(DeviceOutcome::CommandSent);
        }

        if device.command.is_some() {
            warn!("Ignoring command column for backup function");
        }

        let template = self
            .catalog
            .resolve(&device.brand, &device.function)
            .ok_or_else(|| BackupError::CommandResolution {
                brand: device.brand.clone(),
                function: device.function.clone(),
            })?;

        let filename = self.config.layout.filename(&device.hostname);
        let artifact = self.config.receiver_root.file(&filename);

        // A leftover from an earlier attempt would satisfy the wait immediately
        artifact.delete().await?;

        let command = template.render(&self.config.receiver_address, &filename);
        sleep_fn(self.config.session.command_delay).await;
        session.send(&command).await?;

        let waiter = ArtifactWaiter::new(self.config.wait.clone(), sleep_fn);
        match waiter.wait_for(&artifact).await {
            WaitOutcome::Arrived { .. } => {
                let archived = self
                    .archive
                    .archive(&artifact, &device.hostname, &filename)
                    .await?;
                Ok(DeviceOutcome::Archived(archived))
            }
            WaitOutcome::TimedOut { .. } => Err(BackupError::ArtifactTimeout {
                path: artifact.path().to_path_buf(),
                timeout_ms: self.config.wait.timeout.as_millis(),
            }),
        }
    }
}
