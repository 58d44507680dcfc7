//! Builds the collaborators for a run from settings and drives it

use std::future::Future;
use std::net::IpAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use tracing::{info, warn};

use crate::app::options::RunConfig;
use crate::backup::orchestrator::BackupOrchestrator;
use crate::backup::report::RunReport;
use crate::catalog::CommandCatalog;
use crate::credentials::SettingsCredentials;
use crate::errors::BackupError;
use crate::filesys::file::File;
use crate::inventory::load_inventory;
use crate::receiver::TftpReceiver;
use crate::session::ssh::SshTransport;
use crate::storage::settings::{ReceiverSettings, Settings};

/// Back up every device in `inventory` using `settings`
pub async fn run(
    settings: Settings,
    inventory: &Path,
    date: NaiveDate,
    shutdown_signal: impl Future<Output = ()>,
) -> Result<RunReport, BackupError> {
    let devices = load_inventory(&File::new(inventory), settings.inventory_delimiter).await?;

    let receiver_address = resolve_receiver_address(&settings.receiver)?;
    let config = RunConfig::from_settings(&settings, date, receiver_address);
    let catalog = load_catalog(settings.catalog_file.as_deref()).await?;

    let transport = Arc::new(SshTransport::new(Duration::from_millis(
        settings.ssh.connect_timeout_ms,
    )));
    let receiver = Box::new(TftpReceiver::new(&settings.receiver, &settings.work_dir));
    let credentials = Arc::new(SettingsCredentials::from_settings(settings.credentials));

    let mut orchestrator = BackupOrchestrator::new(config, catalog, credentials, transport, receiver);
    orchestrator
        .run(&devices, tokio::time::sleep, shutdown_signal)
        .await
}

/// Built-in catalog, with the configured catalog file merged over it
pub async fn load_catalog(catalog_file: Option<&Path>) -> Result<CommandCatalog, BackupError> {
    let mut catalog = CommandCatalog::builtin();
    if let Some(path) = catalog_file {
        catalog.merge_file(&File::new(path)).await?;
    }
    info!("Command catalog has {} template(s)", catalog.len());
    Ok(catalog)
}

/// Address devices upload to: configured, or the default interface's IPv4
pub fn resolve_receiver_address(settings: &ReceiverSettings) -> Result<String, BackupError> {
    if let Some(address) = &settings.address {
        address
            .parse::<IpAddr>()
            .map_err(|e| BackupError::Config(format!("Invalid receiver address '{}': {}", address, e)))?;
        return Ok(address.clone());
    }

    let interface = netdev::get_default_interface()
        .map_err(|e| BackupError::Config(format!("Unable to detect receiver address: {}", e)))?;

    let address = interface
        .ipv4
        .first()
        .map(|net| net.addr().to_string())
        .ok_or_else(|| {
            BackupError::Config(format!(
                "Default interface {} has no IPv4 address",
                interface.name
            ))
        })?;

    warn!(
        "No receiver address configured, using {} from interface {}",
        address, interface.name
    );
    Ok(address)
}
