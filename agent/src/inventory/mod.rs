//! Device inventory
//!
//! One delimited row per device, in processing order:
//! `hostname;address;brand;function;command;default_credentials`.
//! The command column may be omitted entirely (five columns).

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::errors::BackupError;
use crate::filesys::file::File;

/// Function tag that triggers a config upload
pub const BACKUP_FUNCTION: &str = "backup";

/// One managed switch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    /// Unique within a run
    pub hostname: String,

    /// Network address the SSH session is opened to
    pub address: String,

    /// Brand used for the command lookup
    pub brand: String,

    /// Function tag, lowercased
    pub function: String,

    /// Literal command sent for non-backup functions
    pub command: Option<String>,

    /// Use the shared default credentials
    pub use_default_credentials: bool,
}

impl Device {
    /// Whether this device's function is the config backup
    pub fn is_backup(&self) -> bool {
        self.function == BACKUP_FUNCTION
    }
}

/// Load the inventory file
pub async fn load_inventory(file: &File, delimiter: char) -> Result<Vec<Device>, BackupError> {
    info!("Loading inventory from {}", file.path().display());

    if !file.exists().await {
        return Err(BackupError::Inventory(format!(
            "Inventory file not found: {}",
            file.path().display()
        )));
    }

    let contents = file.read_string().await?;
    let devices = parse_inventory(&contents, delimiter)?;
    info!("Loaded {} device(s)", devices.len());
    Ok(devices)
}

/// Parse inventory text
pub fn parse_inventory(contents: &str, delimiter: char) -> Result<Vec<Device>, BackupError> {
    let mut devices = Vec::new();
    let mut seen = HashSet::new();

    for (idx, raw_line) in contents.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw_line.trim_start_matches('\u{feff}').trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let cells: Vec<&str> = line.split(delimiter).map(str::trim).collect();
        if devices.is_empty()
            && cells
                .first()
                .is_some_and(|c| c.eq_ignore_ascii_case("hostname"))
        {
            debug!("Skipping inventory header on line {}", line_no);
            continue;
        }

        let device = parse_row(&cells, line_no)?;
        if !seen.insert(device.hostname.clone()) {
            return Err(BackupError::Inventory(format!(
                "line {}: duplicate hostname '{}'",
                line_no, device.hostname
            )));
        }
        devices.push(device);
    }

    if devices.is_empty() {
        return Err(BackupError::Inventory("inventory contains no devices".to_string()));
    }

    Ok(devices)
}

fn parse_row(cells: &[&str], line_no: usize) -> Result<Device, BackupError> {
    let (command, flag) = match cells.len() {
        5 => (None, cells[4]),
        6 => (Some(cells[4]), cells[5]),
        n => {
            return Err(BackupError::Inventory(format!(
                "line {}: expected 5 or 6 columns, found {}",
                line_no, n
            )))
        }
    };

    let hostname = cells[0];
    let address = cells[1];
    if hostname.is_empty() {
        return Err(BackupError::Inventory(format!("line {}: empty hostname", line_no)));
    }
    if hostname.contains(['/', '\\', '"']) || hostname.contains("..") {
        return Err(BackupError::Inventory(format!(
            "line {}: hostname '{}' is not usable as a file name",
            line_no, hostname
        )));
    }
    if address.is_empty() {
        return Err(BackupError::Inventory(format!(
            "line {}: empty address for '{}'",
            line_no, hostname
        )));
    }

    let use_default_credentials = parse_flag(flag).ok_or_else(|| {
        BackupError::Inventory(format!(
            "line {}: invalid default-credentials flag '{}'",
            line_no, flag
        ))
    })?;

    Ok(Device {
        hostname: hostname.to_string(),
        address: address.to_string(),
        brand: cells[2].to_string(),
        function: cells[3].to_lowercase(),
        command: command.filter(|c| !c.is_empty()).map(str::to_string),
        use_default_credentials,
    })
}

/// Parse a boolean-like cell
pub fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "yes" | "y" | "1" | "x" => Some(true),
        "false" | "no" | "n" | "0" | "" => Some(false),
        _ => None,
    }
}
