//! Utility functions

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Version information for the agent
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionInfo {
    pub version: String,
    pub git_hash: String,
    pub build_time: String,
}

/// Get version information
pub fn version_info() -> VersionInfo {
    VersionInfo {
        version: env!("CARGO_PKG_VERSION").to_string(),
        git_hash: option_env!("GIT_HASH").unwrap_or("unknown").to_string(),
        build_time: option_env!("BUILD_TIME").unwrap_or("unknown").to_string(),
    }
}

/// Date stamp used in every generated name (`yyMMdd`)
pub fn date_stamp(date: NaiveDate) -> String {
    date.format("%y%m%d").to_string()
}

/// Name a device is told to upload as, and the name the waiter polls for
pub fn artifact_filename(date: NaiveDate, hostname: &str) -> String {
    format!("{} {} running-config.txt", date_stamp(date), hostname)
}

/// Name of the daily aggregate folder
pub fn daily_dir_name(date: NaiveDate) -> String {
    format!("{} running-configs", date_stamp(date))
}

/// Default name of the log file
pub fn log_file_name(date: NaiveDate) -> String {
    format!("{} script.log", date_stamp(date))
}

/// Generate a random UUID v4
pub fn generate_uuid() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Calculate SHA256 hash of data
pub fn sha256_hash(data: &[u8]) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(data);
    let result = hasher.finalize();
    hex::encode(result)
}

/// Hex encoding utilities
mod hex {
    const HEX_CHARS: &[u8; 16] = b"0123456789abcdef";

    pub fn encode(data: impl AsRef<[u8]>) -> String {
        let data = data.as_ref();
        let mut result = String::with_capacity(data.len() * 2);
        for byte in data {
            result.push(HEX_CHARS[(byte >> 4) as usize] as char);
            result.push(HEX_CHARS[(byte & 0x0f) as usize] as char);
        }
        result
    }
}
