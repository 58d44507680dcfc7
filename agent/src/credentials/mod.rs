//! Credential selection

use std::collections::HashMap;

use secrecy::{ExposeSecret, SecretString};
use tracing::debug;

use crate::errors::BackupError;
use crate::inventory::Device;
use crate::storage::settings::{CredentialSettings, LoginSettings};

/// Environment variable holding the default username
pub const USERNAME_ENV_VAR: &str = "SWBACKUP_USERNAME";

/// Environment variable holding the default password
pub const PASSWORD_ENV_VAR: &str = "SWBACKUP_PASSWORD";

/// Username/secret pair, held only for the duration of one session
#[derive(Debug)]
pub struct Credentials {
    pub username: String,
    pub password: SecretString,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: SecretString::from(password.into()),
        }
    }

    fn from_login(login: &LoginSettings) -> Self {
        Self {
            username: login.username.clone(),
            password: SecretString::from(login.password.expose_secret().to_owned()),
        }
    }
}

/// Resolves the credentials a device's session is opened with
pub trait CredentialSource: Send + Sync {
    fn resolve(&self, device: &Device) -> Result<Credentials, BackupError>;
}

/// Credentials from the settings file, with environment fallback for the
/// default set
#[derive(Debug, Default)]
pub struct SettingsCredentials {
    default: Option<LoginSettings>,
    devices: HashMap<String, LoginSettings>,
}

impl SettingsCredentials {
    /// Build from settings, reading the process environment for fallbacks
    pub fn from_settings(settings: CredentialSettings) -> Self {
        Self::with_env(settings, |key| std::env::var(key).ok())
    }

    /// Build from settings with an explicit environment lookup
    pub fn with_env<F>(settings: CredentialSettings, env: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let default = settings.default.or_else(|| {
            let username = env(USERNAME_ENV_VAR)?;
            let password = env(PASSWORD_ENV_VAR)?;
            debug!("Using default credentials from environment");
            Some(LoginSettings {
                username,
                password: SecretString::from(password),
            })
        });

        Self {
            default,
            devices: settings.devices,
        }
    }
}

impl CredentialSource for SettingsCredentials {
    fn resolve(&self, device: &Device) -> Result<Credentials, BackupError> {
        if device.use_default_credentials {
            return self
                .default
                .as_ref()
                .map(Credentials::from_login)
                .ok_or_else(|| {
                    BackupError::Credentials("no default credentials configured".to_string())
                });
        }

        self.devices
            .get(&device.hostname)
            .map(Credentials::from_login)
            .ok_or_else(|| {
                BackupError::Credentials(format!(
                    "no credentials configured for '{}'",
                    device.hostname
                ))
            })
    }
}
