//! Brand/function to command template lookup
//!
//! Brands match exactly (case-sensitive, surrounding whitespace ignored), so
//! "Aruba-CX" does not resolve to the "Aruba" template.

use std::collections::HashMap;

use serde::Deserialize;
use tracing::{debug, info};

use crate::errors::BackupError;
use crate::filesys::file::File;
use crate::inventory::BACKUP_FUNCTION;

/// Placeholder replaced with the receiver address
pub const ADDRESS_SLOT: &str = "{address}";

/// Placeholder replaced with the artifact filename
pub const FILENAME_SLOT: &str = "{filename}";

const PROCURVE_BACKUP: &str = "copy running-config tftp {address} \"{filename}\"";
const CISCO_BACKUP: &str = "copy running-config tftp://{address}/{filename}";

/// A command with receiver address and filename slots
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandTemplate {
    template: String,
}

impl CommandTemplate {
    /// Validate and wrap a template string
    pub fn new(template: impl Into<String>) -> Result<Self, BackupError> {
        let template = template.into();
        for slot in [ADDRESS_SLOT, FILENAME_SLOT] {
            if !template.contains(slot) {
                return Err(BackupError::Config(format!(
                    "Command template '{}' is missing {}",
                    template, slot
                )));
            }
        }
        Ok(Self { template })
    }

    /// Raw template text
    pub fn as_str(&self) -> &str {
        &self.template
    }

    /// Fill in the receiver address and filename
    pub fn render(&self, address: &str, filename: &str) -> String {
        self.template
            .replace(ADDRESS_SLOT, address)
            .replace(FILENAME_SLOT, filename)
    }
}

/// Catalog file entry
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogEntry {
    pub brand: String,

    #[serde(default = "default_function")]
    pub function: String,

    pub template: String,
}

fn default_function() -> String {
    BACKUP_FUNCTION.to_string()
}

/// Command catalog
#[derive(Debug, Clone, Default)]
pub struct CommandCatalog {
    templates: HashMap<(String, String), CommandTemplate>,
}

impl CommandCatalog {
    /// Create an empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog with the built-in backup commands
    pub fn builtin() -> Self {
        let mut catalog = Self::new();
        for brand in ["Aruba", "HP", "HPE", "ProCurve"] {
            catalog.insert_unchecked(brand, BACKUP_FUNCTION, PROCURVE_BACKUP);
        }
        catalog.insert_unchecked("Cisco", BACKUP_FUNCTION, CISCO_BACKUP);
        catalog
    }

    fn insert_unchecked(&mut self, brand: &str, function: &str, template: &str) {
        self.templates.insert(
            (brand.to_string(), function.to_string()),
            CommandTemplate {
                template: template.to_string(),
            },
        );
    }

    /// Add or replace the template for a brand/function pair
    pub fn insert(&mut self, brand: &str, function: &str, template: CommandTemplate) {
        self.templates.insert(
            (brand.trim().to_string(), function.trim().to_lowercase()),
            template,
        );
    }

    /// Merge entries from a catalog file over this catalog
    pub async fn merge_file(&mut self, file: &File) -> Result<(), BackupError> {
        let entries: Vec<CatalogEntry> = file.read_json().await?;
        info!(
            "Loaded {} command template(s) from {}",
            entries.len(),
            file.path().display()
        );
        for entry in entries {
            let template = CommandTemplate::new(entry.template)?;
            debug!("Catalog: {} / {} -> {}", entry.brand, entry.function, template.as_str());
            self.insert(&entry.brand, &entry.function, template);
        }
        Ok(())
    }

    /// Look up the template for a brand/function pair
    pub fn resolve(&self, brand: &str, function: &str) -> Option<&CommandTemplate> {
        self.templates
            .get(&(brand.trim().to_string(), function.trim().to_lowercase()))
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}
