//! Application settings loaded from config.toml
//!
//! Every section has defaults, so an empty or missing file yields a usable
//! configuration. The file only tunes behaviour; secrets (SMTP passwords) live
//! in the database per workspace and the database URL comes from the environment.

use crate::errors::{Error, Result};
use serde::Deserialize;
use std::path::Path;

const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// Configuration structure representing the entire config.toml file
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Placeholder values for lazily provisioned workspaces
    pub workspace: WorkspaceDefaults,
    /// Invoice numbering and tax defaults
    pub invoicing: InvoicingConfig,
    /// Blob store buckets and local root
    pub storage: StorageConfig,
}

/// Values given to a workspace created on the owner's first financial write
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WorkspaceDefaults {
    /// Display name until the owner saves their settings
    pub default_name: String,
}

impl Default for WorkspaceDefaults {
    fn default() -> Self {
        Self {
            default_name: "My Workspace".to_string(),
        }
    }
}

/// Invoice numbering and tax defaults
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct InvoicingConfig {
    /// Leading part of generated numbers (`INV` in `INV-2026-0001`)
    pub number_prefix: String,
    /// Zero-padding width of the sequence part
    pub sequence_width: usize,
    /// Tax rate applied when the caller does not choose one (0 keeps totals equal to the line sum)
    pub default_tax_rate: f64,
    /// Sender display name when a workspace has not configured one
    pub default_sender_name: String,
}

impl Default for InvoicingConfig {
    fn default() -> Self {
        Self {
            number_prefix: "INV".to_string(),
            sequence_width: 4,
            default_tax_rate: 0.0,
            default_sender_name: "Invoice Ledger".to_string(),
        }
    }
}

/// Blob store buckets and local root
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Bucket for expense receipts
    pub receipts_bucket: String,
    /// Bucket for workspace logos
    pub logos_bucket: String,
    /// Root directory of the local blob store
    pub root: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            receipts_bucket: "receipts".to_string(),
            logos_bucket: "logos".to_string(),
            root: "data/blobs".to_string(),
        }
    }
}

/// Loads the application configuration from a TOML file
///
/// # Errors
/// Returns an error if the file cannot be read or the TOML is invalid.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<AppConfig> {
    let path_ref = path.as_ref();
    tracing::debug!("Loading configuration from {:?}", path_ref);
    let contents = std::fs::read_to_string(path_ref).map_err(|e| Error::Config {
        message: format!("Failed to read config file {}: {e}", path_ref.display()),
    })?;

    parse_config(&contents)
}

/// Parses configuration from a TOML string
///
/// # Errors
/// Returns an error if the TOML is invalid or a field has the wrong type.
pub fn parse_config(contents: &str) -> Result<AppConfig> {
    toml::from_str(contents).map_err(|e| Error::Config {
        message: format!("Failed to parse config.toml: {e}"),
    })
}

/// Loads configuration from `LEDGER_CONFIG` (default `./config.toml`).
///
/// A missing file is not an error: defaults are used instead.
pub fn load_default_config() -> Result<AppConfig> {
    let path = std::env::var("LEDGER_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    if Path::new(&path).exists() {
        load_config(path)
    } else {
        tracing::info!("No configuration file at {}, using defaults", path);
        Ok(AppConfig::default())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_partial_config_keeps_defaults() {
        let toml_str = r#"
            [invoicing]
            number_prefix = "FAC"
            default_tax_rate = 0.1
        "#;

        let config = parse_config(toml_str).unwrap();
        assert_eq!(config.invoicing.number_prefix, "FAC");
        assert_eq!(config.invoicing.default_tax_rate, 0.1);
        assert_eq!(config.invoicing.sequence_width, 4);
        assert_eq!(config.workspace.default_name, "My Workspace");
        assert_eq!(config.storage.receipts_bucket, "receipts");
    }

    #[test]
    fn test_parse_empty_config() {
        let config = parse_config("").unwrap();
        assert_eq!(config.invoicing.default_tax_rate, 0.0);
        assert_eq!(config.storage.logos_bucket, "logos");
    }

    #[test]
    fn test_parse_invalid_config() {
        let result = parse_config("[invoicing]\nsequence_width = \"four\"");
        assert!(matches!(result, Err(Error::Config { .. })));
    }

    #[test]
    fn test_load_config_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[workspace]\ndefault_name = \"Atelier\"").unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.workspace.default_name, "Atelier");
    }
}
