//! Store configuration
//!
//! Every field is optional in the JSON file. Table names end up in
//! generated statements, so they are restricted to ASCII identifiers.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::observability::Severity;

/// Configuration errors (PATHDOC_CONFIG_INVALID)
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

impl ConfigError {
    pub fn code(&self) -> &'static str {
        "PATHDOC_CONFIG_INVALID"
    }

    fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

/// Document store configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Table holding one blob per document
    #[serde(default = "default_data_table")]
    pub data_table: String,

    /// Table holding one row per index entry
    #[serde(default = "default_path_table")]
    pub path_table: String,

    /// Journal file for `JournaledEngine::open_with_config`
    #[serde(default)]
    pub journal_path: Option<PathBuf>,

    /// Minimum severity written by the logger
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Result cap for queries that carry none
    #[serde(default)]
    pub default_max_document_count: Option<u64>,
}

fn default_data_table() -> String {
    "pathdoc_data".to_string()
}
fn default_path_table() -> String {
    "pathdoc_path".to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_table: default_data_table(),
            path_table: default_path_table(),
            journal_path: None,
            log_level: default_log_level(),
            default_max_document_count: None,
        }
    }
}

impl StoreConfig {
    /// Loads and validates a JSON config file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&content)
    }

    /// Parses and validates JSON config text
    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        let config: StoreConfig = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        check_identifier("data_table", &self.data_table)?;
        check_identifier("path_table", &self.path_table)?;
        if self.data_table == self.path_table {
            return Err(ConfigError::invalid(
                "path_table",
                format!("must differ from data_table '{}'", self.data_table),
            ));
        }

        self.log_severity()?;

        if let Some(path) = &self.journal_path {
            if path.as_os_str().is_empty() {
                return Err(ConfigError::invalid("journal_path", "must not be empty"));
            }
        }
        Ok(())
    }

    /// Parsed `log_level`
    pub fn log_severity(&self) -> Result<Severity, ConfigError> {
        Severity::parse(&self.log_level).ok_or_else(|| {
            ConfigError::invalid(
                "log_level",
                format!("'{}' is not one of trace, info, warn, error, fatal", self.log_level),
            )
        })
    }
}

fn check_identifier(field: &'static str, name: &str) -> Result<(), ConfigError> {
    let mut chars = name.chars();
    match chars.next() {
        None => Err(ConfigError::invalid(field, "must not be empty")),
        Some(first) if !(first.is_ascii_alphabetic() || first == '_') => Err(ConfigError::invalid(
            field,
            format!("'{}' must start with a letter or underscore", name),
        )),
        Some(_) if !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') => Err(ConfigError::invalid(
            field,
            format!("'{}' may only contain ASCII letters, digits and underscores", name),
        )),
        Some(_) => Ok(()),
    }
}
