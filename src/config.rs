//! Configuration
//!
//! Layered configuration for an export run: built-in defaults, the global
//! config file, an explicit `--config` file, then `CANOPY__*` environment
//! variables.

mod facade;
pub mod merge;
pub mod paths;
pub mod sources;

pub use facade::ConfigLoader;
pub use paths::xdg_root as xdg;

use crate::directory::AdminCredentials;
use crate::error::ExportError;
use crate::logging::LoggingConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

fn default_root_path() -> String {
    "/".to_string()
}

fn default_connect_timeout_ms() -> u64 {
    1_000
}

fn default_read_timeout_ms() -> u64 {
    10_000
}

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanopyConfig {
    /// Export target; `None` resolves to `$XDG_DATA_HOME/canopy/export`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub export_dir: Option<PathBuf>,

    /// Repository path of the folder the walk starts from.
    #[serde(default = "default_root_path")]
    pub root_path: String,

    #[serde(default)]
    pub admin: AdminConfig,

    #[serde(default)]
    pub directory: ServiceConfig,

    #[serde(default)]
    pub content: ServiceConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for CanopyConfig {
    fn default() -> Self {
        Self {
            export_dir: None,
            root_path: default_root_path(),
            admin: AdminConfig::default(),
            directory: ServiceConfig::default(),
            content: ServiceConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Administrative identity used by the export.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AdminConfig {
    #[serde(default)]
    pub user_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

/// Connection settings for one HTTP collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    #[serde(default)]
    pub base_url: String,

    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            connect_timeout_ms: default_connect_timeout_ms(),
            read_timeout_ms: default_read_timeout_ms(),
        }
    }
}

impl ServiceConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    pub fn trimmed_base_url(&self) -> &str {
        self.base_url.trim().trim_end_matches('/')
    }

    /// Build an HTTP client carrying this service's timeouts.
    pub fn build_client(&self) -> Result<reqwest::Client, ExportError> {
        reqwest::Client::builder()
            .connect_timeout(Duration::from_millis(self.connect_timeout_ms))
            .timeout(Duration::from_millis(self.read_timeout_ms))
            .build()
            .map_err(|e| ExportError::ConfigError(format!("Failed to build HTTP client: {}", e)))
    }

    /// True when the base URL has an http(s) scheme and a host.
    pub fn base_url_is_valid(&self) -> bool {
        let url = self.trimmed_base_url();
        let Some(rest) = url
            .strip_prefix("http://")
            .or_else(|| url.strip_prefix("https://"))
        else {
            return false;
        };
        let authority = rest.split('/').next().unwrap_or_default();
        let host = authority.rsplit('@').next().unwrap_or(authority);
        !host.is_empty() && !host.starts_with(':') && !rest.chars().any(char::is_whitespace)
    }
}

impl CanopyConfig {
    /// Validate settings needed by an export run.
    pub fn validate(&self) -> Result<(), ExportError> {
        if self.admin.user_id.trim().is_empty() {
            return Err(ExportError::ConfigError(
                "admin.user_id cannot be empty".to_string(),
            ));
        }
        if !self.root_path.starts_with('/') {
            return Err(ExportError::ConfigError(format!(
                "root_path must be absolute, got {}",
                self.root_path
            )));
        }
        for (section, service) in [("directory", &self.directory), ("content", &self.content)] {
            if !service.base_url_is_valid() {
                return Err(ExportError::ConfigError(format!(
                    "Invalid {}.base_url: '{}'",
                    section, service.base_url
                )));
            }
            if service.connect_timeout_ms == 0 || service.read_timeout_ms == 0 {
                return Err(ExportError::ConfigError(format!(
                    "{} timeouts must be positive",
                    section
                )));
            }
        }
        Ok(())
    }

    pub fn admin_credentials(&self) -> AdminCredentials {
        AdminCredentials {
            user_id: self.admin.user_id.clone(),
            password: self.admin.password.clone(),
        }
    }

    /// Export directory from config, falling back to the XDG data location.
    pub fn resolve_export_dir(&self) -> Result<PathBuf, ExportError> {
        match &self.export_dir {
            Some(dir) if !dir.as_os_str().is_empty() => Ok(dir.clone()),
            _ => xdg::default_export_dir(),
        }
    }

    /// Copy suitable for display, with secrets masked.
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        if copy.admin.password.is_some() {
            copy.admin.password = Some("********".to_string());
        }
        copy
    }
}
