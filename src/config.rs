//! Configuration for the restricted catalog actions.
//!
//! Values are resolved once at process start (file, then environment
//! overrides) and handed to the components that need them. Nothing in the
//! decision path reads global state.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::log_config_debug;

/// Request endpoints that only list datasets and never render resource detail.
pub const DEFAULT_LITE_RESOURCE_ENDPOINTS: [&str; 3] =
    ["dataset.search", "group.read", "organization.read"];

/// Main configuration for a `RestrictedApi` instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RestrictedConfig {
    /// Whether the schema extension is active, which moves restriction
    /// metadata into a nested `restricted` structure
    #[serde(default)]
    pub scheming_enabled: bool,
    /// Endpoints for which package search switches to lite resources
    #[serde(default = "default_lite_resource_endpoints")]
    pub lite_resource_endpoints: Vec<String>,
    /// Permission passed to the organization directory
    #[serde(default = "default_organization_permission")]
    pub organization_permission: String,
    /// Access request email settings
    #[serde(default)]
    pub mail: MailConfig,
}

/// Access request email settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MailConfig {
    /// Sender address for access request emails
    pub sender: String,
    /// Prefix prepended to the subject line
    pub subject_prefix: String,
    /// Site name used in the message body
    pub site_title: String,
}

fn default_lite_resource_endpoints() -> Vec<String> {
    DEFAULT_LITE_RESOURCE_ENDPOINTS
        .iter()
        .map(|e| e.to_string())
        .collect()
}

fn default_organization_permission() -> String {
    "read".to_string()
}

impl Default for RestrictedConfig {
    fn default() -> Self {
        Self {
            scheming_enabled: false,
            lite_resource_endpoints: default_lite_resource_endpoints(),
            organization_permission: default_organization_permission(),
            mail: MailConfig::default(),
        }
    }
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            sender: "noreply@localhost".to_string(),
            subject_prefix: "[Data Catalog]".to_string(),
            site_title: "Data Catalog".to_string(),
        }
    }
}

impl RestrictedConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(ConfigError::Io)?;

        let mut config: RestrictedConfig =
            toml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))?;

        config.apply_env_overrides()?;
        config.validate()?;

        Ok(config)
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Apply environment variable overrides to the configuration
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Ok(enabled) = std::env::var("RESTRICTED_API_SCHEMING_ENABLED") {
            self.scheming_enabled = enabled.parse().map_err(|_| {
                ConfigError::InvalidValue("RESTRICTED_API_SCHEMING_ENABLED".into(), enabled.clone())
            })?;
        }
        if let Ok(endpoints) = std::env::var("RESTRICTED_API_LITE_ENDPOINTS") {
            self.lite_resource_endpoints = endpoints
                .split(',')
                .map(str::trim)
                .filter(|e| !e.is_empty())
                .map(str::to_string)
                .collect();
        }
        if let Ok(sender) = std::env::var("RESTRICTED_API_MAIL_SENDER") {
            self.mail.sender = sender;
        }
        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.organization_permission.trim().is_empty() {
            return Err(ConfigError::InvalidValue(
                "organization_permission".into(),
                self.organization_permission.clone(),
            ));
        }
        if !self.mail.sender.contains('@') {
            return Err(ConfigError::InvalidValue(
                "mail.sender".into(),
                self.mail.sender.clone(),
            ));
        }
        Ok(())
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content =
            toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))?;

        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent).map_err(ConfigError::Io)?;
        }

        std::fs::write(path, content).map_err(ConfigError::Io)?;
        Ok(())
    }

    /// Whether package search should only project lite resources for this endpoint.
    pub fn is_lite_endpoint(&self, endpoint: &str) -> bool {
        self.lite_resource_endpoints.iter().any(|e| e == endpoint)
    }
}

/// Default location of the configuration file under the user config directory.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("restricted_api").join("config.toml"))
}

/// Load the configuration from `path`, the default path, or fall back to defaults.
///
/// An explicitly given path must exist and parse. A missing default file is
/// not an error.
pub fn load_config(path: Option<&str>) -> Result<RestrictedConfig, ConfigError> {
    if let Some(path) = path {
        return RestrictedConfig::from_file(path);
    }
    match default_config_path() {
        Some(default_path) if default_path.exists() => RestrictedConfig::from_file(default_path),
        _ => {
            log_config_debug!("No configuration file found, using defaults");
            RestrictedConfig::from_env()
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse configuration: {0}")]
    Parse(String),
    #[error("Failed to serialize configuration: {0}")]
    Serialize(String),
    #[error("Invalid value for '{0}': {1}")]
    InvalidValue(String, String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_list_the_listing_endpoints() {
        let config = RestrictedConfig::default();
        assert!(!config.scheming_enabled);
        assert!(config.is_lite_endpoint("dataset.search"));
        assert!(config.is_lite_endpoint("group.read"));
        assert!(config.is_lite_endpoint("organization.read"));
        assert!(!config.is_lite_endpoint("dataset.read"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let config: RestrictedConfig = toml::from_str("scheming_enabled = true").unwrap();
        assert!(config.scheming_enabled);
        assert_eq!(config.organization_permission, "read");
        assert_eq!(config.lite_resource_endpoints.len(), 3);
    }

    #[test]
    fn rejects_sender_without_at() {
        let mut config = RestrictedConfig::default();
        config.mail.sender = "nobody".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue(field, _)) if field == "mail.sender"
        ));
    }
}
