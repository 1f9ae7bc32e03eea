//! Configuration Management
//!
//! Handles persistent configuration storage for azavset.

use crate::azure::auth::{DEFAULT_AUTHORITY_HOST, DEFAULT_RESOURCE_MANAGER};
use crate::azure::client::Endpoints;
use crate::azure::operation::PollSettings;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_LOCATION: &str = "eastus";
pub const DEFAULT_GROUP_PREFIX: &str = "azavset-rg-";
pub const DEFAULT_ZONE: &str = "1";
pub const DEFAULT_VM_SIZE: &str = "Standard_DS1_v2";
pub const DEFAULT_ADMIN_USERNAME: &str = "azureadmin";

fn default_poll_interval_ms() -> u64 {
    5_000
}

fn default_operation_timeout_secs() -> u64 {
    30 * 60
}

/// User configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Region resources are created in
    #[serde(default)]
    pub location: Option<String>,
    /// Prefix of the generated resource group name
    #[serde(default)]
    pub group_prefix: Option<String>,
    /// Zone the first VM is pinned to
    #[serde(default)]
    pub zone: Option<String>,
    #[serde(default)]
    pub vm_size: Option<String>,
    #[serde(default)]
    pub admin_username: Option<String>,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_operation_timeout_secs")]
    pub operation_timeout_secs: u64,
    /// Identity endpoint override (sovereign clouds, tests)
    #[serde(default)]
    pub authority_host: Option<String>,
    /// Management endpoint override (sovereign clouds, tests)
    #[serde(default)]
    pub resource_manager_endpoint: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            location: None,
            group_prefix: None,
            zone: None,
            vm_size: None,
            admin_username: None,
            poll_interval_ms: default_poll_interval_ms(),
            operation_timeout_secs: default_operation_timeout_secs(),
            authority_host: None,
            resource_manager_endpoint: None,
        }
    }
}

impl Config {
    /// Get the config file path
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("azavset").join("config.json"))
    }

    /// Load configuration from disk. A missing or unreadable file yields defaults.
    pub fn load() -> Self {
        match Self::config_path() {
            Some(path) => Self::load_from(&path),
            None => Self::default(),
        }
    }

    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }

        match std::fs::read_to_string(path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                tracing::warn!("Ignoring malformed config {:?}: {}", path, e);
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    /// Save configuration to disk
    pub fn save(&self) -> Result<()> {
        let Some(path) = Self::config_path() else {
            return Ok(());
        };
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {:?}", parent))?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content).with_context(|| format!("Failed to write {:?}", path))?;

        Ok(())
    }

    /// Get effective location (CLI > config > AZURE_LOCATION > eastus)
    pub fn effective_location(&self) -> String {
        self.location
            .clone()
            .or_else(|| std::env::var("AZURE_LOCATION").ok().filter(|v| !v.is_empty()))
            .unwrap_or_else(|| DEFAULT_LOCATION.to_string())
    }

    pub fn effective_group_prefix(&self) -> String {
        self.group_prefix
            .clone()
            .unwrap_or_else(|| DEFAULT_GROUP_PREFIX.to_string())
    }

    pub fn effective_zone(&self) -> String {
        self.zone.clone().unwrap_or_else(|| DEFAULT_ZONE.to_string())
    }

    pub fn effective_vm_size(&self) -> String {
        self.vm_size
            .clone()
            .unwrap_or_else(|| DEFAULT_VM_SIZE.to_string())
    }

    pub fn effective_admin_username(&self) -> String {
        self.admin_username
            .clone()
            .unwrap_or_else(|| DEFAULT_ADMIN_USERNAME.to_string())
    }

    pub fn poll_settings(&self) -> PollSettings {
        PollSettings {
            interval: Duration::from_millis(self.poll_interval_ms),
            timeout: Duration::from_secs(self.operation_timeout_secs),
        }
    }

    /// Resolve and validate the identity and management endpoints
    pub fn endpoints(&self) -> Result<Endpoints> {
        let authority_host = self
            .authority_host
            .clone()
            .unwrap_or_else(|| DEFAULT_AUTHORITY_HOST.to_string());
        let resource_manager = self
            .resource_manager_endpoint
            .clone()
            .unwrap_or_else(|| DEFAULT_RESOURCE_MANAGER.to_string());

        validate_endpoint("authority_host", &authority_host)?;
        validate_endpoint("resource_manager_endpoint", &resource_manager)?;

        Ok(Endpoints {
            authority_host,
            resource_manager,
        })
    }
}

fn validate_endpoint(field: &str, value: &str) -> Result<()> {
    let url = url::Url::parse(value).with_context(|| format!("Invalid {}: {}", field, value))?;
    match url.scheme() {
        "https" | "http" => Ok(()),
        other => anyhow::bail!("Invalid {}: unsupported scheme '{}'", field, other),
    }
}
