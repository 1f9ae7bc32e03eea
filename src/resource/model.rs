//! Fields shared by every Resource Manager resource

use super::tags::Tags;
use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::Value;

/// Generic resource envelope: `id`, `name`, `location`, `tags`, `properties`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ArmResource {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub tags: Tags,
    #[serde(default)]
    pub properties: Value,
}

impl ArmResource {
    pub fn from_value(value: Value) -> Result<Self> {
        serde_json::from_value(value).context("Unexpected resource payload")
    }

    pub fn provisioning_state(&self) -> &str {
        self.properties
            .get("provisioningState")
            .and_then(|v| v.as_str())
            .unwrap_or("-")
    }

    /// The returned `id`, or `fallback` when the response omitted it
    pub fn id_or(&self, fallback: String) -> String {
        if self.id.is_empty() {
            fallback
        } else {
            self.id.clone()
        }
    }
}
