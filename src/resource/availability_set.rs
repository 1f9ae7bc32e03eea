//! Availability Sets
//!
//! Create, read, re-tag, list and delete `Microsoft.Compute/availabilitySets`.

use super::tags::{format_tags, Tags};
use crate::azure::client::{api_versions, AzureClient};
use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::fmt;

pub const RESOURCE_TYPE: &str = "Microsoft.Compute/availabilitySets";

/// Availability set SKU. `Aligned` is required for VMs with managed disks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AvailabilitySetSku {
    Aligned,
    Classic,
}

impl AvailabilitySetSku {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Aligned => "Aligned",
            Self::Classic => "Classic",
        }
    }
}

/// Desired state of an availability set.
/// Unset fields are left out of the request so the service defaults apply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvailabilitySetSpec {
    pub location: String,
    pub fault_domains: Option<u32>,
    pub update_domains: Option<u32>,
    pub sku: Option<AvailabilitySetSku>,
    pub tags: Tags,
}

impl AvailabilitySetSpec {
    pub fn new(location: &str) -> Self {
        Self {
            location: location.to_string(),
            fault_domains: None,
            update_domains: None,
            sku: None,
            tags: Tags::new(),
        }
    }

    pub fn with_domains(mut self, fault_domains: u32, update_domains: u32) -> Self {
        self.fault_domains = Some(fault_domains);
        self.update_domains = Some(update_domains);
        self
    }

    pub fn with_sku(mut self, sku: AvailabilitySetSku) -> Self {
        self.sku = Some(sku);
        self
    }

    pub fn with_tags(mut self, tags: Tags) -> Self {
        self.tags = tags;
        self
    }

    pub fn to_body(&self) -> Value {
        let mut properties = Map::new();
        if let Some(n) = self.fault_domains {
            properties.insert("platformFaultDomainCount".into(), json!(n));
        }
        if let Some(n) = self.update_domains {
            properties.insert("platformUpdateDomainCount".into(), json!(n));
        }

        let mut body = json!({
            "location": self.location,
            "properties": properties,
        });
        if let Some(sku) = self.sku {
            body["sku"] = json!({ "name": sku.as_str() });
        }
        if !self.tags.is_empty() {
            body["tags"] = json!(self.tags);
        }
        body
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Sku {
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubResource {
    #[serde(default)]
    pub id: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilitySetProperties {
    #[serde(default)]
    pub platform_fault_domain_count: Option<u32>,
    #[serde(default)]
    pub platform_update_domain_count: Option<u32>,
    #[serde(default)]
    pub virtual_machines: Vec<SubResource>,
}

/// Availability set as returned by the service
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AvailabilitySet {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub tags: Tags,
    #[serde(default)]
    pub sku: Option<Sku>,
    #[serde(default)]
    pub properties: AvailabilitySetProperties,
}

impl AvailabilitySet {
    pub fn from_value(value: Value) -> Result<Self> {
        serde_json::from_value(value).context("Unexpected availability set payload")
    }

    pub fn fault_domains(&self) -> Option<u32> {
        self.properties.platform_fault_domain_count
    }

    pub fn update_domains(&self) -> Option<u32> {
        self.properties.platform_update_domain_count
    }

    /// The returned `id`, or `fallback` when the response omitted it
    pub fn id_or(&self, fallback: String) -> String {
        if self.id.is_empty() {
            fallback
        } else {
            self.id.clone()
        }
    }

    pub fn sku_name(&self) -> &str {
        self.sku
            .as_ref()
            .and_then(|s| s.name.as_deref())
            .unwrap_or("-")
    }
}

impl fmt::Display for AvailabilitySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let count = |n: Option<u32>| n.map(|n| n.to_string()).unwrap_or_else(|| "-".into());
        write!(
            f,
            "{}  {}  faultDomains={} updateDomains={} sku={} vms={} tags={}",
            self.name,
            self.location,
            count(self.fault_domains()),
            count(self.update_domains()),
            self.sku_name(),
            self.properties.virtual_machines.len(),
            format_tags(&self.tags)
        )
    }
}

fn set_url(client: &AzureClient, group: &str, name: &str) -> String {
    client.provider_url(group, RESOURCE_TYPE, Some(name), api_versions::COMPUTE)
}

/// Create or replace an availability set
pub async fn create_or_update(
    client: &AzureClient,
    group: &str,
    name: &str,
    spec: &AvailabilitySetSpec,
) -> Result<AvailabilitySet> {
    tracing::info!("Creating availability set '{}'", name);

    let response = client
        .put(&set_url(client, group, name), &spec.to_body())
        .await
        .with_context(|| format!("Failed to create availability set '{}'", name))?;

    AvailabilitySet::from_value(response)
}

pub async fn get(client: &AzureClient, group: &str, name: &str) -> Result<AvailabilitySet> {
    let response = client
        .get(&set_url(client, group, name))
        .await
        .with_context(|| format!("Failed to get availability set '{}'", name))?;

    AvailabilitySet::from_value(response)
}

/// Replace the tags of an availability set. Other properties are untouched.
pub async fn update_tags(
    client: &AzureClient,
    group: &str,
    name: &str,
    tags: &Tags,
) -> Result<AvailabilitySet> {
    tracing::info!("Updating tags of availability set '{}' to {}", name, format_tags(tags));

    let response = client
        .patch(&set_url(client, group, name), &json!({ "tags": tags }))
        .await
        .with_context(|| format!("Failed to update availability set '{}'", name))?;

    AvailabilitySet::from_value(response)
}

/// List every availability set in a resource group
pub async fn list(client: &AzureClient, group: &str) -> Result<Vec<AvailabilitySet>> {
    let url = client.provider_url(group, RESOURCE_TYPE, None, api_versions::COMPUTE);
    collect(client, &url)
        .await
        .with_context(|| format!("Failed to list availability sets in '{}'", group))
}

/// List every availability set in the subscription
pub async fn list_by_subscription(client: &AzureClient) -> Result<Vec<AvailabilitySet>> {
    let url = client.subscription_url(
        &format!("providers/{}", RESOURCE_TYPE),
        api_versions::COMPUTE,
    );
    collect(client, &url)
        .await
        .context("Failed to list availability sets in subscription")
}

async fn collect(client: &AzureClient, url: &str) -> Result<Vec<AvailabilitySet>> {
    client
        .get_all_pages(url)
        .await?
        .into_iter()
        .map(AvailabilitySet::from_value)
        .collect()
}

pub async fn delete(client: &AzureClient, group: &str, name: &str) -> Result<()> {
    tracing::info!("Deleting availability set '{}'", name);

    client
        .delete(&set_url(client, group, name))
        .await
        .with_context(|| format!("Failed to delete availability set '{}'", name))
}
