//! Resource groups

use super::model::ArmResource;
use crate::azure::client::AzureClient;
use anyhow::{Context, Result};
use serde_json::json;

/// Create (or update) a resource group in `location`
pub async fn create(client: &AzureClient, name: &str, location: &str) -> Result<ArmResource> {
    tracing::info!("Creating resource group '{}' in {}", name, location);

    let url = client.resource_group_url(name);
    let body = json!({ "location": location });
    let response = client
        .put(&url, &body)
        .await
        .with_context(|| format!("Failed to create resource group '{}'", name))?;

    ArmResource::from_value(response)
}

/// Delete a resource group and everything in it, waiting for completion
pub async fn delete(client: &AzureClient, name: &str) -> Result<()> {
    tracing::info!("Deleting resource group '{}'", name);

    let url = client.resource_group_url(name);
    client
        .delete(&url)
        .await
        .with_context(|| format!("Failed to delete resource group '{}'", name))
}
