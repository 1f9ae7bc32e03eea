//! Networking: virtual networks, subnets, public IPs and network interfaces

use super::model::ArmResource;
use crate::azure::client::{api_versions, AzureClient};
use anyhow::{Context, Result};
use serde_json::{json, Value};

pub const VIRTUAL_NETWORK_TYPE: &str = "Microsoft.Network/virtualNetworks";
pub const PUBLIC_IP_TYPE: &str = "Microsoft.Network/publicIPAddresses";
pub const NETWORK_INTERFACE_TYPE: &str = "Microsoft.Network/networkInterfaces";

async fn put_network(
    client: &AzureClient,
    group: &str,
    resource_type: &str,
    name: &str,
    body: &Value,
) -> Result<ArmResource> {
    let url = client.provider_url(group, resource_type, Some(name), api_versions::NETWORK);
    let response = client.put(&url, body).await?;
    let resource = ArmResource::from_value(response)?;

    tracing::debug!(
        "{} '{}' provisioning state: {}",
        resource_type,
        name,
        resource.provisioning_state()
    );
    Ok(resource)
}

/// Create a virtual network spanning `address_prefix`
pub async fn create_virtual_network(
    client: &AzureClient,
    group: &str,
    name: &str,
    location: &str,
    address_prefix: &str,
) -> Result<ArmResource> {
    tracing::info!("Creating virtual network '{}' ({})", name, address_prefix);

    let body = json!({
        "location": location,
        "properties": {
            "addressSpace": { "addressPrefixes": [address_prefix] }
        }
    });
    put_network(client, group, VIRTUAL_NETWORK_TYPE, name, &body)
        .await
        .with_context(|| format!("Failed to create virtual network '{}'", name))
}

/// Create a subnet inside an existing virtual network
pub async fn create_subnet(
    client: &AzureClient,
    group: &str,
    virtual_network: &str,
    name: &str,
    address_prefix: &str,
) -> Result<ArmResource> {
    tracing::info!("Creating subnet '{}' ({})", name, address_prefix);

    let resource_type = format!("{}/{}/subnets", VIRTUAL_NETWORK_TYPE, virtual_network);
    let body = json!({ "properties": { "addressPrefix": address_prefix } });
    put_network(client, group, &resource_type, name, &body)
        .await
        .with_context(|| format!("Failed to create subnet '{}'", name))
}

/// Create a static, standard-SKU IPv4 public address
pub async fn create_public_ip(
    client: &AzureClient,
    group: &str,
    name: &str,
    location: &str,
) -> Result<ArmResource> {
    tracing::info!("Creating public IP address '{}'", name);

    let body = json!({
        "location": location,
        "sku": { "name": "Standard" },
        "properties": {
            "publicIPAllocationMethod": "Static",
            "publicIPAddressVersion": "IPv4"
        }
    });
    let resource = put_network(client, group, PUBLIC_IP_TYPE, name, &body)
        .await
        .with_context(|| format!("Failed to create public IP address '{}'", name))?;

    if let Some(ip) = resource.properties.get("ipAddress").and_then(|v| v.as_str()) {
        tracing::info!("Public IP address '{}' allocated {}", name, ip);
    }
    Ok(resource)
}

/// Create a network interface on `subnet_id` with `public_ip_id` attached
pub async fn create_network_interface(
    client: &AzureClient,
    group: &str,
    name: &str,
    location: &str,
    subnet_id: &str,
    public_ip_id: &str,
) -> Result<ArmResource> {
    tracing::info!("Creating network interface '{}'", name);

    let body = json!({
        "location": location,
        "properties": {
            "ipConfigurations": [{
                "name": format!("{}-ipconfig", name),
                "properties": {
                    "subnet": { "id": subnet_id },
                    "publicIPAddress": { "id": public_ip_id }
                }
            }]
        }
    });
    put_network(client, group, NETWORK_INTERFACE_TYPE, name, &body)
        .await
        .with_context(|| format!("Failed to create network interface '{}'", name))
}
