//! Virtual machines

use super::model::ArmResource;
use crate::azure::client::{api_versions, AzureClient};
use anyhow::{Context, Result};
use serde_json::{json, Value};

pub const VIRTUAL_MACHINE_TYPE: &str = "Microsoft.Compute/virtualMachines";

/// Marketplace image reference
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageReference {
    pub publisher: String,
    pub offer: String,
    pub sku: String,
    pub version: String,
}

impl ImageReference {
    pub fn new(publisher: &str, offer: &str, sku: &str, version: &str) -> Self {
        Self {
            publisher: publisher.to_string(),
            offer: offer.to_string(),
            sku: sku.to_string(),
            version: version.to_string(),
        }
    }

    /// Ubuntu Server 22.04 LTS
    pub fn ubuntu_server() -> Self {
        Self::new("Canonical", "0001-com-ubuntu-server-jammy", "22_04-lts-gen2", "latest")
    }

    /// Windows Server 2022 Datacenter
    pub fn windows_server() -> Self {
        Self::new(
            "MicrosoftWindowsServer",
            "WindowsServer",
            "2022-datacenter-azure-edition",
            "latest",
        )
    }

    fn to_body(&self) -> Value {
        json!({
            "publisher": self.publisher,
            "offer": self.offer,
            "sku": self.sku,
            "version": self.version,
        })
    }
}

impl std::fmt::Display for ImageReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}:{}:{}", self.publisher, self.offer, self.sku, self.version)
    }
}

/// Everything needed to create one VM
#[derive(Debug, Clone)]
pub struct VirtualMachineSpec {
    pub location: String,
    pub size: String,
    pub image: ImageReference,
    pub computer_name: String,
    pub admin_username: String,
    pub admin_password: String,
    pub network_interface_id: String,
    pub availability_set_id: String,
    pub zone: Option<String>,
}

impl VirtualMachineSpec {
    pub fn to_body(&self) -> Value {
        let mut body = json!({
            "location": self.location,
            "properties": {
                "hardwareProfile": { "vmSize": self.size },
                "storageProfile": {
                    "imageReference": self.image.to_body(),
                    "osDisk": {
                        "createOption": "FromImage",
                        "managedDisk": { "storageAccountType": "Standard_LRS" }
                    }
                },
                "osProfile": {
                    "computerName": self.computer_name,
                    "adminUsername": self.admin_username,
                    "adminPassword": self.admin_password
                },
                "networkProfile": {
                    "networkInterfaces": [{ "id": self.network_interface_id }]
                },
                "availabilitySet": { "id": self.availability_set_id }
            }
        });
        if let Some(zone) = &self.zone {
            body["zones"] = json!([zone]);
        }
        body
    }
}

/// Create a VM and wait until it is provisioned
pub async fn create_virtual_machine(
    client: &AzureClient,
    group: &str,
    name: &str,
    spec: &VirtualMachineSpec,
) -> Result<ArmResource> {
    tracing::info!("Creating virtual machine '{}' from {}", name, spec.image);

    let url = client.provider_url(group, VIRTUAL_MACHINE_TYPE, Some(name), api_versions::COMPUTE);
    let response = client
        .put(&url, &spec.to_body())
        .await
        .with_context(|| format!("Failed to create virtual machine '{}'", name))?;

    ArmResource::from_value(response)
}
