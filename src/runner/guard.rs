//! Scoped ownership of the sandbox resource group
//!
//! Creating the group hands back a guard; awaiting [`ResourceGroupGuard::release`]
//! deletes it. Deletion is async and cannot run from `Drop`, so a guard
//! dropped without release only logs the leaked group.

use crate::azure::client::AzureClient;
use crate::azure::http::format_azure_error;
use crate::resource::group;
use crate::resource::model::ArmResource;
use anyhow::Result;

/// Result of tearing the sandbox down
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CleanupOutcome {
    Deleted,
    Failed(String),
}

pub struct ResourceGroupGuard {
    client: AzureClient,
    name: String,
    released: bool,
}

impl ResourceGroupGuard {
    /// Create the resource group. On error nothing exists and there is nothing to release.
    pub async fn acquire(
        client: &AzureClient,
        name: &str,
        location: &str,
    ) -> Result<(Self, ArmResource)> {
        let created = group::create(client, name, location).await?;

        let guard = Self {
            client: client.clone(),
            name: name.to_string(),
            released: false,
        };
        Ok((guard, created))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Delete the group and everything in it. Never fails: errors are logged and returned as an outcome.
    pub async fn release(mut self) -> CleanupOutcome {
        self.released = true;

        match group::delete(&self.client, &self.name).await {
            Ok(()) => {
                tracing::info!("Resource group '{}' deleted", self.name);
                CleanupOutcome::Deleted
            }
            Err(e) => {
                tracing::error!("Cleanup of resource group '{}' failed: {:#}", self.name, e);
                CleanupOutcome::Failed(format_azure_error(&e))
            }
        }
    }
}

impl Drop for ResourceGroupGuard {
    fn drop(&mut self) {
        if !self.released {
            tracing::warn!(
                "Resource group '{}' was not deleted; remove it manually",
                self.name
            );
        }
    }
}
