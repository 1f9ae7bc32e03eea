//! Azure Client
//!
//! Main client for Resource Manager, combining authentication, HTTP and
//! long-running-operation handling into call-and-wait verbs.

use super::auth::{AzureCredentials, Credentials, DEFAULT_AUTHORITY_HOST, DEFAULT_RESOURCE_MANAGER};
use super::http::{ArmResponse, AzureHttpClient};
use super::operation::{self, PollSettings, PollTarget};
use anyhow::{Context, Result};
use serde_json::Value;

/// `api-version` query values per resource provider
pub mod api_versions {
    pub const RESOURCES: &str = "2022-09-01";
    pub const COMPUTE: &str = "2023-09-01";
    pub const NETWORK: &str = "2023-09-01";
}

/// Identity and management endpoints for a cloud
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub authority_host: String,
    pub resource_manager: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            authority_host: DEFAULT_AUTHORITY_HOST.to_string(),
            resource_manager: DEFAULT_RESOURCE_MANAGER.to_string(),
        }
    }
}

/// Main Azure client
#[derive(Clone)]
pub struct AzureClient {
    pub credentials: AzureCredentials,
    pub http: AzureHttpClient,
    pub subscription_id: String,
    pub resource_manager: String,
    pub poll: PollSettings,
}

impl AzureClient {
    /// Create a new client. No network traffic happens until the first call.
    pub fn new(credentials: Credentials, endpoints: &Endpoints, poll: PollSettings) -> Result<Self> {
        let credentials = AzureCredentials::new(
            credentials,
            &endpoints.authority_host,
            &endpoints.resource_manager,
        )?;
        let subscription_id = credentials.subscription_id().to_string();
        let http = AzureHttpClient::new()?;

        Ok(Self {
            credentials,
            http,
            subscription_id,
            resource_manager: endpoints.resource_manager.trim_end_matches('/').to_string(),
            poll,
        })
    }

    /// Acquire a token up front so bad credentials fail before any resource exists
    pub async fn authenticate(&self) -> Result<()> {
        self.credentials
            .get_token()
            .await
            .context("Failed to authenticate with Azure")?;
        Ok(())
    }

    /// GET returning the full response, used by operation polling
    pub async fn get_raw(&self, url: &str) -> Result<ArmResponse> {
        let token = self.credentials.get_token().await?;
        self.http.get(url, &token).await
    }

    /// Make a GET request
    pub async fn get(&self, url: &str) -> Result<Value> {
        Ok(self.get_raw(url).await?.body)
    }

    /// GET a collection and follow `nextLink` until the last page
    pub async fn get_all_pages(&self, url: &str) -> Result<Vec<Value>> {
        let mut all_items = Vec::new();
        let mut next = Some(url.to_string());

        while let Some(page_url) = next {
            let page = self.get(&page_url).await?;

            if let Some(items) = page.get("value").and_then(|v| v.as_array()) {
                all_items.extend(items.iter().cloned());
            }

            next = page
                .get("nextLink")
                .and_then(|v| v.as_str())
                .filter(|s| !s.is_empty())
                .map(str::to_string);
        }

        Ok(all_items)
    }

    /// PUT a resource and wait until it is provisioned
    pub async fn put(&self, url: &str, body: &Value) -> Result<Value> {
        let token = self.credentials.get_token().await?;
        let response = self.http.put(url, &token, body).await?;
        self.settle_write(url, response).await
    }

    /// PATCH a resource and wait until the update is applied
    pub async fn patch(&self, url: &str, body: &Value) -> Result<Value> {
        let token = self.credentials.get_token().await?;
        let response = self.http.patch(url, &token, body).await?;
        self.settle_write(url, response).await
    }

    /// DELETE a resource and wait until it is gone
    pub async fn delete(&self, url: &str) -> Result<()> {
        let token = self.credentials.get_token().await?;
        let response = self.http.delete(url, &token).await?;

        if let Some(target) = PollTarget::from_response(url, &response) {
            operation::wait_for_completion(self, &target, response.retry_after).await?;
        }
        Ok(())
    }

    async fn settle_write(&self, url: &str, response: ArmResponse) -> Result<Value> {
        let Some(target) = PollTarget::from_response(url, &response) else {
            return Ok(response.body);
        };

        tracing::debug!("Waiting for operation on {}", url);
        let body = operation::wait_for_completion(self, &target, response.retry_after).await?;

        match target {
            PollTarget::ProvisioningState(_) => Ok(body),
            // The operation endpoints do not return the resource
            _ => self.get(url).await,
        }
    }

    // =========================================================================
    // Resource Manager URL helpers
    // =========================================================================

    /// Build a subscription-scoped URL
    pub fn subscription_url(&self, path: &str, api_version: &str) -> String {
        format!(
            "{}/subscriptions/{}/{}?api-version={}",
            self.resource_manager,
            encode(&self.subscription_id),
            path.trim_start_matches('/'),
            api_version
        )
    }

    /// Build the URL of a resource group
    pub fn resource_group_url(&self, group: &str) -> String {
        self.subscription_url(
            &format!("resourcegroups/{}", encode(group)),
            api_versions::RESOURCES,
        )
    }

    /// Build the URL of a provider resource (or collection when `name` is `None`)
    pub fn provider_url(
        &self,
        group: &str,
        resource_type: &str,
        name: Option<&str>,
        api_version: &str,
    ) -> String {
        let mut path = format!(
            "resourceGroups/{}/providers/{}",
            encode(group),
            resource_type
        );
        if let Some(name) = name {
            path.push('/');
            path.push_str(&encode(name));
        }
        self.subscription_url(&path, api_version)
    }

    pub fn resource_group_id(&self, group: &str) -> String {
        format!("/subscriptions/{}/resourceGroups/{}", self.subscription_id, group)
    }

    /// Fully-qualified resource identifier, as used in request bodies
    pub fn resource_id(&self, group: &str, resource_type: &str, name: &str) -> String {
        format!(
            "/subscriptions/{}/resourceGroups/{}/providers/{}/{}",
            self.subscription_id, group, resource_type, name
        )
    }
}

fn encode(segment: &str) -> String {
    urlencoding::encode(segment).into_owned()
}
