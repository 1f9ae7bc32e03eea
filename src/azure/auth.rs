//! Azure Authentication
//!
//! Loads service principal credentials from the environment and exchanges
//! them for Resource Manager access tokens with the OAuth2 client-credentials
//! grant.

use super::http::sanitize_for_log;
use anyhow::{Context, Result};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

pub const DEFAULT_AUTHORITY_HOST: &str = "https://login.microsoftonline.com";
pub const DEFAULT_RESOURCE_MANAGER: &str = "https://management.azure.com";

/// Token expiry buffer - refresh tokens this much before they actually expire
/// This prevents using tokens that are about to expire during a request
const TOKEN_EXPIRY_BUFFER: Duration = Duration::from_secs(60);

/// TTL used when the identity provider omits `expires_in`
const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(60 * 60);

/// Service principal credential material.
/// Read from `CLIENT_ID`, `CLIENT_SECRET`, `TENANT_ID` and `SUBSCRIPTION_ID`,
/// each also accepted with an `AZURE_` prefix.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: String,
    pub tenant_id: String,
    pub subscription_id: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("tenant_id", &self.tenant_id)
            .field("subscription_id", &self.subscription_id)
            .finish()
    }
}

impl Credentials {
    /// Read credentials from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read credentials through an arbitrary variable lookup.
    /// All missing variables are reported in a single error.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut missing = Vec::new();
        let mut require = |var: &'static str| match lookup_var(&lookup, var) {
            Some(value) => value,
            None => {
                missing.push(var);
                String::new()
            }
        };

        let client_id = require("CLIENT_ID");
        let client_secret = require("CLIENT_SECRET");
        let tenant_id = require("TENANT_ID");
        let subscription_id = require("SUBSCRIPTION_ID");

        if !missing.is_empty() {
            anyhow::bail!(
                "Missing required environment variables: {} (AZURE_-prefixed names are also accepted)",
                missing.join(", ")
            );
        }

        if !validate_tenant_id(&tenant_id) {
            anyhow::bail!("Invalid TENANT_ID: expected a GUID or a domain name");
        }

        Ok(Self {
            client_id,
            client_secret,
            tenant_id,
            subscription_id,
        })
    }
}

fn lookup_var<F>(lookup: &F, var: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(var)
        .or_else(|| lookup(&format!("AZURE_{}", var)))
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Validate a tenant identifier before it is placed in a URL path.
/// Tenants are GUIDs or verified domains: alphanumerics, hyphens and dots.
fn validate_tenant_id(tenant: &str) -> bool {
    !tenant.is_empty()
        && !tenant.starts_with('.')
        && !tenant.contains("..")
        && tenant
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.')
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    /// Seconds; v1 endpoints send it as a string
    #[serde(default)]
    expires_in: Option<Value>,
}

impl TokenResponse {
    fn ttl(&self) -> Duration {
        self.expires_in
            .as_ref()
            .and_then(|v| v.as_u64().or_else(|| v.as_str().and_then(|s| s.parse().ok())))
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_TOKEN_TTL)
    }
}

#[derive(Clone)]
struct CachedToken {
    token: String,
    /// When this token expires (with buffer applied)
    expires_at: Instant,
}

impl CachedToken {
    fn is_valid(&self) -> bool {
        Instant::now() < self.expires_at
    }
}

/// Client-credentials token source with caching
#[derive(Clone)]
pub struct AzureCredentials {
    credentials: Credentials,
    client: Client,
    token_url: String,
    scope: String,
    token_cache: Arc<RwLock<Option<CachedToken>>>,
}

impl AzureCredentials {
    pub fn new(credentials: Credentials, authority_host: &str, resource_manager: &str) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("azavset/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to create HTTP client")?;

        let token_url = format!(
            "{}/{}/oauth2/v2.0/token",
            authority_host.trim_end_matches('/'),
            credentials.tenant_id
        );
        let scope = format!("{}/.default", resource_manager.trim_end_matches('/'));

        Ok(Self {
            credentials,
            client,
            token_url,
            scope,
            token_cache: Arc::new(RwLock::new(None)),
        })
    }

    pub fn subscription_id(&self) -> &str {
        &self.credentials.subscription_id
    }

    /// Get an access token for API calls, reusing the cached one while valid
    pub async fn get_token(&self) -> Result<String> {
        {
            let cache = self.token_cache.read().await;
            if let Some(cached) = cache.as_ref() {
                if cached.is_valid() {
                    return Ok(cached.token.clone());
                }
                tracing::debug!("Cached token expired, fetching new token");
            }
        }

        let response = self.request_token().await?;
        let ttl = response.ttl();
        let expires_at = Instant::now() + ttl.saturating_sub(TOKEN_EXPIRY_BUFFER);

        {
            let mut cache = self.token_cache.write().await;
            *cache = Some(CachedToken {
                token: response.access_token.clone(),
                expires_at,
            });
        }

        tracing::debug!(
            "New token cached, expires in ~{} minutes",
            ttl.saturating_sub(TOKEN_EXPIRY_BUFFER).as_secs() / 60
        );

        Ok(response.access_token)
    }

    /// Force refresh the token
    pub async fn refresh_token(&self) -> Result<String> {
        {
            let mut cache = self.token_cache.write().await;
            *cache = None;
        }

        self.get_token().await
    }

    async fn request_token(&self) -> Result<TokenResponse> {
        tracing::debug!("POST {}", self.token_url);

        let form = [
            ("grant_type", "client_credentials"),
            ("client_id", self.credentials.client_id.as_str()),
            ("client_secret", self.credentials.client_secret.as_str()),
            ("scope", self.scope.as_str()),
        ];

        let response = self
            .client
            .post(&self.token_url)
            .form(&form)
            .send()
            .await
            .context("Failed to reach the identity provider")?;

        let status = response.status();
        let body = response
            .text()
            .await
            .context("Failed to read token response")?;

        if !status.is_success() {
            tracing::error!("Token request rejected: {} - {}", status, sanitize_for_log(&body));
            let reason = serde_json::from_str::<Value>(&body)
                .ok()
                .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(str::to_string))
                .unwrap_or_else(|| "unknown_error".to_string());
            anyhow::bail!(
                "Credential rejected by identity provider ({}): {}",
                status.as_u16(),
                reason
            );
        }

        serde_json::from_str(&body).context("Failed to parse token response")
    }
}
