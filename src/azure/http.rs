//! HTTP utilities for Azure Resource Manager REST calls

use anyhow::{Context, Result};
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::{Client, Method};
use serde_json::Value;
use std::fmt;
use std::time::Duration;

/// Maximum length of response body to log (to avoid logging sensitive data)
const MAX_LOG_BODY_LENGTH: usize = 200;

const ASYNC_OPERATION_HEADER: &str = "azure-asyncoperation";

/// Sanitize response body for logging
/// Truncates long responses and strips control characters
pub(crate) fn sanitize_for_log(body: &str) -> String {
    let total = body.chars().count();
    let truncated = if total > MAX_LOG_BODY_LENGTH {
        let head: String = body.chars().take(MAX_LOG_BODY_LENGTH).collect();
        format!("{}... [truncated, {} bytes total]", head, body.len())
    } else {
        body.to_string()
    };

    truncated.replace(|c: char| !c.is_ascii_graphic() && c != ' ', "")
}

/// Error returned by the management plane for a non-2xx response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArmError {
    pub status: u16,
    pub code: Option<String>,
    pub message: Option<String>,
}

impl ArmError {
    /// Build from a status code and the raw response body.
    ///
    /// ARM wraps failures as `{"error": {"code": "...", "message": "..."}}`;
    /// anything else leaves `code` and `message` empty.
    pub fn from_body(status: u16, body: &str) -> Self {
        let parsed: Option<Value> = serde_json::from_str(body).ok();
        let error = parsed.as_ref().and_then(|v| v.get("error"));

        Self {
            status,
            code: error
                .and_then(|e| e.get("code"))
                .and_then(|v| v.as_str())
                .map(str::to_string),
            message: error
                .and_then(|e| e.get("message"))
                .and_then(|v| v.as_str())
                .map(str::to_string),
        }
    }
}

impl fmt::Display for ArmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "API request failed: {}", self.status)?;
        if let Some(code) = &self.code {
            write!(f, " ({})", code)?;
        }
        if let Some(message) = &self.message {
            write!(f, ": {}", sanitize_for_log(message))?;
        }
        Ok(())
    }
}

impl std::error::Error for ArmError {}

/// A successful response, with the headers that describe follow-up polling
#[derive(Debug, Clone)]
pub struct ArmResponse {
    pub status: u16,
    pub body: Value,
    pub async_operation: Option<String>,
    pub location: Option<String>,
    pub retry_after: Option<Duration>,
}

impl ArmResponse {
    fn from_parts(status: u16, headers: &HeaderMap, body: Value) -> Self {
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };

        Self {
            status,
            body,
            async_operation: header(ASYNC_OPERATION_HEADER),
            location: header("location"),
            retry_after: headers
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok())
                .map(Duration::from_secs),
        }
    }
}

/// HTTP client wrapper for Resource Manager API calls
#[derive(Clone)]
pub struct AzureHttpClient {
    client: Client,
}

impl AzureHttpClient {
    /// Create a new HTTP client
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("azavset/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client })
    }

    /// Send a request and return status, polling headers and parsed body
    pub async fn send(
        &self,
        method: Method,
        url: &str,
        token: &str,
        body: Option<&Value>,
    ) -> Result<ArmResponse> {
        tracing::debug!("{} {}", method, url);

        let mut request = self.client.request(method, url).bearer_auth(token);

        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.context("Failed to send request")?;

        let status = response.status();
        let headers = response.headers().clone();
        let text = response
            .text()
            .await
            .context("Failed to read response body")?;

        if !status.is_success() {
            // Only the sanitized/truncated body reaches the log
            tracing::error!("API error: {} - {}", status, sanitize_for_log(&text));
            return Err(ArmError::from_body(status.as_u16(), &text).into());
        }

        let body = if text.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text).context("Failed to parse response JSON")?
        };

        Ok(ArmResponse::from_parts(status.as_u16(), &headers, body))
    }

    pub async fn get(&self, url: &str, token: &str) -> Result<ArmResponse> {
        self.send(Method::GET, url, token, None).await
    }

    pub async fn put(&self, url: &str, token: &str, body: &Value) -> Result<ArmResponse> {
        self.send(Method::PUT, url, token, Some(body)).await
    }

    pub async fn patch(&self, url: &str, token: &str, body: &Value) -> Result<ArmResponse> {
        self.send(Method::PATCH, url, token, Some(body)).await
    }

    pub async fn delete(&self, url: &str, token: &str) -> Result<ArmResponse> {
        self.send(Method::DELETE, url, token, None).await
    }
}

/// Find the management-plane error in an error chain, if any
pub fn arm_error(error: &anyhow::Error) -> Option<&ArmError> {
    error.chain().find_map(|e| e.downcast_ref::<ArmError>())
}

/// Format an Azure API error for display
/// Avoids leaking raw API payloads to the terminal
pub fn format_azure_error(error: &anyhow::Error) -> String {
    if let Some(arm) = arm_error(error) {
        return match arm.status {
            401 => "Authentication failed. Check CLIENT_ID, CLIENT_SECRET and TENANT_ID.".to_string(),
            403 => "Permission denied. Check the service principal's role assignments.".to_string(),
            404 => "Resource not found.".to_string(),
            409 => "Resource conflict. The resource may already exist or be in use.".to_string(),
            429 => "Rate limit exceeded. Please try again later.".to_string(),
            400 => match &arm.code {
                Some(code) => format!("Invalid request ({}). Check your parameters.", code),
                None => "Invalid request. Check your parameters.".to_string(),
            },
            s if s >= 500 => "Azure service temporarily unavailable. Please try again.".to_string(),
            _ => "Request failed. Check your network connection and try again.".to_string(),
        };
    }

    // Not an API response: keep the outermost context, trimmed
    let error_str = error.to_string();
    let sanitized = error_str
        .chars()
        .filter(|c| c.is_ascii_graphic() || *c == ' ')
        .take(120)
        .collect::<String>();

    if sanitized.len() < error_str.len() {
        format!("{}...", sanitized)
    } else {
        sanitized
    }
}
