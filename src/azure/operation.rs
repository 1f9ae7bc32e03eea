//! Long-running operations
//!
//! Resource Manager often acknowledges a write before the work is done. The
//! response headers say where to look for completion; this module follows
//! them until the operation reaches a terminal state.

use super::client::AzureClient;
use super::http::ArmResponse;
use anyhow::{Context, Result};
use serde_json::Value;
use std::time::{Duration, Instant};

/// Status of an operation as reported by the management plane
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationStatus {
    Running,
    Succeeded,
    Failed(String),
    Canceled,
    Unknown(String),
}

impl OperationStatus {
    /// Map an ARM `status` / `provisioningState` string
    pub fn from_api_status(status: &str) -> Self {
        match status.to_ascii_lowercase().as_str() {
            "succeeded" => Self::Succeeded,
            "failed" => Self::Failed(String::new()),
            "canceled" | "cancelled" => Self::Canceled,
            "inprogress" | "accepted" | "running" | "creating" | "updating" | "deleting"
            | "provisioning" => Self::Running,
            _ => Self::Unknown(status.to_string()),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed(_) | Self::Canceled)
    }
}

/// Where completion of a write is observed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollTarget {
    /// `Azure-AsyncOperation` status resource
    AsyncOperation(String),
    /// `Location` URL that answers 202 until the work is done
    Location(String),
    /// The resource itself, until `provisioningState` is terminal
    ProvisioningState(String),
}

impl PollTarget {
    /// Decide how to follow up on a write response, or `None` if it is already complete
    pub fn from_response(resource_url: &str, response: &ArmResponse) -> Option<Self> {
        if let Some(url) = &response.async_operation {
            return Some(Self::AsyncOperation(url.clone()));
        }
        if response.status == 202 {
            return response.location.clone().map(Self::Location);
        }
        if response.status == 201 {
            let state = provisioning_state(&response.body)?;
            if !OperationStatus::from_api_status(state).is_terminal() {
                return Some(Self::ProvisioningState(resource_url.to_string()));
            }
        }
        None
    }

    fn url(&self) -> &str {
        match self {
            Self::AsyncOperation(url) | Self::Location(url) | Self::ProvisioningState(url) => url,
        }
    }
}

/// Poll cadence and overall bound for waiting on an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    pub interval: Duration,
    pub timeout: Duration,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            timeout: Duration::from_secs(30 * 60),
        }
    }
}

pub(crate) fn provisioning_state(body: &Value) -> Option<&str> {
    body.get("properties")
        .and_then(|p| p.get("provisioningState"))
        .and_then(|v| v.as_str())
}

/// `error.message` of a failed operation or resource body
fn failure_message(body: &Value, fallback: &str) -> String {
    body.get("error")
        .and_then(|e| e.get("message"))
        .and_then(|v| v.as_str())
        .unwrap_or(fallback)
        .to_string()
}

fn async_operation_status(body: &Value) -> OperationStatus {
    let status = body
        .get("status")
        .and_then(|v| v.as_str())
        .map(OperationStatus::from_api_status)
        .unwrap_or_else(|| OperationStatus::Unknown("missing status".to_string()));

    match status {
        OperationStatus::Failed(_) => {
            OperationStatus::Failed(failure_message(body, "operation failed"))
        }
        other => other,
    }
}

fn resource_status(body: &Value) -> OperationStatus {
    match provisioning_state(body).map(OperationStatus::from_api_status) {
        Some(OperationStatus::Failed(_)) => OperationStatus::Failed(failure_message(
            &body["properties"],
            "resource provisioningState is Failed",
        )),
        Some(status) => status,
        None => OperationStatus::Succeeded,
    }
}

/// Poll `target` until it reaches a terminal state.
///
/// Returns the body of the final poll response. `Retry-After` from the
/// management plane takes precedence over the configured interval.
pub async fn wait_for_completion(
    client: &AzureClient,
    target: &PollTarget,
    first_delay: Option<Duration>,
) -> Result<Value> {
    let settings = client.poll;
    let started = Instant::now();
    let mut delay = first_delay.unwrap_or(settings.interval);

    loop {
        // delay and timeout may be arbitrarily large
        if started.elapsed().saturating_add(delay) > settings.timeout {
            anyhow::bail!(
                "Timed out after {:?} waiting for operation {}",
                settings.timeout,
                target.url()
            );
        }
        tokio::time::sleep(delay).await;

        let response = client
            .get_raw(target.url())
            .await
            .context("Failed to poll operation status")?;
        delay = response.retry_after.unwrap_or(settings.interval);

        let status = match target {
            PollTarget::AsyncOperation(_) => async_operation_status(&response.body),
            PollTarget::Location(_) if response.status == 202 => OperationStatus::Running,
            PollTarget::Location(_) => OperationStatus::Succeeded,
            PollTarget::ProvisioningState(_) => resource_status(&response.body),
        };

        match status {
            OperationStatus::Succeeded => return Ok(response.body),
            OperationStatus::Failed(message) => anyhow::bail!("Operation failed: {}", message),
            OperationStatus::Canceled => anyhow::bail!("Operation was canceled"),
            OperationStatus::Running => {
                tracing::debug!("Operation still running, next poll in {:?}", delay);
            }
            OperationStatus::Unknown(s) => {
                tracing::warn!("Unknown operation status: {}", s);
            }
        }
    }
}
