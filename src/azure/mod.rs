//! Azure Resource Manager interaction module
//!
//! This module provides the core functionality for talking to the Azure
//! management plane over its REST API.
//!
//! # Module Structure
//!
//! - [`auth`] - Service principal credentials and token acquisition
//! - [`client`] - Main client with call-and-wait verbs and URL builders
//! - [`http`] - HTTP utilities for REST API calls
//! - [`operation`] - Long-running operation polling
//!
//! # Example
//!
//! ```ignore
//! use azavset::azure::auth::Credentials;
//! use azavset::azure::client::{AzureClient, Endpoints};
//! use azavset::azure::operation::PollSettings;
//!
//! async fn example() -> anyhow::Result<()> {
//!     let creds = Credentials::from_env()?;
//!     let client = AzureClient::new(creds, &Endpoints::default(), PollSettings::default())?;
//!     let group = client.get(&client.resource_group_url("my-group")).await?;
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod client;
pub mod http;
pub mod operation;
