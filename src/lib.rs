//! azavset
//!
//! Walks through the lifecycle of Azure availability sets against the
//! Resource Manager REST API: a disposable resource group is created, filled
//! with networking, two VMs and two availability sets, re-tagged, listed,
//! partially deleted and finally torn down.
//!
//! - [`azure`] - Authentication, HTTP and long-running operation handling
//! - [`resource`] - Typed operations per resource type
//! - [`runner`] - The provisioning sequence and its guaranteed cleanup
//! - [`config`] - Persistent user configuration

pub mod azure;
pub mod config;
pub mod resource;
pub mod runner;

/// Version injected at compile time via AZAVSET_VERSION env var (set by CI/CD),
/// or "dev" for local builds.
pub const VERSION: &str = match option_env!("AZAVSET_VERSION") {
    Some(v) => v,
    None => "dev",
};
