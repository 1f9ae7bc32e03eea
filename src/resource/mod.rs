//! Resource operations
//!
//! One module per resource type the provisioning run touches. Each exposes
//! plain async functions over [`AzureClient`](crate::azure::client::AzureClient)
//! that issue the request, wait for the operation to settle and return the
//! typed resource.
//!
//! # Modules
//!
//! - [`group`] - Resource groups
//! - [`availability_set`] - Availability sets (create, get, re-tag, list, delete)
//! - [`network`] - Virtual networks, subnets, public IPs, network interfaces
//! - [`compute`] - Virtual machines and image references
//! - [`tags`] - Tag maps and merge/remove updates
//!
//! # Example
//!
//! ```ignore
//! use azavset::resource::availability_set::{self, AvailabilitySetSpec};
//!
//! async fn example(client: &azavset::azure::client::AzureClient) -> anyhow::Result<()> {
//!     let spec = AvailabilitySetSpec::new("eastus").with_domains(2, 4);
//!     let set = availability_set::create_or_update(client, "my-group", "as1", &spec).await?;
//!     println!("{}", set);
//!     Ok(())
//! }
//! ```

pub mod availability_set;
pub mod compute;
pub mod group;
pub mod model;
pub mod network;
pub mod tags;

pub use availability_set::{AvailabilitySet, AvailabilitySetSku, AvailabilitySetSpec};
pub use compute::{ImageReference, VirtualMachineSpec};
pub use model::ArmResource;
pub use tags::{TagUpdate, Tags};
