//! Provisioning runner
//!
//! Drives the fixed availability-set walkthrough: create a sandbox resource
//! group, build networking, two VMs and two availability sets inside it,
//! re-tag, list, delete, and finally tear the group down.
//!
//! Every call is awaited before the next one starts and nothing is retried.
//! Once the group exists it is deleted on every exit path; a cleanup failure
//! is logged and reported, never raised.

mod guard;
mod plan;

pub use guard::{CleanupOutcome, ResourceGroupGuard};
pub use plan::{
    generate_admin_password, random_group_name, ListScope, ProvisionPlan,
    PRIMARY_FAULT_DOMAINS, PRIMARY_UPDATE_DOMAINS,
};

use crate::azure::client::AzureClient;
use crate::resource::availability_set::{self, AvailabilitySet, AvailabilitySetSpec};
use crate::resource::compute::{self, ImageReference, VirtualMachineSpec};
use crate::resource::network;
use anyhow::Result;
use chrono::{DateTime, Utc};

/// Lifecycle of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Unauthenticated,
    GroupCreated,
    Provisioned,
    Cleaned,
}

/// What a successful run created and observed
#[derive(Debug, Clone)]
pub struct RunReport {
    pub group_name: String,
    /// Ids of every resource created, in creation order
    pub created: Vec<String>,
    /// Availability set #1 after its tag update
    pub primary_set: AvailabilitySet,
    /// Availability sets enumerated in step 11
    pub listed: Vec<AvailabilitySet>,
    pub cleanup: CleanupOutcome,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// Output of the provisioning body, before cleanup
struct Provisioned {
    created: Vec<String>,
    primary_set: AvailabilitySet,
    listed: Vec<AvailabilitySet>,
}

pub struct Runner {
    client: AzureClient,
    plan: ProvisionPlan,
    state: RunState,
    cleanup: Option<CleanupOutcome>,
}

impl Runner {
    pub fn new(client: AzureClient, plan: ProvisionPlan) -> Self {
        Self {
            client,
            plan,
            state: RunState::Unauthenticated,
            cleanup: None,
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// How cleanup went, once it has run
    pub fn cleanup_outcome(&self) -> Option<&CleanupOutcome> {
        self.cleanup.as_ref()
    }

    /// Execute the whole sequence.
    ///
    /// Errors before the group exists return immediately. Later errors are
    /// returned after the group has been deleted.
    pub async fn run(&mut self) -> Result<RunReport> {
        let started_at = Utc::now();

        self.client.authenticate().await?;
        tracing::info!("Authenticated for subscription {}", self.client.subscription_id);

        let (guard, group) =
            ResourceGroupGuard::acquire(&self.client, &self.plan.group_name, &self.plan.location)
                .await?;
        self.state = RunState::GroupCreated;

        let group_id = group.id_or(self.client.resource_group_id(guard.name()));
        let outcome = self.provision(group_id).await;
        match &outcome {
            Ok(_) => self.state = RunState::Provisioned,
            Err(e) => tracing::error!("Provisioning aborted: {:#}", e),
        }

        tracing::info!("Cleaning up resource group '{}'", guard.name());
        let cleanup = guard.release().await;
        self.state = RunState::Cleaned;
        self.cleanup = Some(cleanup.clone());

        let provisioned = outcome?;
        Ok(RunReport {
            group_name: self.plan.group_name.clone(),
            created: provisioned.created,
            primary_set: provisioned.primary_set,
            listed: provisioned.listed,
            cleanup,
            started_at,
            finished_at: Utc::now(),
        })
    }

    async fn provision(&self, group_id: String) -> Result<Provisioned> {
        let client = &self.client;
        let plan = &self.plan;
        let group = plan.group_name.as_str();
        let mut created = vec![group_id];

        // Availability set #1
        let primary =
            availability_set::create_or_update(client, group, &plan.primary_set, &plan.primary_spec)
                .await?;
        tracing::info!("Created availability set: {}", primary);
        let primary_id = primary.id_or(client.resource_id(
            group,
            availability_set::RESOURCE_TYPE,
            &plan.primary_set,
        ));
        created.push(primary_id.clone());

        // Networking
        let vnet = network::create_virtual_network(
            client,
            group,
            &plan.virtual_network,
            &plan.location,
            &plan.virtual_network_prefix,
        )
        .await?;
        created.push(vnet.id_or(client.resource_id(
            group,
            network::VIRTUAL_NETWORK_TYPE,
            &plan.virtual_network,
        )));

        let subnet = network::create_subnet(
            client,
            group,
            &plan.virtual_network,
            &plan.subnet,
            &plan.subnet_prefix,
        )
        .await?;
        let subnet_id = subnet.id_or(client.resource_id(
            group,
            &format!("{}/{}/subnets", network::VIRTUAL_NETWORK_TYPE, plan.virtual_network),
            &plan.subnet,
        ));
        created.push(subnet_id.clone());

        let public_ip =
            network::create_public_ip(client, group, &plan.public_ip, &plan.location).await?;
        let public_ip_id =
            public_ip.id_or(client.resource_id(group, network::PUBLIC_IP_TYPE, &plan.public_ip));
        created.push(public_ip_id.clone());

        let nic = network::create_network_interface(
            client,
            group,
            &plan.network_interface,
            &plan.location,
            &subnet_id,
            &public_ip_id,
        )
        .await?;
        let nic_id = nic.id_or(client.resource_id(
            group,
            network::NETWORK_INTERFACE_TYPE,
            &plan.network_interface,
        ));
        created.push(nic_id.clone());

        // Both VMs share the NIC and availability set #1; only the first is zone-pinned
        for (name, image, zone) in [
            (&plan.linux_vm, &plan.linux_image, plan.zone.clone()),
            (&plan.windows_vm, &plan.windows_image, None),
        ] {
            let spec = self.vm_spec(name, image, &nic_id, &primary_id, zone);
            let vm = compute::create_virtual_machine(client, group, name, &spec).await?;
            created.push(vm.id_or(client.resource_id(group, compute::VIRTUAL_MACHINE_TYPE, name)));
        }

        // Re-tag availability set #1
        let current = availability_set::get(client, group, &plan.primary_set).await?;
        let tags = plan.tag_update.apply(&current.tags);
        let primary_set =
            availability_set::update_tags(client, group, &plan.primary_set, &tags).await?;
        tracing::info!("Updated availability set: {}", primary_set);

        // Availability set #2 with service defaults
        let secondary = availability_set::create_or_update(
            client,
            group,
            &plan.secondary_set,
            &AvailabilitySetSpec::new(&plan.location),
        )
        .await?;
        tracing::info!("Created availability set: {}", secondary);
        created.push(secondary.id_or(client.resource_id(
            group,
            availability_set::RESOURCE_TYPE,
            &plan.secondary_set,
        )));

        let listed = match plan.list_scope {
            ListScope::Group => availability_set::list(client, group).await?,
            ListScope::Subscription => availability_set::list_by_subscription(client).await?,
        };
        tracing::info!("Found {} availability sets", listed.len());
        for set in &listed {
            println!("{}", set);
        }

        availability_set::delete(client, group, &plan.secondary_set).await?;

        Ok(Provisioned {
            created,
            primary_set,
            listed,
        })
    }

    fn vm_spec(
        &self,
        name: &str,
        image: &ImageReference,
        nic_id: &str,
        availability_set_id: &str,
        zone: Option<String>,
    ) -> VirtualMachineSpec {
        VirtualMachineSpec {
            location: self.plan.location.clone(),
            size: self.plan.vm_size.clone(),
            image: image.clone(),
            computer_name: name.to_string(),
            admin_username: self.plan.admin_username.clone(),
            admin_password: self.plan.admin_password.clone(),
            network_interface_id: nic_id.to_string(),
            availability_set_id: availability_set_id.to_string(),
            zone,
        }
    }
}
