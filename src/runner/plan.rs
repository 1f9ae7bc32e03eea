//! Provisioning plan
//!
//! Every name, address range, image and tag a run uses, fixed before the
//! first request is sent.

use crate::config::Config;
use crate::resource::availability_set::{AvailabilitySetSku, AvailabilitySetSpec};
use crate::resource::compute::ImageReference;
use crate::resource::tags::{tags_from, TagUpdate};
use uuid::Uuid;

pub const PRIMARY_FAULT_DOMAINS: u32 = 2;
pub const PRIMARY_UPDATE_DOMAINS: u32 = 4;

/// Where step 11 enumerates availability sets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ListScope {
    #[default]
    Group,
    Subscription,
}

/// Names and settings for one provisioning run
#[derive(Clone)]
pub struct ProvisionPlan {
    pub group_name: String,
    pub location: String,
    pub zone: Option<String>,
    pub vm_size: String,
    pub admin_username: String,
    pub admin_password: String,

    pub virtual_network: String,
    pub virtual_network_prefix: String,
    pub subnet: String,
    pub subnet_prefix: String,
    pub public_ip: String,
    pub network_interface: String,

    pub primary_set: String,
    pub primary_spec: AvailabilitySetSpec,
    pub tag_update: TagUpdate,
    pub secondary_set: String,

    pub linux_vm: String,
    pub linux_image: ImageReference,
    pub windows_vm: String,
    pub windows_image: ImageReference,

    pub list_scope: ListScope,
}

impl ProvisionPlan {
    pub fn from_config(config: &Config) -> Self {
        let location = config.effective_location();
        let zone = Some(config.effective_zone()).filter(|z| !z.is_empty());

        let primary_spec = AvailabilitySetSpec::new(&location)
            .with_domains(PRIMARY_FAULT_DOMAINS, PRIMARY_UPDATE_DOMAINS)
            .with_sku(AvailabilitySetSku::Aligned)
            .with_tags(tags_from([("cluster", "Windowslinux"), ("tag1", "tag1val")]));

        let tag_update = TagUpdate::new()
            .merge("server1", "nginx")
            .merge("server2", "iis")
            .remove("tag1");

        Self {
            group_name: random_group_name(&config.effective_group_prefix()),
            location,
            zone,
            vm_size: config.effective_vm_size(),
            admin_username: config.effective_admin_username(),
            admin_password: generate_admin_password(),

            virtual_network: "azavset-vnet".to_string(),
            virtual_network_prefix: "10.0.0.0/16".to_string(),
            subnet: "azavset-subnet".to_string(),
            subnet_prefix: "10.0.0.0/24".to_string(),
            public_ip: "azavset-ip".to_string(),
            network_interface: "azavset-nic".to_string(),

            primary_set: "availabilityset001".to_string(),
            primary_spec,
            tag_update,
            secondary_set: "availabilityset002".to_string(),

            // Windows computer names are limited to 15 characters
            linux_vm: "vmlinux01".to_string(),
            linux_image: ImageReference::ubuntu_server(),
            windows_vm: "vmwindows01".to_string(),
            windows_image: ImageReference::windows_server(),

            list_scope: ListScope::Group,
        }
    }

    pub fn with_admin_password(mut self, password: String) -> Self {
        self.admin_password = password;
        self
    }

    pub fn with_list_scope(mut self, scope: ListScope) -> Self {
        self.list_scope = scope;
        self
    }
}

/// `prefix` followed by eight random hex characters
pub fn random_group_name(prefix: &str) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{}{}", prefix, &suffix[..8])
}

/// Password meeting Azure's complexity rules: upper, lower, digit and symbol
pub fn generate_admin_password() -> String {
    format!("Az1!{}", Uuid::new_v4().simple())
}
