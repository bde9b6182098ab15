//! Cluster descriptor
//!
//! [`ClusterSpec`] is the caller's declarative intent: target version,
//! feature flags, region, identity, topology and any per-component flag
//! overrides. It is read-only for the whole generation run; absent nested
//! maps read as empty.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::component::ComponentKind;
use crate::defaults::Defaults;
use crate::features::FeatureFlags;

static NO_OVERRIDES: BTreeMap<String, String> = BTreeMap::new();

/// Declarative cluster descriptor
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClusterSpec {
    /// Target orchestrator version (e.g. "1.16.9")
    pub orchestrator_version: String,

    /// Deployment region
    #[serde(default)]
    pub location: String,

    /// Tri-state feature flags
    #[serde(default)]
    pub features: FeatureFlags,

    /// Directory identity integration for API server authentication
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity: Option<IdentityProfile>,

    /// Control-plane topology
    #[serde(default)]
    pub control_plane: ControlPlaneProfile,

    /// Worker pools; the first pool decides the storage class flavor
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub worker_pools: Vec<WorkerPoolProfile>,

    /// Pod and service networking
    #[serde(default)]
    pub network: NetworkProfile,

    /// On-premises cloud description; presence selects on-premises variants
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_cloud: Option<CustomCloudProfile>,

    /// Caller-supplied flag overrides per component
    #[serde(default)]
    pub overrides: ComponentOverrides,

    /// Per-addon settings keyed by addon name
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub addons: BTreeMap<String, AddonConfig>,

    /// Inline (base64) static pod manifests replacing the shipped templates
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub custom_manifests: BTreeMap<ComponentKind, String>,
}

impl ClusterSpec {
    /// Create a spec for a version and region with everything else defaulted
    pub fn new(orchestrator_version: impl Into<String>, location: impl Into<String>) -> Self {
        Self {
            orchestrator_version: orchestrator_version.into(),
            location: location.into(),
            ..Self::default()
        }
    }

    /// Cloud environment the cluster is deployed into
    pub fn environment(&self, defaults: &Defaults) -> CloudEnvironment {
        if self.custom_cloud.is_some() {
            CloudEnvironment::OnPremises
        } else if defaults.is_sovereign_region(&self.location) {
            CloudEnvironment::Sovereign
        } else {
            CloudEnvironment::Public
        }
    }

    /// Caller overrides for a component (empty when none were supplied)
    pub fn overrides_for(&self, component: ComponentKind) -> &BTreeMap<String, String> {
        self.overrides.get(component).unwrap_or(&NO_OVERRIDES)
    }

    /// Settings for one addon, if the caller supplied any
    pub fn addon(&self, name: &str) -> Option<&AddonConfig> {
        self.addons.get(name)
    }

    /// Storage kind of the first worker pool
    pub fn primary_storage(&self) -> Option<StorageKind> {
        self.worker_pools.first().map(|pool| pool.storage)
    }
}

/// Where the cluster runs, as far as endpoint selection is concerned
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CloudEnvironment {
    /// Generic public cloud
    Public,
    /// Sovereign cloud with its own service endpoint domain
    Sovereign,
    /// On-premises deployment described by a custom cloud profile
    OnPremises,
}

impl fmt::Display for CloudEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CloudEnvironment::Public => "public",
            CloudEnvironment::Sovereign => "sovereign",
            CloudEnvironment::OnPremises => "on-premises",
        })
    }
}

/// Directory identity used for API server OIDC authentication
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct IdentityProfile {
    /// Directory tenant
    pub tenant_id: String,

    /// Server application registered for the API server
    pub server_app_id: String,

    /// Client application used by kubectl
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_app_id: Option<String>,

    /// Group granted cluster-admin
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_group_id: Option<String>,
}

impl IdentityProfile {
    /// Create a profile for a tenant and server application
    pub fn new(tenant_id: impl Into<String>, server_app_id: impl Into<String>) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            server_app_id: server_app_id.into(),
            ..Self::default()
        }
    }

    /// Admin group, if one was configured and is non-empty
    pub fn admin_group(&self) -> Option<&str> {
        self.admin_group_id.as_deref().filter(|id| !id.is_empty())
    }
}

/// Control-plane topology
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ControlPlaneProfile {
    /// Control-plane node count
    #[serde(default = "default_control_plane_count")]
    pub count: u32,

    /// DNS prefix for the cluster's public endpoints
    #[serde(default)]
    pub dns_prefix: String,
}

fn default_control_plane_count() -> u32 {
    1
}

impl Default for ControlPlaneProfile {
    fn default() -> Self {
        Self {
            count: default_control_plane_count(),
            dns_prefix: String::new(),
        }
    }
}

/// A pool of worker nodes
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct WorkerPoolProfile {
    /// Pool name
    pub name: String,

    /// Node count
    #[serde(default)]
    pub count: u32,

    /// Disk flavor backing the pool's nodes
    #[serde(default)]
    pub storage: StorageKind,
}

impl WorkerPoolProfile {
    /// Create a pool with the given storage kind
    pub fn new(name: impl Into<String>, count: u32, storage: StorageKind) -> Self {
        Self {
            name: name.into(),
            count,
            storage,
        }
    }
}

/// Disk flavor backing worker nodes
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq, Hash)]
pub enum StorageKind {
    /// Platform-managed disks
    #[default]
    ManagedDisks,
    /// Disks in caller-owned storage accounts
    StorageAccount,
}

/// Pod and service networking
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NetworkProfile {
    /// CNI plugin
    #[serde(default)]
    pub plugin: NetworkPlugin,

    /// Network policy engine
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy: Option<NetworkPolicy>,

    /// Service cluster IP range
    #[serde(default = "default_service_cidr")]
    pub service_cidr: String,

    /// Pod CIDR
    #[serde(default = "default_cluster_cidr")]
    pub cluster_cidr: String,
}

fn default_service_cidr() -> String {
    "10.0.0.0/16".to_string()
}

fn default_cluster_cidr() -> String {
    "10.244.0.0/16".to_string()
}

impl Default for NetworkProfile {
    fn default() -> Self {
        Self {
            plugin: NetworkPlugin::default(),
            policy: None,
            service_cidr: default_service_cidr(),
            cluster_cidr: default_cluster_cidr(),
        }
    }
}

/// CNI plugin
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum NetworkPlugin {
    /// VNET-integrated CNI; pods get routable addresses
    #[default]
    Azure,
    /// Basic bridge networking with cloud routes
    Kubenet,
    /// Flannel overlay
    Flannel,
    /// Cilium
    Cilium,
}

impl NetworkPlugin {
    /// Whether node pod CIDRs are allocated by the controller manager
    pub fn allocates_node_cidrs(self) -> bool {
        self != NetworkPlugin::Azure
    }

    /// Whether pod routing relies on cloud route tables
    pub fn requires_route_table(self) -> bool {
        self == NetworkPlugin::Kubenet
    }
}

/// Network policy engine
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum NetworkPolicy {
    /// Calico
    Calico,
    /// Cilium
    Cilium,
    /// Platform network policy manager
    Azure,
}

/// On-premises cloud description
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CustomCloudProfile {
    /// Environment name
    pub name: String,

    /// Identity system the stamp authenticates against
    #[serde(default)]
    pub identity_system: IdentitySystem,

    /// Identity endpoint base URL (with trailing slash)
    #[serde(default)]
    pub identity_endpoint: String,
}

/// Identity system of an on-premises cloud
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum IdentitySystem {
    /// Cloud directory
    #[default]
    AzureAd,
    /// Federation services hosted on the stamp
    Adfs,
}

/// Caller-supplied flag overrides per component
///
/// Any map may be absent; absent maps read as empty.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ComponentOverrides {
    /// kube-apiserver flags
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_server: Option<BTreeMap<String, String>>,

    /// kube-controller-manager flags
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub controller_manager: Option<BTreeMap<String, String>>,

    /// kube-scheduler flags
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduler: Option<BTreeMap<String, String>>,

    /// cloud-controller-manager flags
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cloud_controller_manager: Option<BTreeMap<String, String>>,
}

impl ComponentOverrides {
    /// Overrides for a component, if a map was supplied
    pub fn get(&self, component: ComponentKind) -> Option<&BTreeMap<String, String>> {
        match component {
            ComponentKind::ApiServer => self.api_server.as_ref(),
            ComponentKind::ControllerManager => self.controller_manager.as_ref(),
            ComponentKind::Scheduler => self.scheduler.as_ref(),
            ComponentKind::CloudControllerManager => self.cloud_controller_manager.as_ref(),
        }
    }

    /// Mutable overrides for a component, creating an empty map if absent
    pub fn entry(&mut self, component: ComponentKind) -> &mut BTreeMap<String, String> {
        let slot = match component {
            ComponentKind::ApiServer => &mut self.api_server,
            ComponentKind::ControllerManager => &mut self.controller_manager,
            ComponentKind::Scheduler => &mut self.scheduler,
            ComponentKind::CloudControllerManager => &mut self.cloud_controller_manager,
        };
        slot.get_or_insert_with(BTreeMap::new)
    }
}

/// Per-addon settings
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AddonConfig {
    /// Explicit enable/disable; wins over the computed default
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,

    /// Inline base64 payload used instead of the shipped template
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
}
