//! Addon catalog
//!
//! A declarative table of [`AddonDescriptor`]s in delivery order. Building
//! the catalog evaluates every descriptor against the descriptor and the
//! resolved component maps and yields one [`AddonSpec`] per entry, enabled
//! or not, so the assembler sees the full ordered list.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use tracing::{debug, instrument};

use clustergen_common::condition::{all, any, not, since, until};
use clustergen_common::spec::{
    AddonConfig, IdentitySystem, NetworkPlugin, NetworkPolicy, StorageKind,
};
use clustergen_common::{
    CloudEnvironment, ClusterSpec, ClusterVersion, ComponentKind, Condition, ConfigMap, Defaults,
    EvalContext, Feature, Result,
};

/// Where an entry's content comes from
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PayloadSource {
    /// Caller-supplied base64 payload, used verbatim
    Inline(String),
    /// Shipped template, looked up under `dir` with a `major.minor` variant first
    Template {
        /// Asset directory
        dir: String,
        /// Template file name
        file: String,
        /// `major.minor` of the target version
        version: String,
    },
}

/// One resolved catalog entry
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AddonSpec {
    /// Addon (or manifest) name
    pub name: String,
    /// Whether the entry is delivered
    pub enabled: bool,
    /// Content source
    pub payload: PayloadSource,
    /// Absolute destination path on the control-plane node
    pub destination: String,
    /// Position in declaration order
    pub order: usize,
}

/// Static description of an addon
#[derive(Clone, Debug)]
pub struct AddonDescriptor {
    /// Name callers use to enable, disable or supply the addon
    pub name: &'static str,
    /// Shared caller setting for a family of variants; it supplies inline
    /// data and can switch the family off
    pub config_alias: Option<&'static str>,
    /// Template file under the addon source directory
    pub source: &'static str,
    /// Template used instead on on-premises clouds
    pub on_premises_source: Option<&'static str>,
    /// File name under the addon destination directory
    pub destination: &'static str,
    /// When the addon is delivered without an explicit setting
    pub when: Condition,
    /// Whether the addon is part of the default set at all
    pub default_on: bool,
}

impl AddonDescriptor {
    fn new(name: &'static str, source: &'static str, when: Condition) -> Self {
        Self {
            name,
            config_alias: None,
            source,
            on_premises_source: None,
            destination: source,
            when,
            default_on: true,
        }
    }

    fn off_by_default(mut self) -> Self {
        self.default_on = false;
        self
    }

    fn on_premises(mut self, source: &'static str) -> Self {
        self.on_premises_source = Some(source);
        self
    }

    fn deliver_as(mut self, destination: &'static str) -> Self {
        self.destination = destination;
        self
    }

    fn shares_config(mut self, alias: &'static str) -> Self {
        self.config_alias = Some(alias);
        self
    }

    fn alias_config<'s>(&self, spec: &'s ClusterSpec) -> Option<&'s AddonConfig> {
        self.config_alias.and_then(|alias| spec.addon(alias))
    }

    /// Enablement for a descriptor
    ///
    /// An explicit setting under the descriptor's own name wins. Otherwise
    /// the computed default applies, unless the shared alias switches the
    /// family off.
    pub fn is_enabled(&self, ctx: &EvalContext<'_>) -> bool {
        if let Some(enabled) = ctx.spec.addon(self.name).and_then(|config| config.enabled) {
            return enabled;
        }
        let alias_off = self
            .alias_config(ctx.spec)
            .and_then(|config| config.enabled)
            == Some(false);
        !alias_off && self.default_on && self.when.evaluate(ctx)
    }

    /// Caller-supplied inline payload, by own name first, then the alias
    pub fn inline_data<'s>(&self, spec: &'s ClusterSpec) -> Option<&'s str> {
        [spec.addon(self.name), self.alias_config(spec)]
            .into_iter()
            .flatten()
            .filter_map(|config| config.data.as_deref())
            .find(|data| !data.is_empty())
    }

    /// Template file to use in this environment
    pub fn source_for(&self, environment: CloudEnvironment) -> &'static str {
        match (environment, self.on_premises_source) {
            (CloudEnvironment::OnPremises, Some(source)) => source,
            _ => self.source,
        }
    }
}

/// Names of catalog entries
pub mod names {
    #![allow(missing_docs)]
    pub const CILIUM: &str = "cilium";
    pub const FLANNEL: &str = "flannel";
    pub const AAD_ADMIN_GROUP: &str = "aad-default-admin-group-rbac";
    pub const AZURE_CLOUD_PROVIDER: &str = "azure-cloud-provider";
    pub const AUDIT_POLICY: &str = "audit-policy";
    pub const POD_SECURITY_POLICY: &str = "pod-security-policy";
    pub const SCHEDULED_MAINTENANCE: &str = "scheduled-maintenance";
    pub const AZURE_CSI_STORAGE_CLASSES: &str = "azure-csi-storage-classes";
    pub const AZURE_STORAGE_CLASSES: &str = "azure-storage-classes";
    pub const UNMANAGED_STORAGE_CLASSES: &str = "unmanaged-azure-storage-classes";
    pub const MANAGED_STORAGE_CLASSES: &str = "managed-azure-storage-classes";
    pub const KUBE_PROXY: &str = "kube-proxy";
    pub const KUBE_DNS: &str = "kube-dns";
    pub const COREDNS: &str = "coredns";
    pub const DNS_AUTOSCALER: &str = "dns-autoscaler";
    pub const METRICS_SERVER: &str = "metrics-server";
    pub const HEAPSTER: &str = "heapster";
    pub const IP_MASQ_AGENT: &str = "ip-masq-agent";
    pub const CALICO: &str = "calico";
    pub const AZURE_NETWORK_POLICY: &str = "azure-network-policy";
    pub const AZURE_CNI_NETWORK_MONITOR: &str = "azure-cni-networkmonitor";
    pub const AZURE_DISK_CSI_DRIVER: &str = "azuredisk-csi-driver";
    pub const AZURE_FILE_CSI_DRIVER: &str = "azurefile-csi-driver";
    pub const CLOUD_NODE_MANAGER: &str = "cloud-node-manager";
    pub const BLOBFUSE_FLEXVOLUME: &str = "blobfuse-flexvolume";
    pub const SMB_FLEXVOLUME: &str = "smb-flexvolume";
    pub const KEYVAULT_FLEXVOLUME: &str = "keyvault-flexvolume";
    pub const AAD_POD_IDENTITY: &str = "aad-pod-identity";
    pub const ACI_CONNECTOR: &str = "aci-connector";
    pub const AZURE_POLICY: &str = "azure-policy";
    pub const CONTAINER_MONITORING: &str = "container-monitoring";
    pub const NODE_PROBLEM_DETECTOR: &str = "node-problem-detector";
    pub const NVIDIA_DEVICE_PLUGIN: &str = "nvidia-device-plugin";
    pub const RESCHEDULER: &str = "rescheduler";
    pub const TILLER: &str = "tiller";
    pub const CLUSTER_AUTOSCALER: &str = "cluster-autoscaler";
    pub const DASHBOARD: &str = "kubernetes-dashboard";
}

static DESCRIPTORS: LazyLock<Vec<AddonDescriptor>> = LazyLock::new(|| {
    use names::*;

    let external_cloud_provider = || {
        all([
            Condition::WorkerPools,
            Condition::Enabled(Feature::CloudControllerManager),
        ])
    };
    let in_tree_storage = |kind| {
        all([
            Condition::WorkerPools,
            Condition::Disabled(Feature::CloudControllerManager),
            Condition::PrimaryStorage(kind),
        ])
    };

    vec![
        AddonDescriptor::new(
            CILIUM,
            "cilium-daemonset.yaml",
            Condition::NetworkPolicy(NetworkPolicy::Cilium),
        ),
        AddonDescriptor::new(
            FLANNEL,
            "flannel-daemonset.yaml",
            Condition::NetworkPlugin(NetworkPlugin::Flannel),
        ),
        AddonDescriptor::new(
            AAD_ADMIN_GROUP,
            "aad-default-admin-group-rbac.yaml",
            Condition::AdminGroup,
        ),
        AddonDescriptor::new(
            AZURE_CLOUD_PROVIDER,
            "azure-cloud-provider-deployment.yaml",
            Condition::Always,
        ),
        AddonDescriptor::new(
            AUDIT_POLICY,
            "audit-policy.yaml",
            any([
                Condition::FlagSet(ComponentKind::ApiServer, "--audit-policy-file"),
                since(1, 8, 0),
            ]),
        ),
        AddonDescriptor::new(
            POD_SECURITY_POLICY,
            "pod-security-policy.yaml",
            Condition::Enabled(Feature::PodSecurityPolicy),
        ),
        AddonDescriptor::new(
            SCHEDULED_MAINTENANCE,
            "scheduled-maintenance-deployment.yaml",
            Condition::Always,
        )
        .off_by_default(),
        AddonDescriptor::new(
            AZURE_CSI_STORAGE_CLASSES,
            "azure-csi-storage-classes.yaml",
            all([
                Condition::WorkerPools,
                Condition::Enabled(Feature::CloudControllerManager),
            ]),
        ),
        AddonDescriptor::new(
            UNMANAGED_STORAGE_CLASSES,
            "unmanaged-azure-storage-classes.yaml",
            in_tree_storage(StorageKind::StorageAccount),
        )
        .on_premises("unmanaged-azure-storage-classes-custom.yaml")
        .deliver_as("azure-storage-classes.yaml")
        .shares_config(AZURE_STORAGE_CLASSES),
        AddonDescriptor::new(
            MANAGED_STORAGE_CLASSES,
            "managed-azure-storage-classes.yaml",
            in_tree_storage(StorageKind::ManagedDisks),
        )
        .on_premises("managed-azure-storage-classes-custom.yaml")
        .deliver_as("azure-storage-classes.yaml")
        .shares_config(AZURE_STORAGE_CLASSES),
        AddonDescriptor::new(KUBE_PROXY, "kube-proxy.yaml", Condition::Always),
        AddonDescriptor::new(KUBE_DNS, "kube-dns-deployment.yaml", until(1, 12, 0)),
        AddonDescriptor::new(COREDNS, "coredns.yaml", since(1, 12, 0)),
        AddonDescriptor::new(DNS_AUTOSCALER, "dns-autoscaler.yaml", Condition::Always)
            .off_by_default(),
        AddonDescriptor::new(METRICS_SERVER, "metrics-server.yaml", Condition::Always),
        AddonDescriptor::new(HEAPSTER, "kube-heapster-deployment.yaml", Condition::Always)
            .off_by_default(),
        AddonDescriptor::new(
            IP_MASQ_AGENT,
            "ip-masq-agent.yaml",
            not(Condition::IdentitySystem(IdentitySystem::Adfs)),
        ),
        AddonDescriptor::new(
            CALICO,
            "calico.yaml",
            Condition::NetworkPolicy(NetworkPolicy::Calico),
        ),
        AddonDescriptor::new(
            AZURE_NETWORK_POLICY,
            "azure-network-policy.yaml",
            Condition::NetworkPolicy(NetworkPolicy::Azure),
        ),
        AddonDescriptor::new(
            AZURE_CNI_NETWORK_MONITOR,
            "azure-cni-networkmonitor.yaml",
            Condition::NetworkPlugin(NetworkPlugin::Azure),
        )
        .off_by_default(),
        AddonDescriptor::new(
            AZURE_DISK_CSI_DRIVER,
            "azuredisk-csi-driver-deployment.yaml",
            external_cloud_provider(),
        ),
        AddonDescriptor::new(
            AZURE_FILE_CSI_DRIVER,
            "azurefile-csi-driver-deployment.yaml",
            external_cloud_provider(),
        ),
        AddonDescriptor::new(
            CLOUD_NODE_MANAGER,
            "cloud-node-manager.yaml",
            Condition::Enabled(Feature::CloudControllerManager),
        ),
        AddonDescriptor::new(
            BLOBFUSE_FLEXVOLUME,
            "blobfuse-flexvolume-installer.yaml",
            Condition::WorkerPools,
        )
        .off_by_default(),
        AddonDescriptor::new(SMB_FLEXVOLUME, "smb-flexvolume-installer.yaml", Condition::WorkerPools)
            .off_by_default(),
        AddonDescriptor::new(
            KEYVAULT_FLEXVOLUME,
            "keyvault-flexvolume-installer.yaml",
            Condition::WorkerPools,
        )
        .off_by_default(),
        AddonDescriptor::new(
            AAD_POD_IDENTITY,
            "aad-pod-identity-deployment.yaml",
            Condition::Always,
        )
        .off_by_default(),
        AddonDescriptor::new(ACI_CONNECTOR, "aci-connector-deployment.yaml", Condition::Always)
            .off_by_default(),
        AddonDescriptor::new(AZURE_POLICY, "azure-policy-deployment.yaml", Condition::Always)
            .off_by_default(),
        AddonDescriptor::new(CONTAINER_MONITORING, "omsagent-daemonset.yaml", Condition::Always)
            .off_by_default(),
        AddonDescriptor::new(
            NODE_PROBLEM_DETECTOR,
            "node-problem-detector.yaml",
            Condition::Always,
        )
        .off_by_default(),
        AddonDescriptor::new(
            NVIDIA_DEVICE_PLUGIN,
            "nvidia-device-plugin.yaml",
            Condition::WorkerPools,
        )
        .off_by_default(),
        AddonDescriptor::new(RESCHEDULER, "kube-rescheduler-deployment.yaml", Condition::Always)
            .off_by_default(),
        AddonDescriptor::new(TILLER, "kube-tiller-deployment.yaml", Condition::Always)
            .off_by_default(),
        AddonDescriptor::new(
            CLUSTER_AUTOSCALER,
            "cluster-autoscaler.yaml",
            Condition::WorkerPools,
        )
        .off_by_default(),
        AddonDescriptor::new(DASHBOARD, "kubernetes-dashboard.yaml", Condition::Always)
            .off_by_default(),
    ]
});

/// The addon descriptor table in delivery order
pub fn descriptors() -> &'static [AddonDescriptor] {
    &DESCRIPTORS
}

/// Build the addon catalog for a descriptor and its resolved component maps
///
/// Fails only when the target version cannot be parsed.
#[instrument(skip_all, fields(version = %spec.orchestrator_version))]
pub fn build_catalog(
    spec: &ClusterSpec,
    resolved: &BTreeMap<ComponentKind, ConfigMap>,
) -> Result<Vec<AddonSpec>> {
    let version = ClusterVersion::parse(&spec.orchestrator_version)?;
    let defaults = Defaults::global();
    let ctx = EvalContext::new(spec, &version, defaults).with_resolved(resolved);
    Ok(catalog_for(&ctx))
}

/// Build the addon catalog against an existing evaluation context
pub fn catalog_for(ctx: &EvalContext<'_>) -> Vec<AddonSpec> {
    descriptors()
        .iter()
        .enumerate()
        .map(|(order, descriptor)| {
            let enabled = descriptor.is_enabled(ctx);
            debug!(addon = descriptor.name, enabled, "catalog entry");
            AddonSpec {
                name: descriptor.name.to_string(),
                enabled,
                payload: payload_for(ctx, descriptor),
                destination: format!(
                    "{}/{}",
                    ctx.defaults.addon_destination_dir, descriptor.destination
                ),
                order,
            }
        })
        .collect()
}

fn payload_for(ctx: &EvalContext<'_>, descriptor: &AddonDescriptor) -> PayloadSource {
    match descriptor.inline_data(ctx.spec) {
        Some(data) => PayloadSource::Inline(data.to_string()),
        None => PayloadSource::Template {
            dir: ctx.defaults.addon_source_dir.clone(),
            file: descriptor.source_for(ctx.environment).to_string(),
            version: ctx.version.minor_key(),
        },
    }
}
