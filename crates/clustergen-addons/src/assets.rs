//! Template asset stores
//!
//! The assembler looks templates up by slash-separated path relative to the
//! asset root (`k8s/addons/1.16/kube-proxy.yaml`). [`EmbeddedAssets`] serves
//! the templates compiled into this crate; [`DirectoryAssets`] serves a tree
//! on disk so deployments can ship their own.

use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

#[cfg(test)]
use mockall::automock;
use tracing::{debug, warn};

use clustergen_common::{Error, Result};

/// Read-only lookup of template assets by path
#[cfg_attr(test, automock)]
pub trait AssetLoader: Send + Sync {
    /// Bytes of the asset at `path`, or `None` when it does not exist
    ///
    /// An asset that exists but cannot be read is an error, never `None`.
    fn load(&self, path: &str) -> Result<Option<Vec<u8>>>;
}

macro_rules! embedded {
    ($($path:literal),* $(,)?) => {
        &[$(($path, include_str!(concat!("../templates/", $path)))),*]
    };
}

const EMBEDDED: &[(&str, &str)] = embedded![
    "k8s/addons/aad-default-admin-group-rbac.yaml",
    "k8s/addons/aad-pod-identity-deployment.yaml",
    "k8s/addons/aci-connector-deployment.yaml",
    "k8s/addons/audit-policy.yaml",
    "k8s/addons/azure-cloud-provider-deployment.yaml",
    "k8s/addons/azure-cni-networkmonitor.yaml",
    "k8s/addons/azure-csi-storage-classes.yaml",
    "k8s/addons/azure-network-policy.yaml",
    "k8s/addons/azure-policy-deployment.yaml",
    "k8s/addons/azuredisk-csi-driver-deployment.yaml",
    "k8s/addons/azurefile-csi-driver-deployment.yaml",
    "k8s/addons/blobfuse-flexvolume-installer.yaml",
    "k8s/addons/calico.yaml",
    "k8s/addons/cilium-daemonset.yaml",
    "k8s/addons/cloud-node-manager.yaml",
    "k8s/addons/cluster-autoscaler.yaml",
    "k8s/addons/coredns.yaml",
    "k8s/addons/dns-autoscaler.yaml",
    "k8s/addons/flannel-daemonset.yaml",
    "k8s/addons/ip-masq-agent.yaml",
    "k8s/addons/keyvault-flexvolume-installer.yaml",
    "k8s/addons/kube-dns-deployment.yaml",
    "k8s/addons/kube-heapster-deployment.yaml",
    "k8s/addons/kube-proxy.yaml",
    "k8s/addons/1.16/kube-proxy.yaml",
    "k8s/addons/kube-rescheduler-deployment.yaml",
    "k8s/addons/kube-tiller-deployment.yaml",
    "k8s/addons/kubernetes-dashboard.yaml",
    "k8s/addons/managed-azure-storage-classes-custom.yaml",
    "k8s/addons/managed-azure-storage-classes.yaml",
    "k8s/addons/metrics-server.yaml",
    "k8s/addons/node-problem-detector.yaml",
    "k8s/addons/nvidia-device-plugin.yaml",
    "k8s/addons/omsagent-daemonset.yaml",
    "k8s/addons/pod-security-policy.yaml",
    "k8s/addons/1.16/pod-security-policy.yaml",
    "k8s/addons/scheduled-maintenance-deployment.yaml",
    "k8s/addons/smb-flexvolume-installer.yaml",
    "k8s/addons/unmanaged-azure-storage-classes-custom.yaml",
    "k8s/addons/unmanaged-azure-storage-classes.yaml",
    "k8s/manifests/cloud-controller-manager.yaml",
    "k8s/manifests/kube-addon-manager.yaml",
    "k8s/manifests/1.16/kube-addon-manager.yaml",
    "k8s/manifests/kube-apiserver.yaml",
    "k8s/manifests/kube-controller-manager.yaml",
    "k8s/manifests/kube-controller-manager-custom.yaml",
    "k8s/manifests/kube-scheduler.yaml",
];

/// Templates compiled into the binary
#[derive(Clone, Copy, Debug, Default)]
pub struct EmbeddedAssets;

impl EmbeddedAssets {
    /// Paths of every embedded asset
    pub fn paths() -> impl Iterator<Item = &'static str> {
        EMBEDDED.iter().map(|(path, _)| *path)
    }
}

impl AssetLoader for EmbeddedAssets {
    fn load(&self, path: &str) -> Result<Option<Vec<u8>>> {
        Ok(EMBEDDED
            .iter()
            .find(|(candidate, _)| *candidate == path)
            .map(|(_, content)| content.as_bytes().to_vec()))
    }
}

/// Templates read from a directory tree
#[derive(Clone, Debug)]
pub struct DirectoryAssets {
    root: PathBuf,
}

impl DirectoryAssets {
    /// Serve assets below `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Asset root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    // Only plain relative segments; `..`, roots and prefixes never resolve.
    fn resolve(&self, path: &str) -> Option<PathBuf> {
        let relative = Path::new(path);
        if relative
            .components()
            .any(|component| !matches!(component, Component::Normal(_)))
        {
            return None;
        }
        Some(self.root.join(relative))
    }
}

impl AssetLoader for DirectoryAssets {
    fn load(&self, path: &str) -> Result<Option<Vec<u8>>> {
        let Some(full) = self.resolve(path) else {
            return Ok(None);
        };
        match std::fs::read(&full) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %full.display(), "asset not present");
                Ok(None)
            }
            Err(e) => {
                warn!(path = %full.display(), error = %e, "asset not readable");
                Err(Error::asset_unreadable(path, e.to_string()))
            }
        }
    }
}
