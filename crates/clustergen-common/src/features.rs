//! Tri-state feature flags
//!
//! Each flag is unset, explicitly off, or explicitly on. Unset is not the
//! same as off: it resolves to the default documented for the target
//! version, which for some features flips at a release boundary.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::version::{ClusterVersion, Release};

/// Aggregated API server proxy defaults on from this release
const AGGREGATED_APIS_DEFAULT_SINCE: Release = Release::new(1, 9, 0);

/// Pod security policy defaults on from this release (1.15.0-beta.1 and later)
const POD_SECURITY_POLICY_DEFAULT_SINCE: Release = Release::new(1, 15, 0);

/// A cluster feature that flag rules and addon predicates depend on
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Feature {
    /// Role-based access control
    Rbac,
    /// TLS client certs for apiserver → kubelet traffic
    SecureKubelet,
    /// Secret encryption at rest with a local key
    DataEncryptionAtRest,
    /// Secret encryption at rest with an external KMS
    EncryptionWithExternalKms,
    /// Aggregated API server proxy
    AggregatedApis,
    /// PodSecurityPolicy admission
    PodSecurityPolicy,
    /// Out-of-tree cloud controller manager instead of the in-tree provider
    CloudControllerManager,
    /// Hosted datastore instead of local etcd
    ManagedDatastore,
}

impl Feature {
    /// Every feature
    pub const ALL: [Feature; 8] = [
        Feature::Rbac,
        Feature::SecureKubelet,
        Feature::DataEncryptionAtRest,
        Feature::EncryptionWithExternalKms,
        Feature::AggregatedApis,
        Feature::PodSecurityPolicy,
        Feature::CloudControllerManager,
        Feature::ManagedDatastore,
    ];

    /// Descriptor field name
    pub fn name(self) -> &'static str {
        match self {
            Feature::Rbac => "enableRbac",
            Feature::SecureKubelet => "enableSecureKubelet",
            Feature::DataEncryptionAtRest => "enableDataEncryptionAtRest",
            Feature::EncryptionWithExternalKms => "enableEncryptionWithExternalKms",
            Feature::AggregatedApis => "enableAggregatedApis",
            Feature::PodSecurityPolicy => "enablePodSecurityPolicy",
            Feature::CloudControllerManager => "useCloudControllerManager",
            Feature::ManagedDatastore => "useManagedDatastore",
        }
    }

    /// Value an unset flag resolves to at the given release
    pub fn default_at(self, release: Release) -> bool {
        match self {
            Feature::Rbac | Feature::SecureKubelet => true,
            Feature::AggregatedApis => release >= AGGREGATED_APIS_DEFAULT_SINCE,
            Feature::PodSecurityPolicy => release >= POD_SECURITY_POLICY_DEFAULT_SINCE,
            Feature::DataEncryptionAtRest
            | Feature::EncryptionWithExternalKms
            | Feature::CloudControllerManager
            | Feature::ManagedDatastore => false,
        }
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Tri-state feature flags as supplied by the caller
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FeatureFlags {
    /// Role-based access control
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable_rbac: Option<bool>,

    /// Secure apiserver → kubelet communication
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable_secure_kubelet: Option<bool>,

    /// Encrypt secrets at rest with a local key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable_data_encryption_at_rest: Option<bool>,

    /// Encrypt secrets at rest with an external KMS
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable_encryption_with_external_kms: Option<bool>,

    /// Aggregated API server proxy
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable_aggregated_apis: Option<bool>,

    /// PodSecurityPolicy admission
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable_pod_security_policy: Option<bool>,

    /// Run the out-of-tree cloud controller manager
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub use_cloud_controller_manager: Option<bool>,

    /// Use a hosted datastore for the control plane
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub use_managed_datastore: Option<bool>,
}

impl FeatureFlags {
    /// The caller-supplied state of a feature (`None` when unset)
    pub fn get(&self, feature: Feature) -> Option<bool> {
        match feature {
            Feature::Rbac => self.enable_rbac,
            Feature::SecureKubelet => self.enable_secure_kubelet,
            Feature::DataEncryptionAtRest => self.enable_data_encryption_at_rest,
            Feature::EncryptionWithExternalKms => self.enable_encryption_with_external_kms,
            Feature::AggregatedApis => self.enable_aggregated_apis,
            Feature::PodSecurityPolicy => self.enable_pod_security_policy,
            Feature::CloudControllerManager => self.use_cloud_controller_manager,
            Feature::ManagedDatastore => self.use_managed_datastore,
        }
    }

    /// Set the state of a feature
    pub fn set(&mut self, feature: Feature, state: Option<bool>) {
        let slot = match feature {
            Feature::Rbac => &mut self.enable_rbac,
            Feature::SecureKubelet => &mut self.enable_secure_kubelet,
            Feature::DataEncryptionAtRest => &mut self.enable_data_encryption_at_rest,
            Feature::EncryptionWithExternalKms => &mut self.enable_encryption_with_external_kms,
            Feature::AggregatedApis => &mut self.enable_aggregated_apis,
            Feature::PodSecurityPolicy => &mut self.enable_pod_security_policy,
            Feature::CloudControllerManager => &mut self.use_cloud_controller_manager,
            Feature::ManagedDatastore => &mut self.use_managed_datastore,
        };
        *slot = state;
    }

    /// Builder-style [`FeatureFlags::set`] with an explicit value
    pub fn with(mut self, feature: Feature, enabled: bool) -> Self {
        self.set(feature, Some(enabled));
        self
    }

    /// Effective state of a feature for the target version
    pub fn resolve(&self, feature: Feature, version: &ClusterVersion) -> bool {
        self.get(feature)
            .unwrap_or_else(|| feature.default_at(version.release()))
    }
}
