//! Process-wide constant registry
//!
//! Ports, cipher suites, endpoint domains and asset locations that rule
//! tables and the assembler read instead of scattering literals. The
//! built-in registry is created once and never mutated; deployments that
//! need different values load their own copy from YAML and inject it.

use std::sync::LazyLock;

use serde::{Deserialize, Serialize};

use crate::Result;

/// Strong TLS cipher suites offered by the API server
pub const TLS_STRONG_CIPHER_SUITES: &str = "TLS_ECDHE_ECDSA_WITH_AES_128_GCM_SHA256,TLS_ECDHE_RSA_WITH_AES_128_GCM_SHA256,TLS_ECDHE_ECDSA_WITH_CHACHA20_POLY1305,TLS_ECDHE_RSA_WITH_AES_256_GCM_SHA384,TLS_ECDHE_RSA_WITH_CHACHA20_POLY1305,TLS_ECDHE_ECDSA_WITH_AES_256_GCM_SHA384,TLS_RSA_WITH_AES_256_GCM_SHA384,TLS_RSA_WITH_AES_128_GCM_SHA256";

/// Default etcd client port
pub const DEFAULT_ETCD_CLIENT_PORT: u16 = 2379;

/// Upper bound on the decompressed size of an inline payload (16 MiB)
pub const DEFAULT_MAX_INLINE_PAYLOAD_BYTES: usize = 16 * 1024 * 1024;

static BUILT_IN: LazyLock<Defaults> = LazyLock::new(Defaults::default);

/// Constant registry injected into the resolver and assembler
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct Defaults {
    /// Port the API server uses to reach etcd
    pub etcd_client_port: u16,

    /// Default `--profiling` for the API server
    pub api_server_profiling: String,

    /// Default `--profiling` for the controller manager
    pub controller_manager_profiling: String,

    /// Default `--profiling` for the scheduler
    pub scheduler_profiling: String,

    /// Default `--tls-cipher-suites`
    pub tls_cipher_suites: String,

    /// Admission plugins enabled by default, in order
    pub admission_plugins: Vec<String>,

    /// Token issuer host in the public cloud
    pub public_sts_host: String,

    /// Token issuer host in the sovereign cloud
    pub sovereign_sts_host: String,

    /// Regions served by the sovereign cloud
    pub sovereign_regions: Vec<String>,

    /// Domain appended to the DNS prefix for a hosted datastore endpoint
    pub managed_datastore_domain: String,

    /// Where addon templates live in the asset store
    pub addon_source_dir: String,

    /// Where addon files land on control-plane nodes
    pub addon_destination_dir: String,

    /// Where static pod manifest templates live in the asset store
    pub manifest_source_dir: String,

    /// Where static pod manifests land on control-plane nodes
    pub manifest_destination_dir: String,

    /// Upper bound on a decompressed inline payload
    pub max_inline_payload_bytes: usize,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            etcd_client_port: DEFAULT_ETCD_CLIENT_PORT,
            api_server_profiling: "false".to_string(),
            controller_manager_profiling: "false".to_string(),
            scheduler_profiling: "false".to_string(),
            tls_cipher_suites: TLS_STRONG_CIPHER_SUITES.to_string(),
            admission_plugins: [
                "NamespaceLifecycle",
                "LimitRanger",
                "ServiceAccount",
                "DefaultStorageClass",
                "DefaultTolerationSeconds",
                "MutatingAdmissionWebhook",
                "ValidatingAdmissionWebhook",
                "ResourceQuota",
                "ExtendedResourceToleration",
            ]
            .map(String::from)
            .to_vec(),
            public_sts_host: "sts.windows.net".to_string(),
            sovereign_sts_host: "sts.chinacloudapi.cn".to_string(),
            sovereign_regions: ["chinaeast", "chinaeast2", "chinanorth", "chinanorth2"]
                .map(String::from)
                .to_vec(),
            managed_datastore_domain: "k8s.etcd.cosmosdb.azure.com".to_string(),
            addon_source_dir: "k8s/addons".to_string(),
            addon_destination_dir: "/etc/kubernetes/addons".to_string(),
            manifest_source_dir: "k8s/manifests".to_string(),
            manifest_destination_dir: "/etc/kubernetes/manifests".to_string(),
            max_inline_payload_bytes: DEFAULT_MAX_INLINE_PAYLOAD_BYTES,
        }
    }
}

impl Defaults {
    /// The built-in registry shared by every run in this process
    pub fn global() -> &'static Defaults {
        &BUILT_IN
    }

    /// Load a registry from YAML; omitted fields keep their built-in values
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Whether a region is served by the sovereign cloud
    pub fn is_sovereign_region(&self, location: &str) -> bool {
        let location = location.trim();
        self.sovereign_regions
            .iter()
            .any(|region| region.eq_ignore_ascii_case(location))
    }

    /// Comma-joined default admission plugin list
    pub fn admission_plugin_list(&self) -> String {
        self.admission_plugins.join(",")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn global_registry_is_built_in() {
        let defaults = Defaults::global();
        assert_eq!(defaults.etcd_client_port, 2379);
        assert_eq!(defaults.tls_cipher_suites, TLS_STRONG_CIPHER_SUITES);
        assert!(std::ptr::eq(defaults, Defaults::global()));
    }

    #[test]
    fn sovereign_regions_match_case_insensitively() {
        let defaults = Defaults::default();
        for region in ["chinaeast", "chinaeast2", "ChinaNorth", "chinanorth2"] {
            assert!(defaults.is_sovereign_region(region), "{region}");
        }
        assert!(!defaults.is_sovereign_region("westus2"));
        assert!(!defaults.is_sovereign_region("china"));
    }

    #[test]
    fn yaml_overrides_keep_unspecified_fields() {
        let defaults = Defaults::from_yaml(
            "etcdClientPort: 12379\nsovereignRegions: [usgovvirginia]\n",
        )
        .expect("valid registry");
        assert_eq!(defaults.etcd_client_port, 12379);
        assert!(defaults.is_sovereign_region("usgovvirginia"));
        assert!(!defaults.is_sovereign_region("chinaeast"));
        assert_eq!(defaults.public_sts_host, "sts.windows.net");
    }

    #[test]
    fn yaml_type_errors_are_serialization_errors() {
        let err = Defaults::from_yaml("etcdClientPort: not-a-port").expect_err("bad port");
        assert!(matches!(err, crate::Error::Serialization { .. }));
    }

    #[test]
    fn admission_plugins_join_in_order() {
        let list = Defaults::default().admission_plugin_list();
        assert!(list.starts_with("NamespaceLifecycle,LimitRanger,"));
        assert!(list.ends_with(",ExtendedResourceToleration"));
    }
}
