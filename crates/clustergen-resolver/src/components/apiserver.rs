//! kube-apiserver rule table

use clustergen_common::condition::{all, any, since, until};
use clustergen_common::spec::IdentitySystem;
use clustergen_common::{CloudEnvironment, Condition, EvalContext, Feature};

use super::CLOUD_CONFIG;
use crate::rule::{set_default, set_default_with, set_with, static_defaults, Effect, Rule};

const ADMISSION_CONTROL: &str = "--admission-control";
const ENABLE_ADMISSION_PLUGINS: &str = "--enable-admission-plugins";
const EXPERIMENTAL_ENCRYPTION_CONFIG: &str = "--experimental-encryption-provider-config";
const ENCRYPTION_CONFIG: &str = "--encryption-provider-config";
const AUDIT_POLICY_FILE: &str = "--audit-policy-file";
const AUTHORIZATION_MODE: &str = "--authorization-mode";
const OIDC_ISSUER_URL: &str = "--oidc-issuer-url";

const ENCRYPTION_CONFIG_PATH: &str = "/etc/kubernetes/encryption-config.yaml";
const AUDIT_POLICY_PATH: &str = "/etc/kubernetes/addons/audit-policy.yaml";
const LEGACY_AUDIT_POLICY_PATH: &str = "/etc/kubernetes/manifests/audit-policy.yaml";

const STATIC: &[(&str, &str)] = &[
    ("--bind-address", "0.0.0.0"),
    ("--advertise-address", "<advertiseAddr>"),
    ("--allow-privileged", "true"),
    ("--anonymous-auth", "false"),
    ("--audit-log-path", "/var/log/kubeaudit/audit.log"),
    ("--audit-log-maxage", "30"),
    ("--audit-log-maxbackup", "10"),
    ("--audit-log-maxsize", "100"),
    ("--insecure-port", "8080"),
    ("--secure-port", "443"),
    ("--service-account-lookup", "true"),
    ("--etcd-certfile", "/etc/kubernetes/certs/etcdclient.crt"),
    ("--etcd-keyfile", "/etc/kubernetes/certs/etcdclient.key"),
    ("--tls-cert-file", "/etc/kubernetes/certs/apiserver.crt"),
    ("--tls-private-key-file", "/etc/kubernetes/certs/apiserver.key"),
    ("--client-ca-file", "/etc/kubernetes/certs/ca.crt"),
    ("--service-account-key-file", "/etc/kubernetes/certs/apiserver.key"),
    ("--kubelet-client-certificate", "/etc/kubernetes/certs/client.crt"),
    ("--kubelet-client-key", "/etc/kubernetes/certs/client.key"),
    ("--storage-backend", "etcd3"),
    ("--v", "4"),
];

const AGGREGATED_APIS: &[(&str, &str)] = &[
    ("--requestheader-client-ca-file", "/etc/kubernetes/certs/proxy-ca.crt"),
    ("--proxy-client-cert-file", "/etc/kubernetes/certs/proxy.crt"),
    ("--proxy-client-key-file", "/etc/kubernetes/certs/proxy.key"),
    ("--requestheader-allowed-names", ""),
    ("--requestheader-extra-headers-prefix", "X-Remote-Extra-"),
    ("--requestheader-group-headers", "X-Remote-Group"),
    ("--requestheader-username-headers", "X-Remote-User"),
];

const IN_TREE_CLOUD_PROVIDER: &[(&str, &str)] =
    &[("--cloud-provider", "azure"), ("--cloud-config", CLOUD_CONFIG)];

const OIDC_CLAIMS: &[(&str, &str)] = &[
    ("--oidc-username-claim", "oid"),
    ("--oidc-groups-claim", "groups"),
];

const SECURE_KUBELET_KEYS: &[&str] = &["--kubelet-client-certificate", "--kubelet-client-key"];
const AGGREGATED_API_KEYS: &[&str] = &[
    "--requestheader-client-ca-file",
    "--proxy-client-cert-file",
    "--proxy-client-key-file",
    "--requestheader-allowed-names",
    "--requestheader-extra-headers-prefix",
    "--requestheader-group-headers",
    "--requestheader-username-headers",
];
const ENCRYPTION_KEYS: &[&str] = &[EXPERIMENTAL_ENCRYPTION_CONFIG, ENCRYPTION_CONFIG];

fn encryption_enabled() -> Condition {
    any([
        Condition::Enabled(Feature::DataEncryptionAtRest),
        Condition::Enabled(Feature::EncryptionWithExternalKms),
    ])
}

fn profiling(ctx: &EvalContext<'_>) -> String {
    ctx.defaults.api_server_profiling.clone()
}

fn cipher_suites(ctx: &EvalContext<'_>) -> String {
    ctx.defaults.tls_cipher_suites.clone()
}

fn service_cidr(ctx: &EvalContext<'_>) -> String {
    ctx.spec.network.service_cidr.clone()
}

fn local_etcd_servers(ctx: &EvalContext<'_>) -> String {
    format!("https://127.0.0.1:{}", ctx.defaults.etcd_client_port)
}

fn managed_etcd_servers(ctx: &EvalContext<'_>) -> String {
    format!(
        "https://{}{}:{}",
        ctx.spec.control_plane.dns_prefix,
        ctx.defaults.managed_datastore_domain,
        ctx.defaults.etcd_client_port
    )
}

fn admission_plugins(ctx: &EvalContext<'_>) -> String {
    ctx.defaults.admission_plugin_list()
}

fn tenant<'a>(ctx: &EvalContext<'a>) -> &'a str {
    ctx.spec
        .identity
        .as_ref()
        .map(|identity| identity.tenant_id.as_str())
        .unwrap_or_default()
}

fn oidc_client_id(ctx: &EvalContext<'_>) -> String {
    let server_app = ctx
        .spec
        .identity
        .as_ref()
        .map(|identity| identity.server_app_id.as_str())
        .unwrap_or_default();
    format!("spn:{server_app}")
}

fn public_issuer(ctx: &EvalContext<'_>) -> String {
    format!("https://{}/{}/", ctx.defaults.public_sts_host, tenant(ctx))
}

fn sovereign_issuer(ctx: &EvalContext<'_>) -> String {
    format!("https://{}/{}/", ctx.defaults.sovereign_sts_host, tenant(ctx))
}

fn adfs_issuer(ctx: &EvalContext<'_>) -> String {
    let endpoint = ctx
        .spec
        .custom_cloud
        .as_ref()
        .map(|cloud| cloud.identity_endpoint.as_str())
        .unwrap_or_default();
    format!("{endpoint}adfs")
}

pub(super) fn rules() -> Vec<Rule> {
    let mut rules = vec![
        Rule::removal(
            "admission-control-renamed",
            since(1, 10, 0),
            Effect::Migrate {
                from: ADMISSION_CONTROL,
                to: ENABLE_ADMISSION_PLUGINS,
            },
        ),
        Rule::removal(
            "encryption-config-graduated",
            since(1, 13, 0),
            Effect::Migrate {
                from: EXPERIMENTAL_ENCRYPTION_CONFIG,
                to: ENCRYPTION_CONFIG,
            },
        ),
        Rule::removal(
            "repair-malformed-updates-removed",
            since(1, 14, 0),
            Effect::Remove(&["--repair-malformed-updates"]),
        ),
        Rule::removal(
            "insecure-port-removed",
            since(1, 24, 0),
            Effect::Remove(&["--insecure-port"]),
        ),
    ];

    rules.extend(static_defaults("static", Condition::Always, STATIC));
    rules.extend([
        Rule::feature_default("profiling", Condition::Always, set_default_with("--profiling", profiling)),
        Rule::feature_default(
            "cipher-suites",
            Condition::Always,
            set_default_with("--tls-cipher-suites", cipher_suites),
        ),
        Rule::feature_default(
            "service-cidr",
            Condition::Always,
            set_default_with("--service-cluster-ip-range", service_cidr),
        ),
        Rule::feature_default(
            "local-etcd-ca",
            Condition::Disabled(Feature::ManagedDatastore),
            set_default("--etcd-cafile", "/etc/kubernetes/certs/ca.crt"),
        ),
        Rule::feature_default(
            "local-etcd",
            Condition::Disabled(Feature::ManagedDatastore),
            set_default_with("--etcd-servers", local_etcd_servers),
        ),
        Rule::feature_default(
            "managed-etcd",
            Condition::Enabled(Feature::ManagedDatastore),
            set_default_with("--etcd-servers", managed_etcd_servers),
        ),
        Rule::feature_default(
            "experimental-encryption",
            all([encryption_enabled(), until(1, 13, 0)]),
            set_default(EXPERIMENTAL_ENCRYPTION_CONFIG, ENCRYPTION_CONFIG_PATH),
        ),
        Rule::feature_default(
            "encryption",
            all([encryption_enabled(), since(1, 13, 0)]),
            set_default(ENCRYPTION_CONFIG, ENCRYPTION_CONFIG_PATH),
        ),
    ]);
    rules.extend(static_defaults(
        "aggregated-apis",
        Condition::Enabled(Feature::AggregatedApis),
        AGGREGATED_APIS,
    ));
    rules.extend(static_defaults(
        "in-tree-cloud-provider",
        Condition::Disabled(Feature::CloudControllerManager),
        IN_TREE_CLOUD_PROVIDER,
    ));
    rules.extend(static_defaults("oidc", Condition::Identity, OIDC_CLAIMS));
    rules.extend([
        Rule::feature_default(
            "oidc-client",
            Condition::Identity,
            set_default_with("--oidc-client-id", oidc_client_id),
        ),
        Rule::feature_default(
            "oidc-issuer",
            Condition::Identity,
            set_default_with(OIDC_ISSUER_URL, public_issuer),
        ),
        Rule::feature_default(
            "audit-policy",
            since(1, 8, 0),
            set_default(AUDIT_POLICY_FILE, AUDIT_POLICY_PATH),
        ),
        Rule::feature_default(
            "node-authorizer",
            all([Condition::Enabled(Feature::Rbac), since(1, 7, 0)]),
            set_default(AUTHORIZATION_MODE, "Node,RBAC"),
        ),
        Rule::feature_default(
            "rbac",
            all([Condition::Enabled(Feature::Rbac), until(1, 7, 0)]),
            set_default(AUTHORIZATION_MODE, "RBAC"),
        ),
        Rule::feature_default(
            "admission-plugins",
            since(1, 10, 0),
            set_default_with(ENABLE_ADMISSION_PLUGINS, admission_plugins),
        ),
        Rule::feature_default(
            "admission-control",
            until(1, 10, 0),
            set_default_with(ADMISSION_CONTROL, admission_plugins),
        ),
        Rule::feature_default(
            "pod-security-policy",
            Condition::Enabled(Feature::PodSecurityPolicy),
            Effect::AppendItem {
                key: ENABLE_ADMISSION_PLUGINS,
                item: "PodSecurityPolicy",
            },
        ),
        Rule::feature_default(
            "pod-security-policy-legacy",
            Condition::Enabled(Feature::PodSecurityPolicy),
            Effect::AppendItem {
                key: ADMISSION_CONTROL,
                item: "PodSecurityPolicy",
            },
        ),
        Rule::feature_default(
            "repair-malformed-updates",
            until(1, 14, 0),
            set_default("--repair-malformed-updates", "false"),
        ),
        Rule::feature_default(
            "secure-kubelet-off",
            Condition::Disabled(Feature::SecureKubelet),
            Effect::Withhold(SECURE_KUBELET_KEYS),
        ),
        Rule::feature_default(
            "rbac-off",
            Condition::Disabled(Feature::Rbac),
            Effect::Withhold(&[AUTHORIZATION_MODE]),
        ),
        Rule::feature_default(
            "aggregated-apis-off",
            Condition::Disabled(Feature::AggregatedApis),
            Effect::Withhold(AGGREGATED_API_KEYS),
        ),
        Rule::feature_default(
            "encryption-off",
            all([
                Condition::Disabled(Feature::DataEncryptionAtRest),
                Condition::Disabled(Feature::EncryptionWithExternalKms),
            ]),
            Effect::Withhold(ENCRYPTION_KEYS),
        ),
        Rule::environment(
            "sovereign-issuer",
            all([
                Condition::Environment(CloudEnvironment::Sovereign),
                Condition::Identity,
            ]),
            set_with(OIDC_ISSUER_URL, sovereign_issuer),
        ),
        Rule::environment(
            "adfs-issuer",
            all([
                Condition::Environment(CloudEnvironment::OnPremises),
                Condition::IdentitySystem(IdentitySystem::Adfs),
                Condition::Identity,
            ]),
            set_with(OIDC_ISSUER_URL, adfs_issuer),
        ),
        Rule::compatibility(
            "audit-policy-location",
            Condition::Always,
            Effect::Rewrite {
                key: AUDIT_POLICY_FILE,
                from: LEGACY_AUDIT_POLICY_PATH,
                to: AUDIT_POLICY_PATH,
            },
        ),
    ]);
    rules
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::test_support::{resolve, resolve_with};
    use clustergen_common::defaults::TLS_STRONG_CIPHER_SUITES;
    use clustergen_common::spec::{CustomCloudProfile, IdentityProfile};
    use clustergen_common::{ClusterSpec, ComponentKind, ConfigMap, FeatureFlags};
    use proptest::prelude::*;

    const DEFAULT_TEST_VERSION: &str = "1.7.12";

    fn cluster(version: &str) -> ClusterSpec {
        let mut spec = ClusterSpec::new(version, "westus2");
        spec.control_plane.dns_prefix = "testcluster".to_string();
        spec.control_plane.count = 3;
        spec
    }

    fn with_feature(version: &str, feature: Feature, enabled: bool) -> ClusterSpec {
        let mut spec = cluster(version);
        spec.features = FeatureFlags::default().with(feature, enabled);
        spec
    }

    fn apiserver(spec: &ClusterSpec) -> ConfigMap {
        resolve(spec, ComponentKind::ApiServer)
    }

    fn with_identity(version: &str, location: &str) -> ClusterSpec {
        let mut spec = cluster(version);
        spec.location = location.to_string();
        spec.identity = Some(IdentityProfile::new("test-tenant", "test-id"));
        spec
    }

    // ==========================================================================
    // Story Tests: Encryption
    // ==========================================================================

    /// Story: encryption at rest points the API server at the provider config
    #[test]
    fn story_encryption_at_rest() {
        for feature in [Feature::DataEncryptionAtRest, Feature::EncryptionWithExternalKms] {
            let a = apiserver(&with_feature(DEFAULT_TEST_VERSION, feature, true));
            assert_eq!(a.get(EXPERIMENTAL_ENCRYPTION_CONFIG), Some(ENCRYPTION_CONFIG_PATH));
            assert!(!a.contains_key(ENCRYPTION_CONFIG));

            let a = apiserver(&with_feature(DEFAULT_TEST_VERSION, feature, false));
            assert!(!a.contains_key(EXPERIMENTAL_ENCRYPTION_CONFIG), "{feature}");
        }
    }

    /// Story: from 1.13 the graduated key carries the provider config
    #[test]
    fn story_encryption_key_graduates() {
        let spec = with_feature("1.13.0", Feature::DataEncryptionAtRest, true);
        let a = apiserver(&spec);
        assert_eq!(a.get(ENCRYPTION_CONFIG), Some(ENCRYPTION_CONFIG_PATH));
        assert!(!a.contains_key(EXPERIMENTAL_ENCRYPTION_CONFIG));

        let a = resolve_with(
            &spec,
            ComponentKind::ApiServer,
            &[(EXPERIMENTAL_ENCRYPTION_CONFIG, "/custom/encryption.yaml")],
        );
        assert_eq!(a.get(ENCRYPTION_CONFIG), Some("/custom/encryption.yaml"));
        assert!(!a.contains_key(EXPERIMENTAL_ENCRYPTION_CONFIG));
    }

    // ==========================================================================
    // Story Tests: Features
    // ==========================================================================

    #[test]
    fn test_aggregated_apis() {
        let a = apiserver(&with_feature(DEFAULT_TEST_VERSION, Feature::AggregatedApis, true));
        for (key, value) in AGGREGATED_APIS {
            assert_eq!(a.get(key), Some(*value), "{key}");
        }

        let a = apiserver(&with_feature(DEFAULT_TEST_VERSION, Feature::AggregatedApis, false));
        for key in AGGREGATED_API_KEYS {
            assert!(!a.contains_key(key), "{key}");
        }

        // Unset follows the version default
        assert!(!apiserver(&cluster("1.8.15")).contains_key("--proxy-client-cert-file"));
        assert!(apiserver(&cluster("1.9.0")).contains_key("--proxy-client-cert-file"));
    }

    #[test]
    fn test_cloud_controller_manager() {
        let a = apiserver(&with_feature(DEFAULT_TEST_VERSION, Feature::CloudControllerManager, true));
        assert!(!a.contains_key("--cloud-provider"));
        assert!(!a.contains_key("--cloud-config"));

        let a = apiserver(&with_feature(DEFAULT_TEST_VERSION, Feature::CloudControllerManager, false));
        assert_eq!(a.get("--cloud-provider"), Some("azure"));
        assert_eq!(a.get("--cloud-config"), Some("/etc/kubernetes/azure.json"));
    }

    #[test]
    fn test_secure_kubelet() {
        let a = apiserver(&with_feature(DEFAULT_TEST_VERSION, Feature::SecureKubelet, true));
        assert_eq!(a.get("--kubelet-client-certificate"), Some("/etc/kubernetes/certs/client.crt"));
        assert_eq!(a.get("--kubelet-client-key"), Some("/etc/kubernetes/certs/client.key"));

        let a = apiserver(&with_feature(DEFAULT_TEST_VERSION, Feature::SecureKubelet, false));
        for key in SECURE_KUBELET_KEYS {
            assert!(!a.contains_key(key), "{key}");
        }
    }

    /// Story: authorization mode depends on RBAC and the node authorizer's release
    #[test]
    fn story_rbac_authorization_mode() {
        let a = apiserver(&with_feature(DEFAULT_TEST_VERSION, Feature::Rbac, true));
        assert_eq!(a.get(AUTHORIZATION_MODE), Some("Node,RBAC"));

        let a = apiserver(&with_feature("1.6.11", Feature::Rbac, true));
        assert_eq!(a.get(AUTHORIZATION_MODE), Some("RBAC"));

        for version in [DEFAULT_TEST_VERSION, "1.6.11"] {
            let a = apiserver(&with_feature(version, Feature::Rbac, false));
            assert!(!a.contains_key(AUTHORIZATION_MODE), "{version}");
        }
    }

    // ==========================================================================
    // Story Tests: Identity
    // ==========================================================================

    /// Story: an identity profile turns on OIDC against the public issuer
    #[test]
    fn story_identity_profile_configures_oidc() {
        let a = apiserver(&with_identity(DEFAULT_TEST_VERSION, "westus2"));
        assert_eq!(a.get("--oidc-username-claim"), Some("oid"));
        assert_eq!(a.get("--oidc-groups-claim"), Some("groups"));
        assert_eq!(a.get("--oidc-client-id"), Some("spn:test-id"));
        assert_eq!(a.get(OIDC_ISSUER_URL), Some("https://sts.windows.net/test-tenant/"));

        let a = apiserver(&cluster(DEFAULT_TEST_VERSION));
        for key in ["--oidc-username-claim", "--oidc-groups-claim", "--oidc-client-id", OIDC_ISSUER_URL] {
            assert!(!a.contains_key(key), "{key}");
        }
    }

    /// Story: sovereign regions use their own token issuer
    #[test]
    fn story_sovereign_issuer() {
        for region in ["chinaeast", "chinaeast2", "chinanorth", "chinanorth2"] {
            let a = apiserver(&with_identity(DEFAULT_TEST_VERSION, region));
            assert_eq!(
                a.get(OIDC_ISSUER_URL),
                Some("https://sts.chinacloudapi.cn/test-tenant/"),
                "{region}"
            );
        }
    }

    /// Story: caller OIDC values win everywhere, sovereign regions included
    #[test]
    fn story_oidc_overrides_win() {
        let overrides = [
            ("--oidc-username-claim", "custom-username-claim"),
            ("--oidc-groups-claim", "custom-groups-claim"),
            ("--oidc-client-id", "custom-client-id"),
            (OIDC_ISSUER_URL, "custom-issuer-url"),
        ];
        for region in ["westus2", "chinaeast"] {
            let spec = with_identity(DEFAULT_TEST_VERSION, region);
            let a = resolve_with(&spec, ComponentKind::ApiServer, &overrides);
            for (key, value) in overrides {
                assert_eq!(a.get(key), Some(value), "{region}: {key}");
            }
        }
    }

    /// Story: on-premises stamps with federation services issue their own tokens
    #[test]
    fn story_adfs_issuer() {
        let mut spec = with_identity("1.15.4", "local");
        spec.custom_cloud = Some(CustomCloudProfile {
            name: "stamp".to_string(),
            identity_system: IdentitySystem::Adfs,
            identity_endpoint: "https://adfs.local.azurestack.external/".to_string(),
        });
        let a = apiserver(&spec);
        assert_eq!(a.get(OIDC_ISSUER_URL), Some("https://adfs.local.azurestack.external/adfs"));

        if let Some(cloud) = spec.custom_cloud.as_mut() {
            cloud.identity_system = IdentitySystem::AzureAd;
        }
        let a = apiserver(&spec);
        assert_eq!(a.get(OIDC_ISSUER_URL), Some("https://sts.windows.net/test-tenant/"));
    }

    // ==========================================================================
    // Story Tests: Admission
    // ==========================================================================

    /// Story: a caller's singular admission list moves to the plural key and gains PSP
    #[test]
    fn story_admission_control_migrates() {
        let mut spec = cluster("1.15.4");
        spec.features = FeatureFlags::default().with(Feature::PodSecurityPolicy, true);
        let supplied = "NamespaceLifecycle,LimitRanger,ServiceAccount,DefaultStorageClass,DefaultTolerationSeconds,MutatingAdmissionWebhook,ValidatingAdmissionWebhook,ResourceQuota,AlwaysPullImages,ExtendedResourceToleration";
        let a = resolve_with(&spec, ComponentKind::ApiServer, &[(ADMISSION_CONTROL, supplied)]);

        assert!(!a.contains_key(ADMISSION_CONTROL));
        let plugins = a.get(ENABLE_ADMISSION_PLUGINS).expect("plural key is set");
        assert!(plugins.starts_with(supplied));
        assert!(plugins.contains(",PodSecurityPolicy"));
    }

    #[test]
    fn test_admission_defaults_by_version() {
        let a = apiserver(&cluster("1.9.11"));
        assert!(a.get(ADMISSION_CONTROL).is_some_and(|v| v.starts_with("NamespaceLifecycle")));
        assert!(!a.contains_key(ENABLE_ADMISSION_PLUGINS));

        let a = apiserver(&cluster("1.10.0"));
        assert!(!a.contains_key(ADMISSION_CONTROL));
        let plugins = a.get(ENABLE_ADMISSION_PLUGINS).expect("plural key");
        assert!(!plugins.contains("PodSecurityPolicy"), "PSP defaults off before 1.15");

        let a = apiserver(&cluster("1.15.0-beta.1"));
        assert!(a
            .get(ENABLE_ADMISSION_PLUGINS)
            .is_some_and(|v| v.ends_with(",PodSecurityPolicy")));
    }

    #[test]
    fn test_admission_override_is_not_extended() {
        let mut spec = cluster("1.16.0");
        spec.features = FeatureFlags::default().with(Feature::PodSecurityPolicy, true);
        let a = resolve_with(&spec, ComponentKind::ApiServer, &[(ENABLE_ADMISSION_PLUGINS, "NamespaceLifecycle")]);
        assert_eq!(a.get(ENABLE_ADMISSION_PLUGINS), Some("NamespaceLifecycle"));
    }

    // ==========================================================================
    // Story Tests: Version Gates
    // ==========================================================================

    /// Story: --repair-malformed-updates exists only before 1.14
    #[test]
    fn story_repair_malformed_updates() {
        assert_eq!(apiserver(&cluster("1.13.0")).get("--repair-malformed-updates"), Some("false"));
        assert!(!apiserver(&cluster("1.14.0")).contains_key("--repair-malformed-updates"));

        let a = resolve_with(&cluster("1.14.0"), ComponentKind::ApiServer, &[("--repair-malformed-updates", "true")]);
        assert!(!a.contains_key("--repair-malformed-updates"), "stale override is stripped");
    }

    #[test]
    fn test_insecure_port_removed() {
        assert_eq!(apiserver(&cluster("1.23.5")).get("--insecure-port"), Some("8080"));
        assert!(!apiserver(&cluster("1.24.0")).contains_key("--insecure-port"));
    }

    #[test]
    fn test_audit_policy_gate() {
        assert!(!apiserver(&cluster("1.7.12")).contains_key(AUDIT_POLICY_FILE));
        assert_eq!(apiserver(&cluster("1.8.0")).get(AUDIT_POLICY_FILE), Some(AUDIT_POLICY_PATH));
    }

    /// Story: the legacy audit policy location is rewritten, other values are not
    #[test]
    fn story_audit_policy_back_compat() {
        let spec = cluster("1.10.8");
        let a = resolve_with(&spec, ComponentKind::ApiServer, &[(AUDIT_POLICY_FILE, LEGACY_AUDIT_POLICY_PATH)]);
        assert_eq!(a.get(AUDIT_POLICY_FILE), Some(AUDIT_POLICY_PATH));

        let a = resolve_with(&spec, ComponentKind::ApiServer, &[(AUDIT_POLICY_FILE, "/etc/custom/audit.yaml")]);
        assert_eq!(a.get(AUDIT_POLICY_FILE), Some("/etc/custom/audit.yaml"));
    }

    // ==========================================================================
    // Story Tests: Static Defaults
    // ==========================================================================

    #[test]
    fn test_profiling() {
        let a = resolve_with(&cluster(DEFAULT_TEST_VERSION), ComponentKind::ApiServer, &[("--profiling", "true")]);
        assert_eq!(a.get("--profiling"), Some("true"));
        assert_eq!(apiserver(&cluster(DEFAULT_TEST_VERSION)).get("--profiling"), Some("false"));
    }

    #[test]
    fn test_cipher_suites() {
        let all_suites = "TLS_ECDHE_ECDSA_WITH_AES_128_CBC_SHA,TLS_RSA_WITH_RC4_128_SHA";
        for version in ["1.13.0", "1.14.0"] {
            assert_eq!(
                apiserver(&cluster(version)).get("--tls-cipher-suites"),
                Some(TLS_STRONG_CIPHER_SUITES)
            );
            let a = resolve_with(&cluster(version), ComponentKind::ApiServer, &[("--tls-cipher-suites", all_suites)]);
            assert_eq!(a.get("--tls-cipher-suites"), Some(all_suites));
        }
    }

    /// Story: the datastore endpoint follows the managed datastore flag
    #[test]
    fn story_datastore_endpoint() {
        let a = apiserver(&cluster("1.15.4"));
        assert_eq!(a.get("--etcd-cafile"), Some("/etc/kubernetes/certs/ca.crt"));
        assert_eq!(a.get("--etcd-servers"), Some("https://127.0.0.1:2379"));

        let mut spec = with_feature("1.14.0", Feature::ManagedDatastore, true);
        spec.control_plane.dns_prefix = "my-cosmos".to_string();
        let a = apiserver(&spec);
        assert_eq!(
            a.get("--etcd-servers"),
            Some("https://my-cosmosk8s.etcd.cosmosdb.azure.com:2379")
        );
        assert!(!a.contains_key("--etcd-cafile"));
    }

    #[test]
    fn test_service_cidr_from_network_profile() {
        let mut spec = cluster("1.16.0");
        spec.network.service_cidr = "10.10.0.0/16".to_string();
        assert_eq!(apiserver(&spec).get("--service-cluster-ip-range"), Some("10.10.0.0/16"));
    }

    // ==========================================================================
    // Properties
    // ==========================================================================

    fn versions() -> impl Strategy<Value = String> {
        (6u64..30, 0u64..15).prop_map(|(minor, patch)| format!("1.{minor}.{patch}"))
    }

    const RETIRABLE: &[&str] = &[
        ADMISSION_CONTROL,
        EXPERIMENTAL_ENCRYPTION_CONFIG,
        "--repair-malformed-updates",
        "--insecure-port",
    ];

    proptest! {
        #[test]
        fn caller_values_survive_unless_retired(
            version in versions(),
            key in prop::sample::select(vec![
                "--v", "--profiling", "--authorization-mode", "--etcd-servers",
                "--kubelet-client-key", "--oidc-issuer-url", "--secure-port",
            ]),
            value in "[a-z0-9]{1,12}",
        ) {
            let mut spec = with_identity(&version, "chinaeast");
            spec.features = FeatureFlags::default()
                .with(Feature::Rbac, false)
                .with(Feature::SecureKubelet, false);
            let a = resolve_with(&spec, ComponentKind::ApiServer, &[(key, value.as_str())]);
            prop_assert_eq!(a.get(key), Some(value.as_str()));
        }

        #[test]
        fn retired_flags_never_reappear(
            minor in 24u64..40,
            patch in 0u64..10,
            key in prop::sample::select(RETIRABLE.to_vec()),
        ) {
            let version = format!("1.{minor}.{patch}");
            let a = resolve_with(&cluster(&version), ComponentKind::ApiServer, &[(key, "stale")]);
            prop_assert!(!a.contains_key(key));
        }

        #[test]
        fn resolution_is_deterministic(version in versions(), psp in prop::bool::ANY) {
            let mut spec = with_identity(&version, "westus2");
            spec.features = FeatureFlags::default().with(Feature::PodSecurityPolicy, psp);
            let first = apiserver(&spec);
            let second = apiserver(&spec);
            prop_assert_eq!(first.to_args(), second.to_args());
        }
    }
}
