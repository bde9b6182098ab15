//! End-to-end artifact generation
//!
//! One call turns a descriptor into resolved component maps and the boot
//! artifact bundle. Component and entry failures are collected rather than
//! aborting the run; only an unparseable target version is fatal.

use std::collections::BTreeMap;
use std::fmt;

use tracing::{info, instrument, warn};

use clustergen_addons::{
    catalog_for, manifests_for, AddonSpec, ArtifactAssembler, ArtifactEntry, AssetLoader, Bundle,
    GzipBase64,
};
use clustergen_common::{ClusterSpec, ComponentKind, ConfigMap, Defaults, Error, Result};
use clustergen_resolver::Resolver;

/// What a failure belongs to
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FailureScope {
    /// A component's flag map could not be resolved
    Component(ComponentKind),
    /// A bundle entry could not be assembled
    Entry(String),
}

impl fmt::Display for FailureScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureScope::Component(component) => write!(f, "component {component}"),
            FailureScope::Entry(name) => write!(f, "entry {name}"),
        }
    }
}

/// A non-fatal failure recorded during generation
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Failure {
    /// Component or entry the failure belongs to
    pub scope: FailureScope,
    /// What went wrong
    pub error: Error,
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.scope, self.error)
    }
}

/// Everything generated for one descriptor
#[derive(Debug)]
pub struct GeneratedArtifacts {
    /// Resolved flag map per component that resolved cleanly
    pub config_maps: BTreeMap<ComponentKind, ConfigMap>,
    /// Addon catalog, enabled and disabled, in declaration order
    pub addons: Vec<AddonSpec>,
    /// Static pod manifests, enabled and disabled, in declaration order
    pub manifests: Vec<AddonSpec>,
    /// Bundle entries in delivery order
    pub entries: Vec<ArtifactEntry>,
    /// Concatenated artifact blocks
    pub bundle: Bundle,
    /// Components and entries that failed, in the order they were found
    pub failures: Vec<Failure>,
}

impl GeneratedArtifacts {
    /// Resolved map for a component, if it resolved
    pub fn config(&self, component: ComponentKind) -> Option<&ConfigMap> {
        self.config_maps.get(&component)
    }

    /// Whether every component and enabled entry was produced
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Generate artifacts with the built-in constant registry
pub fn generate(spec: &ClusterSpec, loader: &dyn AssetLoader) -> Result<GeneratedArtifacts> {
    generate_with(spec, loader, Defaults::global())
}

/// Generate artifacts with an injected constant registry
#[instrument(skip_all, fields(version = %spec.orchestrator_version, location = %spec.location))]
pub fn generate_with(
    spec: &ClusterSpec,
    loader: &dyn AssetLoader,
    defaults: &Defaults,
) -> Result<GeneratedArtifacts> {
    let resolver = Resolver::new(spec, defaults)?;
    let resolution = resolver.resolve_all();

    let mut failures: Vec<Failure> = resolution
        .failures
        .into_iter()
        .map(|(component, error)| {
            warn!(component = %component, error = %error, "component not resolved");
            Failure {
                scope: FailureScope::Component(component),
                error,
            }
        })
        .collect();

    let config_maps = resolution.maps;
    let ctx = resolver.context().with_resolved(&config_maps);
    let addons = catalog_for(&ctx);
    let manifests = manifests_for(&ctx);

    let codec = GzipBase64::from_defaults(defaults);
    let assembly = ArtifactAssembler::new(loader, &codec, &ctx).assemble(&addons, &manifests);
    failures.extend(
        assembly
            .failures
            .into_iter()
            .map(|(name, error)| Failure {
                scope: FailureScope::Entry(name),
                error,
            }),
    );

    info!(
        components = config_maps.len(),
        entries = assembly.entries.len(),
        failures = failures.len(),
        "generated cluster artifacts"
    );

    Ok(GeneratedArtifacts {
        config_maps,
        addons,
        manifests,
        entries: assembly.entries,
        bundle: assembly.bundle,
        failures,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use clustergen_addons::EmbeddedAssets;
    use clustergen_common::spec::AddonConfig;

    #[test]
    fn test_malformed_version_is_fatal() {
        let spec = ClusterSpec::new("latest", "westus2");
        let err = generate(&spec, &EmbeddedAssets).unwrap_err();
        assert!(err.is_fatal());
        assert!(matches!(err, Error::MalformedVersion { .. }));
    }

    #[test]
    fn test_default_cluster_is_complete() {
        let spec = ClusterSpec::new("1.16.9", "westus2");
        let generated = generate(&spec, &EmbeddedAssets).expect("generate");
        assert!(generated.is_complete(), "{:?}", generated.failures);
        assert_eq!(generated.config_maps.len(), ComponentKind::ALL.len());
        assert!(generated
            .bundle
            .as_str()
            .contains("- path: /etc/kubernetes/manifests/kube-apiserver.yaml\n"));
    }

    #[test]
    fn test_entry_failure_is_scoped() {
        let mut spec = ClusterSpec::new("1.16.9", "westus2");
        spec.addons.insert(
            "coredns".to_string(),
            AddonConfig {
                enabled: None,
                data: Some("!!!".to_string()),
            },
        );
        let generated = generate(&spec, &EmbeddedAssets).expect("generate");
        assert_eq!(generated.failures.len(), 1);
        assert_eq!(
            generated.failures[0].scope,
            FailureScope::Entry("coredns".to_string())
        );
        let coredns = generated
            .entries
            .iter()
            .find(|entry| entry.name == "coredns")
            .expect("coredns keeps its slot");
        assert!(coredns.content.is_empty());
        assert!(generated
            .bundle
            .as_str()
            .contains("- path: /etc/kubernetes/addons/coredns.yaml\n"));
        assert!(generated.entries.iter().any(|entry| entry.name == "kube-proxy"));
    }
}
