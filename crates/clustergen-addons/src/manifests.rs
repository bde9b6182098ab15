//! Control-plane static pod manifests

use std::collections::BTreeMap;

use clustergen_common::{
    CloudEnvironment, ClusterSpec, ClusterVersion, ComponentKind, Defaults, EvalContext, Feature,
    Result,
};

use crate::catalog::{AddonSpec, PayloadSource};

struct ManifestDescriptor {
    name: &'static str,
    source: &'static str,
    on_premises_source: Option<&'static str>,
    destination: &'static str,
    // Component whose inline manifest replaces the template.
    component: Option<ComponentKind>,
}

const MANIFESTS: &[ManifestDescriptor] = &[
    ManifestDescriptor {
        name: "kube-scheduler",
        source: "kube-scheduler.yaml",
        on_premises_source: None,
        destination: "kube-scheduler.yaml",
        component: Some(ComponentKind::Scheduler),
    },
    ManifestDescriptor {
        name: "kube-controller-manager",
        source: "kube-controller-manager.yaml",
        on_premises_source: Some("kube-controller-manager-custom.yaml"),
        destination: "kube-controller-manager.yaml",
        component: Some(ComponentKind::ControllerManager),
    },
    ManifestDescriptor {
        name: "cloud-controller-manager",
        source: "cloud-controller-manager.yaml",
        on_premises_source: None,
        destination: "cloud-controller-manager.yaml",
        component: Some(ComponentKind::CloudControllerManager),
    },
    ManifestDescriptor {
        name: "kube-apiserver",
        source: "kube-apiserver.yaml",
        on_premises_source: None,
        destination: "kube-apiserver.yaml",
        component: Some(ComponentKind::ApiServer),
    },
    ManifestDescriptor {
        name: "kube-addon-manager",
        source: "kube-addon-manager.yaml",
        on_premises_source: None,
        destination: "kube-addon-manager.yaml",
        component: None,
    },
];

/// Static pod manifests for a descriptor, in delivery order
pub fn manifest_specs(spec: &ClusterSpec) -> Result<Vec<AddonSpec>> {
    let version = ClusterVersion::parse(&spec.orchestrator_version)?;
    let ctx = EvalContext::new(spec, &version, Defaults::global());
    Ok(manifests_for(&ctx))
}

/// Static pod manifests against an existing evaluation context
pub fn manifests_for(ctx: &EvalContext<'_>) -> Vec<AddonSpec> {
    let custom: &BTreeMap<ComponentKind, String> = &ctx.spec.custom_manifests;
    MANIFESTS
        .iter()
        .enumerate()
        .map(|(order, manifest)| {
            let enabled = match manifest.component {
                Some(ComponentKind::CloudControllerManager) => {
                    ctx.feature(Feature::CloudControllerManager)
                }
                _ => true,
            };
            let inline = manifest
                .component
                .and_then(|component| custom.get(&component))
                .filter(|data| !data.is_empty());
            let payload = match inline {
                Some(data) => PayloadSource::Inline(data.clone()),
                None => PayloadSource::Template {
                    dir: ctx.defaults.manifest_source_dir.clone(),
                    file: match (ctx.environment, manifest.on_premises_source) {
                        (CloudEnvironment::OnPremises, Some(source)) => source,
                        _ => manifest.source,
                    }
                    .to_string(),
                    version: ctx.version.minor_key(),
                },
            };
            AddonSpec {
                name: manifest.name.to_string(),
                enabled,
                payload,
                destination: format!(
                    "{}/{}",
                    ctx.defaults.manifest_destination_dir, manifest.destination
                ),
                order,
            }
        })
        .collect()
}
