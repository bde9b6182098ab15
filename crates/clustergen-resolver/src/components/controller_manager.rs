//! kube-controller-manager rule table

use clustergen_common::condition::since;
use clustergen_common::{Condition, EvalContext, Feature};

use super::{CLOUD_CONFIG, KUBECONFIG};
use crate::rule::{set_default, set_default_with, static_defaults, Effect, Rule};

const STATIC: &[(&str, &str)] = &[
    ("--kubeconfig", KUBECONFIG),
    ("--root-ca-file", "/etc/kubernetes/certs/ca.crt"),
    ("--cluster-signing-cert-file", "/etc/kubernetes/certs/ca.crt"),
    ("--cluster-signing-key-file", "/etc/kubernetes/certs/ca.key"),
    ("--service-account-private-key-file", "/etc/kubernetes/certs/apiserver.key"),
    ("--leader-elect", "true"),
    ("--v", "2"),
    ("--node-monitor-grace-period", "40s"),
    ("--pod-eviction-timeout", "5m0s"),
    ("--route-reconciliation-period", "10s"),
    ("--terminated-pod-gc-threshold", "5000"),
];

const IN_TREE_CLOUD_PROVIDER: &[(&str, &str)] =
    &[("--cloud-provider", "azure"), ("--cloud-config", CLOUD_CONFIG)];

fn profiling(ctx: &EvalContext<'_>) -> String {
    ctx.defaults.controller_manager_profiling.clone()
}

fn cluster_cidr(ctx: &EvalContext<'_>) -> String {
    ctx.spec.network.cluster_cidr.clone()
}

fn allocate_node_cidrs(ctx: &EvalContext<'_>) -> String {
    ctx.spec.network.plugin.allocates_node_cidrs().to_string()
}

fn configure_cloud_routes(ctx: &EvalContext<'_>) -> String {
    ctx.spec.network.plugin.requires_route_table().to_string()
}

pub(super) fn rules() -> Vec<Rule> {
    let mut rules = vec![Rule::removal(
        "pod-eviction-timeout-removed",
        since(1, 27, 0),
        Effect::Remove(&["--pod-eviction-timeout"]),
    )];
    rules.extend(static_defaults("static", Condition::Always, STATIC));
    rules.extend([
        Rule::feature_default("profiling", Condition::Always, set_default_with("--profiling", profiling)),
        Rule::feature_default(
            "cluster-cidr",
            Condition::Always,
            set_default_with("--cluster-cidr", cluster_cidr),
        ),
        Rule::feature_default(
            "allocate-node-cidrs",
            Condition::Always,
            set_default_with("--allocate-node-cidrs", allocate_node_cidrs),
        ),
        Rule::feature_default(
            "configure-cloud-routes",
            Condition::Always,
            set_default_with("--configure-cloud-routes", configure_cloud_routes),
        ),
        Rule::feature_default(
            "external-cloud-provider",
            Condition::Enabled(Feature::CloudControllerManager),
            set_default("--cloud-provider", "external"),
        ),
    ]);
    rules.extend(static_defaults(
        "in-tree-cloud-provider",
        Condition::Disabled(Feature::CloudControllerManager),
        IN_TREE_CLOUD_PROVIDER,
    ));
    rules.extend([
        Rule::feature_default(
            "service-account-credentials",
            Condition::Enabled(Feature::Rbac),
            set_default("--use-service-account-credentials", "true"),
        ),
        Rule::feature_default(
            "rbac-off",
            Condition::Disabled(Feature::Rbac),
            Effect::Withhold(&["--use-service-account-credentials"]),
        ),
    ]);
    rules
}
