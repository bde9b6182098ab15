//! cloud-controller-manager rule table

use clustergen_common::{Condition, EvalContext};

use super::{CLOUD_CONFIG, KUBECONFIG};
use crate::rule::{set_default_with, static_defaults, Rule};

const STATIC: &[(&str, &str)] = &[
    ("--cloud-provider", "azure"),
    ("--cloud-config", CLOUD_CONFIG),
    ("--kubeconfig", KUBECONFIG),
    ("--leader-elect", "true"),
    ("--route-reconciliation-period", "10s"),
    ("--v", "2"),
];

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
    let mut rules: Vec<Rule> = static_defaults("static", Condition::Always, STATIC).collect();
    rules.extend([
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
    ]);
    rules
}

#[cfg(test)]
mod tests {
    use crate::components::test_support::resolve;
    use clustergen_common::spec::NetworkPlugin;
    use clustergen_common::{ClusterSpec, ComponentKind};

    #[test]
    fn test_defaults_follow_network_profile() {
        let mut spec = ClusterSpec::new("1.16.9", "westus2");
        spec.network.plugin = NetworkPlugin::Kubenet;
        spec.network.cluster_cidr = "10.100.0.0/14".to_string();
        let c = resolve(&spec, ComponentKind::CloudControllerManager);
        assert_eq!(c.get("--cloud-provider"), Some("azure"));
        assert_eq!(c.get("--cluster-cidr"), Some("10.100.0.0/14"));
        assert_eq!(c.get("--allocate-node-cidrs"), Some("true"));
        assert_eq!(c.get("--configure-cloud-routes"), Some("true"));
        assert_eq!(c.get("--route-reconciliation-period"), Some("10s"));
    }

    #[test]
    fn test_overrides_win() {
        let mut spec = ClusterSpec::new("1.16.9", "westus2");
        spec.overrides
            .entry(ComponentKind::CloudControllerManager)
            .insert("--v".to_string(), "4".to_string());
        assert_eq!(resolve(&spec, ComponentKind::CloudControllerManager).get("--v"), Some("4"));
    }
}
