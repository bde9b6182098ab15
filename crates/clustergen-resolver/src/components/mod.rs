//! Per-component rule tables
//!
//! Each table is built once and shared by every run in the process.

mod apiserver;
mod cloud_controller_manager;
mod controller_manager;
mod scheduler;

use std::sync::LazyLock;

use clustergen_common::ComponentKind;

use crate::rule::Rule;

/// Kubeconfig path shared by the control-plane components
pub(crate) const KUBECONFIG: &str = "/var/lib/kubelet/kubeconfig";

/// In-tree cloud provider config
pub(crate) const CLOUD_CONFIG: &str = "/etc/kubernetes/azure.json";

static API_SERVER: LazyLock<Vec<Rule>> = LazyLock::new(apiserver::rules);
static CONTROLLER_MANAGER: LazyLock<Vec<Rule>> = LazyLock::new(controller_manager::rules);
static SCHEDULER: LazyLock<Vec<Rule>> = LazyLock::new(scheduler::rules);
static CLOUD_CONTROLLER_MANAGER: LazyLock<Vec<Rule>> =
    LazyLock::new(cloud_controller_manager::rules);

/// The rule table for a component
pub fn rules_for(component: ComponentKind) -> &'static [Rule] {
    match component {
        ComponentKind::ApiServer => &API_SERVER,
        ComponentKind::ControllerManager => &CONTROLLER_MANAGER,
        ComponentKind::Scheduler => &SCHEDULER,
        ComponentKind::CloudControllerManager => &CLOUD_CONTROLLER_MANAGER,
    }
}
