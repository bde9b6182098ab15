//! kube-scheduler rule table

use clustergen_common::condition::since;
use clustergen_common::{Condition, EvalContext};

use super::KUBECONFIG;
use crate::rule::{set_default_with, static_defaults, Effect, Rule};

const STATIC: &[(&str, &str)] = &[
    ("--kubeconfig", KUBECONFIG),
    ("--leader-elect", "true"),
    ("--v", "2"),
];

fn profiling(ctx: &EvalContext<'_>) -> String {
    ctx.defaults.scheduler_profiling.clone()
}

pub(super) fn rules() -> Vec<Rule> {
    let mut rules = vec![Rule::removal(
        "policy-config-file-removed",
        since(1, 23, 0),
        Effect::Remove(&["--policy-config-file"]),
    )];
    rules.extend(static_defaults("static", Condition::Always, STATIC));
    rules.push(Rule::feature_default(
        "profiling",
        Condition::Always,
        set_default_with("--profiling", profiling),
    ));
    rules
}
