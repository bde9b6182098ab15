//! Predicates over the cluster descriptor
//!
//! Flag rules and addon descriptors both decide applicability with a
//! [`Condition`]. Conditions are plain data so rule tables stay declarative
//! and can be inspected in tests; [`Condition::evaluate`] is pure.

use std::collections::BTreeMap;

use crate::component::{ComponentKind, ConfigMap};
use crate::defaults::Defaults;
use crate::features::Feature;
use crate::spec::{
    ClusterSpec, CloudEnvironment, IdentitySystem, NetworkPlugin, NetworkPolicy, StorageKind,
};
use crate::version::{ClusterVersion, Release, VersionGate};

/// Everything a condition or computed value may read
///
/// Borrowed for the duration of one resolution or catalog pass.
#[derive(Clone, Copy, Debug)]
pub struct EvalContext<'a> {
    /// Caller's descriptor
    pub spec: &'a ClusterSpec,
    /// Parsed target version
    pub version: &'a ClusterVersion,
    /// Constant registry
    pub defaults: &'a Defaults,
    /// Environment derived from the descriptor
    pub environment: CloudEnvironment,
    /// Component maps resolved so far (available to addon predicates)
    pub resolved: Option<&'a BTreeMap<ComponentKind, ConfigMap>>,
}

impl<'a> EvalContext<'a> {
    /// Build a context for flag resolution (no resolved maps yet)
    pub fn new(spec: &'a ClusterSpec, version: &'a ClusterVersion, defaults: &'a Defaults) -> Self {
        Self {
            spec,
            version,
            defaults,
            environment: spec.environment(defaults),
            resolved: None,
        }
    }

    /// Attach resolved component maps for addon predicates
    pub fn with_resolved(mut self, resolved: &'a BTreeMap<ComponentKind, ConfigMap>) -> Self {
        self.resolved = Some(resolved);
        self
    }

    /// Effective state of a feature at the target version
    pub fn feature(&self, feature: Feature) -> bool {
        self.spec.features.resolve(feature, self.version)
    }

    /// Resolved value of a component flag, if that map is available
    pub fn resolved_flag(&self, component: ComponentKind, key: &str) -> Option<&'a str> {
        self.resolved?.get(&component)?.get(key)
    }
}

/// A predicate over the descriptor
#[derive(Clone, Debug, PartialEq)]
pub enum Condition {
    /// Always applies
    Always,
    /// Target version falls inside the gate
    Version(VersionGate),
    /// Feature resolves to on (unset flags take the version default)
    Enabled(Feature),
    /// Feature resolves to off
    Disabled(Feature),
    /// An identity profile is configured
    Identity,
    /// An identity profile with an admin group is configured
    AdminGroup,
    /// Deployment environment matches
    Environment(CloudEnvironment),
    /// On-premises cloud uses the given identity system
    IdentitySystem(IdentitySystem),
    /// CNI plugin matches
    NetworkPlugin(NetworkPlugin),
    /// Network policy engine matches
    NetworkPolicy(NetworkPolicy),
    /// At least one worker pool exists
    WorkerPools,
    /// First worker pool uses the given storage kind
    PrimaryStorage(StorageKind),
    /// A resolved component map carries the flag
    FlagSet(ComponentKind, &'static str),
    /// Every condition holds
    All(Vec<Condition>),
    /// At least one condition holds
    Any(Vec<Condition>),
    /// The condition does not hold
    Not(Box<Condition>),
}

impl Condition {
    /// Evaluate against a context
    pub fn evaluate(&self, ctx: &EvalContext<'_>) -> bool {
        match self {
            Condition::Always => true,
            Condition::Version(gate) => ctx.version.satisfies(gate),
            Condition::Enabled(feature) => ctx.feature(*feature),
            Condition::Disabled(feature) => !ctx.feature(*feature),
            Condition::Identity => ctx.spec.identity.is_some(),
            Condition::AdminGroup => ctx
                .spec
                .identity
                .as_ref()
                .and_then(|identity| identity.admin_group())
                .is_some(),
            Condition::Environment(environment) => ctx.environment == *environment,
            Condition::IdentitySystem(system) => ctx
                .spec
                .custom_cloud
                .as_ref()
                .is_some_and(|cloud| cloud.identity_system == *system),
            Condition::NetworkPlugin(plugin) => ctx.spec.network.plugin == *plugin,
            Condition::NetworkPolicy(policy) => ctx.spec.network.policy == Some(*policy),
            Condition::WorkerPools => !ctx.spec.worker_pools.is_empty(),
            Condition::PrimaryStorage(kind) => ctx.spec.primary_storage() == Some(*kind),
            Condition::FlagSet(component, key) => ctx.resolved_flag(*component, key).is_some(),
            Condition::All(conditions) => conditions.iter().all(|c| c.evaluate(ctx)),
            Condition::Any(conditions) => conditions.iter().any(|c| c.evaluate(ctx)),
            Condition::Not(condition) => !condition.evaluate(ctx),
        }
    }
}

/// Target version is at least `major.minor.patch`
pub fn since(major: u64, minor: u64, patch: u64) -> Condition {
    Condition::Version(VersionGate::since(Release::new(major, minor, patch)))
}

/// Target version is below `major.minor.patch`
pub fn until(major: u64, minor: u64, patch: u64) -> Condition {
    Condition::Version(VersionGate::until(Release::new(major, minor, patch)))
}

/// Conjunction
pub fn all(conditions: impl IntoIterator<Item = Condition>) -> Condition {
    Condition::All(conditions.into_iter().collect())
}

/// Disjunction
pub fn any(conditions: impl IntoIterator<Item = Condition>) -> Condition {
    Condition::Any(conditions.into_iter().collect())
}

/// Negation
pub fn not(condition: Condition) -> Condition {
    Condition::Not(Box::new(condition))
}
