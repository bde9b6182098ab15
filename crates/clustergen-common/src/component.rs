//! Control-plane components and their resolved flag maps

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A control-plane process whose command-line flags are resolved
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ComponentKind {
    /// kube-apiserver
    #[serde(rename = "kube-apiserver")]
    ApiServer,
    /// kube-controller-manager
    #[serde(rename = "kube-controller-manager")]
    ControllerManager,
    /// kube-scheduler
    #[serde(rename = "kube-scheduler")]
    Scheduler,
    /// cloud-controller-manager
    CloudControllerManager,
}

impl ComponentKind {
    /// All components, in resolution and reporting order
    pub const ALL: [ComponentKind; 4] = [
        ComponentKind::ApiServer,
        ComponentKind::ControllerManager,
        ComponentKind::Scheduler,
        ComponentKind::CloudControllerManager,
    ];

    /// Process name as it appears in manifests
    pub fn name(self) -> &'static str {
        match self {
            ComponentKind::ApiServer => "kube-apiserver",
            ComponentKind::ControllerManager => "kube-controller-manager",
            ComponentKind::Scheduler => "kube-scheduler",
            ComponentKind::CloudControllerManager => "cloud-controller-manager",
        }
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Resolved flags for one component
///
/// Built once by the resolver and read-only afterwards. Keys iterate in
/// sorted order so repeated runs serialize byte-identically.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct ConfigMap(BTreeMap<String, String>);

impl ConfigMap {
    /// Look up a flag value
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Whether a flag is present
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Number of flags
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no flags were resolved
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate flags in key order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Render as `--flag=value` command-line arguments, in key order
    pub fn to_args(&self) -> Vec<String> {
        self.0.iter().map(|(k, v)| format!("{k}={v}")).collect()
    }

    /// Borrow the underlying map
    pub fn as_map(&self) -> &BTreeMap<String, String> {
        &self.0
    }
}

impl From<BTreeMap<String, String>> for ConfigMap {
    fn from(map: BTreeMap<String, String>) -> Self {
        Self(map)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ConfigMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}
