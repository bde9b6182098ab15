//! Common types for clustergen: cluster spec, version gates, errors, and codec

#![deny(missing_docs)]

pub mod codec;
pub mod component;
pub mod condition;
pub mod defaults;
pub mod error;
pub mod features;
pub mod spec;
pub mod version;

pub use component::{ComponentKind, ConfigMap};
pub use condition::{Condition, EvalContext};
pub use defaults::Defaults;
pub use error::Error;
pub use features::{Feature, FeatureFlags};
pub use spec::{CloudEnvironment, ClusterSpec};
pub use version::{ClusterVersion, Release, VersionGate};

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Permission bits written on every boot artifact
pub const ARTIFACT_PERMISSIONS: &str = "0644";

/// Owner written on every boot artifact
pub const ARTIFACT_OWNER: &str = "root";

/// Encoding marker written on every boot artifact
pub const ARTIFACT_ENCODING: &str = "gzip";
