//! clustergen - resolves versioned cluster descriptors into component
//! configuration and boot artifacts
//!
//! A [`ClusterSpec`] names a target orchestrator version, a region and a
//! partial set of caller overrides. Generation runs in two stages:
//!
//! - [`clustergen_resolver`] resolves the full flag map of every
//!   control-plane component, honoring override precedence, version gates
//!   and the deployment environment
//! - [`clustergen_addons`] selects the addons and static pod manifests the
//!   cluster needs and assembles them into one ordered, gzip-encoded bundle
//!
//! [`generate`] runs both stages and reports per-component and per-entry
//! failures alongside the partial result.
//!
//! # Modules
//!
//! - [`pipeline`] - end-to-end generation

#![deny(missing_docs)]

pub mod pipeline;

pub use clustergen_addons::{AssetLoader, Bundle, DirectoryAssets, EmbeddedAssets};
pub use clustergen_common::{ClusterSpec, ComponentKind, ConfigMap, Defaults, Error, Result};
pub use pipeline::{generate, generate_with, Failure, FailureScope, GeneratedArtifacts};
