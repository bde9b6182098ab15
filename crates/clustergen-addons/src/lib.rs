//! Addon catalog and boot artifact assembly
//!
//! The catalog decides which addons and static pod manifests a cluster
//! gets; the assembler renders each enabled entry from its template (or the
//! caller's inline payload) into the ordered, gzip-encoded bundle written to
//! control-plane nodes at boot.

#![deny(missing_docs)]

pub mod assembler;
pub mod assets;
pub mod catalog;
pub mod manifests;
pub mod payload;

pub use assembler::{ArtifactAssembler, ArtifactEntry, Assembly, Bundle};
pub use assets::{AssetLoader, DirectoryAssets, EmbeddedAssets};
pub use catalog::{build_catalog, catalog_for, descriptors, AddonDescriptor, AddonSpec, PayloadSource};
pub use manifests::{manifest_specs, manifests_for};
pub use payload::{GzipBase64, PayloadCodec};
