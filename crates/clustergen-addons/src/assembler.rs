//! Boot artifact bundle assembly
//!
//! Turns the ordered addon and manifest lists into artifact blocks:
//!
//! ```text
//! - path: /etc/kubernetes/addons/coredns.yaml
//!   permissions: "0644"
//!   encoding: gzip
//!   owner: "root"
//!   content: !!binary |
//!     H4sIAAAAAAAC/...
//! ```
//!
//! Templates come from an [`AssetLoader`] and are rendered with minijinja
//! against the target version, network settings and each resolved
//! component's arguments. A failing entry is logged and reported in
//! [`Assembly::failures`]; the rest of the bundle is unaffected. An inline
//! payload that cannot be decoded still occupies its slot as a block with
//! empty content, while other failures leave the entry out.

use std::fmt;

use minijinja::{Environment, UndefinedBehavior};
use serde::Serialize;
use tracing::{debug, instrument, warn};

use clustergen_common::{
    ComponentKind, EvalContext, Error, Result, ARTIFACT_ENCODING, ARTIFACT_OWNER,
    ARTIFACT_PERMISSIONS,
};

use crate::assets::AssetLoader;
use crate::catalog::{AddonSpec, PayloadSource};
use crate::payload::PayloadCodec;

/// One file delivered to control-plane nodes
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArtifactEntry {
    /// Addon or manifest name
    pub name: String,
    /// Absolute destination path
    pub path: String,
    /// Permission bits
    pub permissions: &'static str,
    /// Owner
    pub owner: &'static str,
    /// Encoding marker
    pub encoding: &'static str,
    /// Gzip-compressed, base64-encoded content
    pub content: String,
}

impl ArtifactEntry {
    fn empty(spec: &AddonSpec) -> Self {
        Self {
            name: spec.name.clone(),
            path: spec.destination.clone(),
            permissions: ARTIFACT_PERMISSIONS,
            owner: ARTIFACT_OWNER,
            encoding: ARTIFACT_ENCODING,
            content: String::new(),
        }
    }

    /// Render the entry as a boot document block
    pub fn render_block(&self) -> String {
        format!(
            "- path: {}\n  permissions: \"{}\"\n  encoding: {}\n  owner: \"{}\"\n  content: !!binary |\n    {}\n\n",
            self.path, self.permissions, self.encoding, self.owner, self.content
        )
    }
}

/// Concatenated artifact blocks in delivery order
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Bundle(String);

impl Bundle {
    /// Build a bundle from entries, keeping their order
    pub fn from_entries<'e>(entries: impl IntoIterator<Item = &'e ArtifactEntry>) -> Self {
        Self(entries.into_iter().map(ArtifactEntry::render_block).collect())
    }

    /// Bundle text
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether no entry was assembled
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Replace every occurrence of `placeholder` in a host document with the bundle
    pub fn substitute_into(&self, document: &str, placeholder: &str) -> String {
        document.replace(placeholder, &self.0)
    }
}

impl fmt::Display for Bundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Result of assembling one bundle
#[derive(Debug, Default)]
pub struct Assembly {
    /// Blocks of every successfully assembled entry
    pub bundle: Bundle,
    /// Entries in the bundle, in delivery order, including empty blocks
    /// for undecodable inline payloads
    pub entries: Vec<ArtifactEntry>,
    /// Enabled entries that could not be assembled, by name
    pub failures: Vec<(String, Error)>,
}

#[derive(Debug, Default, Serialize)]
struct TemplateContext {
    version: String,
    minor_version: String,
    location: String,
    dns_prefix: String,
    cluster_cidr: String,
    service_cidr: String,
    network_plugin: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    admin_group_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    apiserver_args: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    controller_manager_args: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    scheduler_args: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    cloud_controller_manager_args: Option<Vec<String>>,
}

impl TemplateContext {
    fn from_eval(ctx: &EvalContext<'_>) -> Self {
        let args = |component: ComponentKind| {
            ctx.resolved
                .and_then(|maps| maps.get(&component))
                .map(|map| map.to_args())
        };
        let network_plugin = serialized_name(&ctx.spec.network.plugin);
        Self {
            version: ctx.version.release().to_string(),
            minor_version: ctx.version.minor_key(),
            location: ctx.spec.location.clone(),
            dns_prefix: ctx.spec.control_plane.dns_prefix.clone(),
            cluster_cidr: ctx.spec.network.cluster_cidr.clone(),
            service_cidr: ctx.spec.network.service_cidr.clone(),
            network_plugin,
            admin_group_id: ctx
                .spec
                .identity
                .as_ref()
                .and_then(|identity| identity.admin_group())
                .map(str::to_string),
            apiserver_args: args(ComponentKind::ApiServer),
            controller_manager_args: args(ComponentKind::ControllerManager),
            scheduler_args: args(ComponentKind::Scheduler),
            cloud_controller_manager_args: args(ComponentKind::CloudControllerManager),
        }
    }
}

// Serialized name of a unit enum variant, as written in descriptors.
fn serialized_name<T: Serialize>(value: &T) -> String {
    minijinja::Value::from_serialize(value).to_string()
}

/// Assembles enabled catalog entries into a bundle
pub struct ArtifactAssembler<'a> {
    loader: &'a dyn AssetLoader,
    codec: &'a dyn PayloadCodec,
    env: Environment<'static>,
    context: TemplateContext,
}

impl<'a> ArtifactAssembler<'a> {
    /// Create an assembler for one descriptor
    ///
    /// `ctx` should carry the resolved component maps; components without a
    /// map leave their `*_args` template variable undefined, so templates
    /// that need them fail instead of rendering an empty argument list.
    pub fn new(
        loader: &'a dyn AssetLoader,
        codec: &'a dyn PayloadCodec,
        ctx: &EvalContext<'_>,
    ) -> Self {
        let mut env = Environment::new();
        env.set_undefined_behavior(UndefinedBehavior::Strict);
        env.set_keep_trailing_newline(true);
        Self {
            loader,
            codec,
            env,
            context: TemplateContext::from_eval(ctx),
        }
    }

    /// Assemble addons then manifests, skipping disabled entries
    #[instrument(skip_all, fields(addons = addons.len(), manifests = manifests.len()))]
    pub fn assemble(&self, addons: &[AddonSpec], manifests: &[AddonSpec]) -> Assembly {
        let mut assembly = Assembly::default();
        for spec in addons.iter().chain(manifests).filter(|spec| spec.enabled) {
            match self.assemble_entry(spec) {
                Ok(entry) => {
                    debug!(entry = %entry.name, path = %entry.path, "assembled artifact");
                    assembly.entries.push(entry);
                }
                Err(e @ Error::PayloadDecode { .. }) => {
                    warn!(entry = %spec.name, error = %e, "emitting empty artifact");
                    assembly.entries.push(ArtifactEntry::empty(spec));
                    assembly.failures.push((spec.name.clone(), e));
                }
                Err(e) => {
                    warn!(entry = %spec.name, error = %e, "skipping artifact");
                    assembly.failures.push((spec.name.clone(), e));
                }
            }
        }
        assembly.bundle = Bundle::from_entries(&assembly.entries);
        assembly
    }

    /// Assemble a single entry regardless of its enablement
    pub fn assemble_entry(&self, spec: &AddonSpec) -> Result<ArtifactEntry> {
        let content = match &spec.payload {
            PayloadSource::Inline(data) => self.codec.decode(&spec.name, data)?,
            PayloadSource::Template { dir, file, version } => {
                let template = self.load_template(&spec.name, dir, file, version)?;
                self.render(&spec.name, &template)?.into_bytes()
            }
        };
        Ok(ArtifactEntry {
            name: spec.name.clone(),
            path: spec.destination.clone(),
            permissions: ARTIFACT_PERMISSIONS,
            owner: ARTIFACT_OWNER,
            encoding: ARTIFACT_ENCODING,
            content: self.codec.encode(&content)?,
        })
    }

    fn load_template(&self, entry: &str, dir: &str, file: &str, version: &str) -> Result<String> {
        let tried = vec![format!("{dir}/{version}/{file}"), format!("{dir}/{file}")];
        for path in &tried {
            if let Some(bytes) = self.loader.load(path)? {
                debug!(entry, path = %path, "loaded template");
                return String::from_utf8(bytes)
                    .map_err(|e| Error::template(entry, format!("{path} is not UTF-8: {e}")));
            }
        }
        Err(Error::asset_not_found(entry, tried))
    }

    fn render(&self, entry: &str, template: &str) -> Result<String> {
        self.env
            .render_str(template, &self.context)
            .map_err(|e| Error::template(entry, e.to_string()))
    }
}
