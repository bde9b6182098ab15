//! Orchestrator version parsing and version gates
//!
//! Every version-dependent decision (flag defaults, deprecations, addon
//! availability) goes through [`VersionGate`]. Gating compares the release
//! triple only: a prerelease or build of `X` counts as "at least `X`", so a
//! `1.15.0-beta.1` cluster gets everything gated on `1.15.0`.

use std::fmt;

use semver::Version;

use crate::{Error, Result};

/// A `major.minor.patch` release triple
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Release {
    /// Major version
    pub major: u64,
    /// Minor version
    pub minor: u64,
    /// Patch version
    pub patch: u64,
}

impl Release {
    /// Create a release triple
    pub const fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }
}

impl fmt::Display for Release {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// A parsed orchestrator version
///
/// Accepts an optional leading `v` and a missing patch component
/// (`1.16` reads as `1.16.0`). Prerelease and build suffixes are validated
/// but ignored for gating.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterVersion {
    raw: String,
    version: Version,
}

impl ClusterVersion {
    /// Parse a version string
    ///
    /// Fails with [`Error::MalformedVersion`] unless at least `major.minor`
    /// can be read.
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        let stripped = trimmed.strip_prefix('v').unwrap_or(trimmed);
        let normalized =
            normalize(stripped).map_err(|msg| Error::malformed_version(raw, msg))?;
        let version = Version::parse(&normalized)
            .map_err(|e| Error::malformed_version(raw, e.to_string()))?;

        Ok(Self {
            raw: trimmed.to_string(),
            version,
        })
    }

    /// Release triple used for gating
    pub fn release(&self) -> Release {
        Release::new(self.version.major, self.version.minor, self.version.patch)
    }

    /// Whether the version carries a prerelease tag
    pub fn is_prerelease(&self) -> bool {
        !self.version.pre.is_empty()
    }

    /// `major.minor` key used to pick version-specific template assets
    pub fn minor_key(&self) -> String {
        format!("{}.{}", self.version.major, self.version.minor)
    }

    /// Check this version against a gate
    pub fn satisfies(&self, gate: &VersionGate) -> bool {
        gate.contains(self.release())
    }

    /// The version string as supplied (trimmed)
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl fmt::Display for ClusterVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Pad `major.minor` to `major.minor.0`, keeping any suffix
fn normalize(version: &str) -> std::result::Result<String, String> {
    let split = version.find(['-', '+']).unwrap_or(version.len());
    let (core, suffix) = version.split_at(split);
    let parts: Vec<&str> = core.split('.').collect();

    match parts.as_slice() {
        [major, minor] => Ok(format!("{major}.{minor}.0{suffix}")),
        [_, _, _] => Ok(version.to_string()),
        _ => Err(format!(
            "expected major.minor[.patch], found {} component(s)",
            parts.len()
        )),
    }
}

/// A version range: inclusive lower bound, optional exclusive upper bound
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VersionGate {
    min: Release,
    max: Option<Release>,
}

impl VersionGate {
    /// Every version at or above `min`
    pub const fn since(min: Release) -> Self {
        Self { min, max: None }
    }

    /// Every version strictly below `max`
    pub const fn until(max: Release) -> Self {
        Self {
            min: Release::new(0, 0, 0),
            max: Some(max),
        }
    }

    /// Versions in `[min, max)`
    pub const fn between(min: Release, max: Release) -> Self {
        Self {
            min,
            max: Some(max),
        }
    }

    /// Build an open-ended gate from a version string such as `1.15.0-beta.1`
    pub fn at_least(min: &str) -> Result<Self> {
        Ok(Self::since(ClusterVersion::parse(min)?.release()))
    }

    /// Whether a release falls inside this gate
    pub fn contains(&self, release: Release) -> bool {
        release >= self.min && self.max.is_none_or(|max| release < max)
    }
}

impl fmt::Display for VersionGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.max {
            Some(max) => write!(f, ">={}, <{}", self.min, max),
            None => write!(f, ">={}", self.min),
        }
    }
}

/// Check a version string against a gate
///
/// Returns [`Error::MalformedVersion`] for unparsable input rather than
/// guessing either way.
pub fn satisfies(version: &str, gate: &VersionGate) -> Result<bool> {
    Ok(ClusterVersion::parse(version)?.satisfies(gate))
}
