//! Error types for cluster artifact generation
//!
//! Errors are structured with fields so callers can tell which component or
//! artifact entry a failure belongs to. Only version parsing aborts a whole
//! run; everything else is scoped to one component map or one bundle entry.

use thiserror::Error;

/// Main error type for clustergen operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// Target orchestrator version (or a gate bound) could not be parsed
    #[error("malformed version '{version}': {message}")]
    MalformedVersion {
        /// The offending version string
        version: String,
        /// Why parsing failed
        message: String,
    },

    /// Neither the versioned nor the unversioned template asset exists
    #[error("asset not found for {entry}: tried {}", .tried.join(", "))]
    AssetNotFound {
        /// Addon or manifest name the asset was requested for
        entry: String,
        /// Asset paths that were looked up, in lookup order
        tried: Vec<String>,
    },

    /// An asset exists but could not be read
    #[error("asset {path} unreadable: {message}")]
    AssetUnreadable {
        /// Asset path as requested
        path: String,
        /// Underlying read error
        message: String,
    },

    /// Inline payload could not be decoded or decompressed
    #[error("payload decode error for {entry}: {message}")]
    PayloadDecode {
        /// Addon or manifest name carrying the payload
        entry: String,
        /// Description of what failed
        message: String,
    },

    /// Two rules wrote incompatible values to the same key
    #[error("configuration conflict in {component} on '{key}': {message}")]
    ConfigurationConflict {
        /// Component whose rule table is inconsistent
        component: String,
        /// Flag both rules wrote
        key: String,
        /// Description of the conflicting writes
        message: String,
    },

    /// Template asset failed to render
    #[error("template error for {entry}: {message}")]
    Template {
        /// Addon or manifest name the template belongs to
        entry: String,
        /// Description of what failed
        message: String,
    },

    /// Serialization/deserialization error
    #[error("serialization error: {message}")]
    Serialization {
        /// Description of what failed
        message: String,
        /// What was being (de)serialized, if known
        kind: Option<String>,
    },
}

impl Error {
    /// Create a malformed version error
    pub fn malformed_version(version: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::MalformedVersion {
            version: version.into(),
            message: msg.into(),
        }
    }

    /// Create an asset-not-found error listing every path that was tried
    pub fn asset_not_found(entry: impl Into<String>, tried: Vec<String>) -> Self {
        Self::AssetNotFound {
            entry: entry.into(),
            tried,
        }
    }

    /// Create an error for an asset that exists but cannot be read
    pub fn asset_unreadable(path: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::AssetUnreadable {
            path: path.into(),
            message: msg.into(),
        }
    }

    /// Create a payload decode error for an artifact entry
    pub fn payload_decode(entry: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::PayloadDecode {
            entry: entry.into(),
            message: msg.into(),
        }
    }

    /// Create a configuration conflict error
    pub fn conflict(
        component: impl Into<String>,
        key: impl Into<String>,
        msg: impl Into<String>,
    ) -> Self {
        Self::ConfigurationConflict {
            component: component.into(),
            key: key.into(),
            message: msg.into(),
        }
    }

    /// Create a template rendering error for an artifact entry
    pub fn template(entry: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Template {
            entry: entry.into(),
            message: msg.into(),
        }
    }

    /// Create a serialization error with the given message
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization {
            message: msg.into(),
            kind: None,
        }
    }

    /// Create a serialization error with context on what was being parsed
    pub fn serialization_for_kind(kind: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Serialization {
            message: msg.into(),
            kind: Some(kind.into()),
        }
    }

    /// Check if this error aborts the whole generation run
    ///
    /// A bad target version invalidates every gate, so nothing can be
    /// produced. All other errors are scoped to one component or entry.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::MalformedVersion { .. })
    }

    /// Get the artifact entry name if this error is scoped to one entry
    pub fn entry(&self) -> Option<&str> {
        match self {
            Error::AssetNotFound { entry, .. } => Some(entry),
            Error::PayloadDecode { entry, .. } => Some(entry),
            Error::Template { entry, .. } => Some(entry),
            _ => None,
        }
    }

    /// Get the component name if this error is scoped to one component
    pub fn component(&self) -> Option<&str> {
        match self {
            Error::ConfigurationConflict { component, .. } => Some(component),
            _ => None,
        }
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(err: serde_yaml::Error) -> Self {
        Self::serialization_for_kind("yaml", err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ==========================================================================
    // Story Tests: Failure Scoping
    // ==========================================================================
    //
    // A generation run must hand back partial results whenever possible, so
    // every error knows whether it kills the run, one component, or one entry.

    /// Story: a bad target version stops everything
    #[test]
    fn story_malformed_version_is_fatal() {
        let err = Error::malformed_version("1.x", "minor component is not a number");
        assert!(err.is_fatal());
        assert!(err.to_string().contains("1.x"));
        assert!(err.to_string().contains("minor component"));
        assert_eq!(err.entry(), None);
        assert_eq!(err.component(), None);
    }

    /// Story: a missing asset only drops the entry that needed it
    #[test]
    fn story_missing_asset_is_scoped_to_entry() {
        let err = Error::asset_not_found(
            "dashboard",
            vec![
                "k8s/addons/1.16/dashboard.yaml".to_string(),
                "k8s/addons/dashboard.yaml".to_string(),
            ],
        );
        assert!(!err.is_fatal());
        assert_eq!(err.entry(), Some("dashboard"));
        assert!(err
            .to_string()
            .contains("k8s/addons/1.16/dashboard.yaml, k8s/addons/dashboard.yaml"));
    }

    /// Story: undecodable inline payloads are recoverable
    #[test]
    fn story_payload_decode_is_recoverable() {
        let err = Error::payload_decode("calico", "invalid base64");
        assert!(!err.is_fatal());
        assert_eq!(err.entry(), Some("calico"));
        assert!(err.to_string().contains("payload decode error"));
    }

    /// Story: conflicting rules point at the broken component table
    #[test]
    fn story_conflict_names_component_and_key() {
        let err = Error::conflict("kube-apiserver", "--authorization-mode", "RBAC vs Node,RBAC");
        assert!(!err.is_fatal());
        assert_eq!(err.component(), Some("kube-apiserver"));
        assert!(err.to_string().contains("--authorization-mode"));
    }

    #[test]
    fn test_template_error_entry() {
        let err = Error::template("kube-apiserver", "undefined variable");
        assert_eq!(err.entry(), Some("kube-apiserver"));
        assert!(err.to_string().contains("template error"));
    }

    #[test]
    fn test_serialization_kind() {
        let err = Error::serialization_for_kind("defaults", "missing field");
        match &err {
            Error::Serialization { kind, .. } => assert_eq!(kind.as_deref(), Some("defaults")),
            _ => panic!("Expected Serialization variant"),
        }
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_yaml_error_converts() {
        let parse: std::result::Result<Vec<u32>, serde_yaml::Error> =
            serde_yaml::from_str("not: [a list");
        let err: Error = parse.expect_err("invalid yaml").into();
        match err {
            Error::Serialization { kind, .. } => assert_eq!(kind.as_deref(), Some("yaml")),
            _ => panic!("Expected Serialization variant"),
        }
    }
}
