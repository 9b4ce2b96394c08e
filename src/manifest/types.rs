//! Manifest envelopes and the `ClientSideApply` document.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::{ApplyError, CribError, ManifestError};

/// API version of manifests executed locally instead of by the cluster.
pub const LOCAL_API_VERSION: &str = "crib.smartcontract.com/v1alpha1";

/// Kind of manifests executed locally instead of by the cluster.
pub const LOCAL_KIND: &str = "ClientSideApply";

/// The `apiVersion`/`kind` pair every Kubernetes-style manifest starts with.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    /// Manifest API version.
    #[serde(default)]
    pub api_version: String,
    /// Manifest kind.
    #[serde(default)]
    pub kind: String,
}

impl Envelope {
    /// Reads the envelope of the first YAML document in `content`.
    ///
    /// # Errors
    ///
    /// Returns the parser message if the first document is not a mapping.
    pub fn from_yaml(content: &str) -> Result<Self, String> {
        let Some(document) = serde_yaml::Deserializer::from_str(content).next() else {
            return Ok(Self::default());
        };
        Self::deserialize(document).map_err(|e| e.to_string())
    }

    /// Returns true for `ClientSideApply` manifests.
    #[must_use]
    pub fn is_local(&self) -> bool {
        self.api_version == LOCAL_API_VERSION && self.kind == LOCAL_KIND
    }
}

/// What to do with the remaining bundles when a local action fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OnFailure {
    /// Record the error and move on to the next bundle.
    Continue,
    /// Stop the apply and return the error.
    #[default]
    Abort,
}

impl OnFailure {
    /// Wraps an action failure in the error carrying this policy.
    #[must_use]
    pub fn wrap(self, bundle: impl Into<String>, err: impl Into<CribError>) -> ApplyError {
        match self {
            Self::Continue => ApplyError::continue_with(bundle, err),
            Self::Abort => ApplyError::abort(bundle, err),
        }
    }
}

impl fmt::Display for OnFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Continue => write!(f, "continue"),
            Self::Abort => write!(f, "abort"),
        }
    }
}

/// Tool a `ClientSideApply` manifest runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    /// `aws` CLI.
    Aws,
    /// Raw shell command line.
    Cmd,
    /// `cribctl` itself.
    Cribctl,
    /// `docker` CLI.
    Docker,
    /// `helm` CLI.
    Helm,
    /// `kind` CLI.
    Kind,
    /// `kubectl` CLI.
    Kubectl,
    /// `task` runner.
    Task,
    /// `telepresence` CLI.
    Telepresence,
}

impl Action {
    /// Every supported action.
    pub const ALL: [Self; 9] = [
        Self::Aws,
        Self::Cmd,
        Self::Cribctl,
        Self::Docker,
        Self::Helm,
        Self::Kind,
        Self::Kubectl,
        Self::Task,
        Self::Telepresence,
    ];

    /// Name used in manifests, which is also the executable name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Aws => "aws",
            Self::Cmd => "cmd",
            Self::Cribctl => "cribctl",
            Self::Docker => "docker",
            Self::Helm => "helm",
            Self::Kind => "kind",
            Self::Kubectl => "kubectl",
            Self::Task => "task",
            Self::Telepresence => "telepresence",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|a| a.as_str() == s)
            .ok_or_else(|| format!("unknown action {s:?}"))
    }
}

/// Metadata carried by generated `ClientSideApply` manifests.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestMetadata {
    /// Object name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Object namespace.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

/// Body of a `ClientSideApply` manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ClientSideApplySpec {
    /// Failure policy.
    pub on_failure: OnFailure,
    /// Tool to run.
    pub action: Action,
    /// Arguments, joined with spaces into one command line.
    #[validate(length(min = 1, message = "at least one argument is required"))]
    pub args: Vec<String>,
}

/// A manifest describing a command to run on the client.
///
/// ```yaml
/// apiVersion: crib.smartcontract.com/v1alpha1
/// kind: ClientSideApply
/// spec:
///   onFailure: abort
///   action: kubectl
///   args: [apply, -f, extra.yaml]
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ClientSideApplyManifest {
    /// Always [`LOCAL_API_VERSION`].
    pub api_version: String,
    /// Always [`LOCAL_KIND`].
    pub kind: String,
    /// Optional object metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ManifestMetadata>,
    /// What to run.
    #[validate(nested)]
    pub spec: ClientSideApplySpec,
}

impl ClientSideApplyManifest {
    /// Creates a manifest running `action` with `args`, aborting on failure.
    #[must_use]
    pub fn new<I, S>(action: Action, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            api_version: LOCAL_API_VERSION.to_string(),
            kind: LOCAL_KIND.to_string(),
            metadata: None,
            spec: ClientSideApplySpec {
                on_failure: OnFailure::Abort,
                action,
                args: args.into_iter().map(Into::into).collect(),
            },
        }
    }

    /// Sets the failure policy.
    #[must_use]
    pub const fn with_on_failure(mut self, on_failure: OnFailure) -> Self {
        self.spec.on_failure = on_failure;
        self
    }

    /// Sets `metadata.namespace`.
    #[must_use]
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.metadata.get_or_insert_with(ManifestMetadata::default).namespace =
            Some(namespace.into());
        self
    }

    /// Parses and validates the first document of `content`.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::Parse`] for malformed YAML and
    /// [`ManifestError::Invalid`] for a wrong envelope or an invalid spec.
    pub fn parse(path: &Path, content: &str) -> Result<Self, ManifestError> {
        let document = serde_yaml::Deserializer::from_str(content)
            .next()
            .ok_or_else(|| ManifestError::Parse {
                path: path.to_path_buf(),
                message: "empty document".to_string(),
            })?;
        let manifest = Self::deserialize(document).map_err(|e| ManifestError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        let envelope = Envelope {
            api_version: manifest.api_version.clone(),
            kind: manifest.kind.clone(),
        };
        if !envelope.is_local() {
            return Err(ManifestError::Invalid {
                path: path.to_path_buf(),
                message: format!(
                    "expected {LOCAL_API_VERSION}/{LOCAL_KIND}, found {}/{}",
                    envelope.api_version, envelope.kind
                ),
            });
        }
        manifest.validate().map_err(|e| ManifestError::Invalid {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Ok(manifest)
    }

    /// Reads and parses the manifest at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::Read`] if the file cannot be read, otherwise
    /// as [`ClientSideApplyManifest::parse`].
    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        let content = std::fs::read_to_string(path).map_err(|source| ManifestError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(path, &content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOCAL: &str = "apiVersion: crib.smartcontract.com/v1alpha1\n\
                         kind: ClientSideApply\n\
                         spec:\n  onFailure: continue\n  action: kubectl\n  args: [get, pods]\n";

    #[test]
    fn test_envelope_classification() {
        assert!(Envelope::from_yaml(LOCAL).unwrap().is_local());
        assert!(!Envelope::from_yaml("apiVersion: v1\nkind: Pod\n").unwrap().is_local());
        assert!(Envelope::from_yaml("just text").is_err());
    }

    #[test]
    fn test_envelope_reads_first_document_only() {
        let content = format!("{LOCAL}---\napiVersion: v1\nkind: Pod\n");
        assert!(Envelope::from_yaml(&content).unwrap().is_local());
    }

    #[test]
    fn test_parse_local_manifest() {
        let manifest = ClientSideApplyManifest::parse(Path::new("a.yaml"), LOCAL).unwrap();
        assert_eq!(manifest.spec.on_failure, OnFailure::Continue);
        assert_eq!(manifest.spec.action, Action::Kubectl);
        assert_eq!(manifest.spec.args, vec!["get", "pods"]);
    }

    #[test]
    fn test_parse_rejects_unknown_action() {
        let content = LOCAL.replace("kubectl", "terraform");
        let err = ClientSideApplyManifest::parse(Path::new("a.yaml"), &content).unwrap_err();
        assert!(matches!(err, ManifestError::Parse { .. }));
    }

    #[test]
    fn test_parse_rejects_empty_args() {
        let content = LOCAL.replace("[get, pods]", "[]");
        let err = ClientSideApplyManifest::parse(Path::new("a.yaml"), &content).unwrap_err();
        assert!(matches!(err, ManifestError::Invalid { .. }));
    }

    #[test]
    fn test_parse_rejects_remote_envelope() {
        let content = LOCAL.replace("ClientSideApply", "Job");
        let err = ClientSideApplyManifest::parse(Path::new("a.yaml"), &content).unwrap_err();
        assert!(err.to_string().contains("found crib.smartcontract.com/v1alpha1/Job"));
    }

    #[test]
    fn test_serialized_shape() {
        let manifest = ClientSideApplyManifest::new(Action::Cmd, ["echo", "hi"])
            .with_on_failure(OnFailure::Continue)
            .with_namespace("crib");
        let yaml = serde_yaml::to_string(&manifest).unwrap();
        assert!(yaml.contains("apiVersion: crib.smartcontract.com/v1alpha1"));
        assert!(yaml.contains("onFailure: continue"));
        assert!(yaml.contains("namespace: crib"));
        let back = ClientSideApplyManifest::parse(Path::new("x.yaml"), &yaml).unwrap();
        assert_eq!(back, manifest);
    }

    #[test]
    fn test_policy_wraps_errors() {
        let err = OnFailure::Continue.wrap("b1", CribError::internal("x"));
        assert!(matches!(err, ApplyError::Continue { .. }));
        let err = OnFailure::Abort.wrap("b1", CribError::internal("x"));
        assert!(matches!(err, ApplyError::Abort { .. }));
    }

    #[test]
    fn test_action_names() {
        for action in Action::ALL {
            assert_eq!(action.as_str().parse::<Action>().unwrap(), action);
        }
        assert!("make".parse::<Action>().is_err());
    }
}
