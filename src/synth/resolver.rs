//! Post-processing hooks applied to every manifest at synthesis time.

use std::fmt::Debug;
use std::sync::Arc;

use serde_yaml::{Mapping, Value};

use crate::identity::{RESERVED_IDS, UNKNOWN_ID, to_dns_label};

/// Runs before default-priority resolvers.
pub const PRIORITY_HIGH: i32 = 100;
/// Priority of resolvers that do not override it.
pub const PRIORITY_DEFAULT: i32 = 10;
/// Runs after default-priority resolvers.
pub const PRIORITY_LOW: i32 = 0;

/// Rewrites a manifest document in place before it is written.
pub trait ManifestResolver: Send + Sync + Debug {
    /// Applies the rewrite.
    fn resolve(&self, manifest: &mut Value);

    /// Higher priorities run first.
    fn priority(&self) -> i32 {
        PRIORITY_DEFAULT
    }
}

/// Orders resolvers by descending priority, keeping declaration order for ties.
pub fn sort_resolvers(resolvers: &mut [Arc<dyn ManifestResolver>]) {
    resolvers.sort_by_key(|r| std::cmp::Reverse(r.priority()));
}

/// Converts `metadata.name` into a DNS label.
#[derive(Debug, Clone, Copy, Default)]
pub struct NameResolver;

impl ManifestResolver for NameResolver {
    fn resolve(&self, manifest: &mut Value) {
        let Some(name) = manifest
            .get_mut("metadata")
            .and_then(|m| m.get_mut("name"))
        else {
            return;
        };
        let Some(current) = name.as_str() else {
            return;
        };
        if current == UNKNOWN_ID || RESERVED_IDS.contains(&current) {
            return;
        }
        let label = to_dns_label(current);
        if label != current {
            *name = Value::String(label);
        }
    }

    fn priority(&self) -> i32 {
        PRIORITY_LOW
    }
}

/// Adds `imagePullSecrets` to pod-bearing workloads.
#[derive(Debug, Clone, Default)]
pub struct ImagePullSecrets {
    secrets: Vec<String>,
}

const POD_SPEC_KINDS: [&str; 4] = ["Pod", "Job", "CronJob", "Workflow"];
const TEMPLATE_SPEC_KINDS: [&str; 4] = ["Deployment", "StatefulSet", "DaemonSet", "DeploymentConfig"];

impl ImagePullSecrets {
    /// Creates a resolver adding the given secret names.
    #[must_use]
    pub fn new<I, S>(secrets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            secrets: secrets.into_iter().map(Into::into).collect(),
        }
    }

    /// Configured secret names.
    #[must_use]
    pub fn secrets(&self) -> &[String] {
        &self.secrets
    }

    fn entries(&self) -> Value {
        Value::Sequence(
            self.secrets
                .iter()
                .map(|s| {
                    let mut entry = Mapping::new();
                    entry.insert(Value::from("name"), Value::from(s.as_str()));
                    Value::Mapping(entry)
                })
                .collect(),
        )
    }
}

impl ManifestResolver for ImagePullSecrets {
    fn resolve(&self, manifest: &mut Value) {
        if self.secrets.is_empty() {
            return;
        }
        let Some(kind) = manifest.get("kind").and_then(Value::as_str) else {
            return;
        };

        let spec = if POD_SPEC_KINDS.contains(&kind) {
            manifest.get_mut("spec")
        } else if TEMPLATE_SPEC_KINDS.contains(&kind) {
            manifest
                .get_mut("spec")
                .and_then(|s| s.get_mut("template"))
                .and_then(|t| t.get_mut("spec"))
        } else {
            None
        };

        if let Some(Value::Mapping(spec)) = spec {
            spec.insert(Value::from("imagePullSecrets"), self.entries());
        }
    }
}
