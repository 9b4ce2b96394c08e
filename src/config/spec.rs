//! SDK settings.
//!
//! These map to the optional `crib.yaml` file. Every field has a default, so
//! an empty file (or no file at all) is a valid configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Settings shared by plan application and the `cribctl` binary.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SdkConfig {
    /// Where synthesized manifests are written. A temporary directory named
    /// after the plan is used, and removed afterwards, when unset.
    pub manifest_dir: Option<PathBuf>,
    /// Print `ClientSideApply` manifests instead of executing them.
    pub dry_run: bool,
    /// Shell used to run action command lines.
    pub shell: PathBuf,
    /// Pass `--wait` to cluster applies.
    pub kubectl_wait: bool,
    /// Mirror action output to this process's stdout and stderr.
    pub mirror_output: bool,
}

impl Default for SdkConfig {
    fn default() -> Self {
        Self {
            manifest_dir: None,
            dry_run: false,
            shell: PathBuf::from(DEFAULT_SHELL),
            kubectl_wait: true,
            mirror_output: true,
        }
    }
}

/// Shell used when none is configured.
pub const DEFAULT_SHELL: &str = "/bin/bash";

impl SdkConfig {
    /// Writes manifests to `dir` instead of a temporary directory.
    #[must_use]
    pub fn with_manifest_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.manifest_dir = Some(dir.into());
        self
    }

    /// Enables or disables dry-run mode.
    #[must_use]
    pub const fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Uses `shell` for action command lines.
    #[must_use]
    pub fn with_shell(mut self, shell: impl Into<PathBuf>) -> Self {
        self.shell = shell.into();
        self
    }

    /// Enables or disables output mirroring.
    #[must_use]
    pub const fn with_mirror_output(mut self, mirror: bool) -> Self {
        self.mirror_output = mirror;
        self
    }
}
