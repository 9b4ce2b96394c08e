//! Manifest discovery and locality bundling.
//!
//! Manifests are grouped by directory, directories in lexicographic order
//! and files in name order within each directory. Consecutive remote
//! manifests of one directory form a single bundle applied in one cluster
//! call; every local manifest is a bundle of its own.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::error::ManifestError;

use super::types::Envelope;

/// A discovered manifest file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Manifest {
    path: PathBuf,
    local: bool,
}

impl Manifest {
    /// Creates a manifest entry for `path`, relative to the discovery root.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, local: bool) -> Self {
        Self {
            path: path.into(),
            local,
        }
    }

    /// Path relative to the discovery root.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns true for `ClientSideApply` manifests.
    #[must_use]
    pub const fn is_local(&self) -> bool {
        self.local
    }
}

/// Manifests applied together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ManifestBundle {
    root: PathBuf,
    local: bool,
    manifests: Vec<Manifest>,
}

impl ManifestBundle {
    fn start(root: &Path, manifest: Manifest) -> Self {
        Self {
            root: root.to_path_buf(),
            local: manifest.local,
            manifests: vec![manifest],
        }
    }

    /// Returns true if this bundle holds one `ClientSideApply` manifest.
    #[must_use]
    pub const fn is_local(&self) -> bool {
        self.local
    }

    /// Manifests in apply order.
    #[must_use]
    pub fn manifests(&self) -> &[Manifest] {
        &self.manifests
    }

    /// Absolute paths of the bundled manifests.
    #[must_use]
    pub fn paths(&self) -> Vec<PathBuf> {
        self.manifests.iter().map(|m| self.root.join(&m.path)).collect()
    }

    /// Number of manifests.
    #[must_use]
    pub fn len(&self) -> usize {
        self.manifests.len()
    }

    /// Returns true if the bundle holds no manifest.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.manifests.is_empty()
    }
}

impl fmt::Display for ManifestBundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let paths: Vec<String> = self
            .paths()
            .iter()
            .map(|p| p.display().to_string())
            .collect();
        f.write_str(&paths.join(","))
    }
}

/// Returns true for `.yaml`/`.yml` files, ignoring case.
#[must_use]
pub fn is_manifest_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("yaml") || e.eq_ignore_ascii_case("yml"))
}

fn classify(path: &Path) -> Result<bool, ManifestError> {
    let content = std::fs::read_to_string(path).map_err(|source| ManifestError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    match Envelope::from_yaml(&content) {
        Ok(envelope) => Ok(envelope.is_local()),
        Err(message) => {
            debug!("Treating {} as remote: {}", path.display(), message);
            Ok(false)
        }
    }
}

/// Finds every manifest below `root` and groups them into bundles.
///
/// # Errors
///
/// Returns an error if the directory cannot be walked or a manifest cannot
/// be read. Files whose envelope does not parse are treated as remote.
pub fn discover(root: &Path) -> Result<Vec<ManifestBundle>, ManifestError> {
    let mut by_dir: BTreeMap<PathBuf, Vec<Manifest>> = BTreeMap::new();

    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(|e| ManifestError::Walk {
            message: e.to_string(),
        })?;
        if !entry.file_type().is_file() || !is_manifest_file(entry.path()) {
            continue;
        }
        let relative = entry.path().strip_prefix(root).unwrap_or(entry.path());
        let dir = relative.parent().map(Path::to_path_buf).unwrap_or_default();
        let local = classify(entry.path())?;
        by_dir
            .entry(dir)
            .or_default()
            .push(Manifest::new(relative, local));
    }

    let bundles: Vec<ManifestBundle> = by_dir
        .into_values()
        .flat_map(|manifests| bundle_directory(root, manifests))
        .collect();
    info!(
        "Discovered {} manifest bundle(s) in {}",
        bundles.len(),
        root.display()
    );
    Ok(bundles)
}

/// Bundles the manifests of one directory, keeping their order.
///
/// A bundle ends whenever locality changes, and after every local manifest.
#[must_use]
pub fn bundle_directory(root: &Path, manifests: Vec<Manifest>) -> Vec<ManifestBundle> {
    let mut bundles = Vec::new();
    let mut current: Option<ManifestBundle> = None;

    for manifest in manifests {
        match current.as_mut() {
            Some(open) if !manifest.local && !open.local => open.manifests.push(manifest),
            _ => {
                bundles.extend(current.take());
                current = Some(ManifestBundle::start(root, manifest));
            }
        }
    }
    bundles.extend(current);
    bundles
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOCAL: &str = "apiVersion: crib.smartcontract.com/v1alpha1\nkind: ClientSideApply\n\
                         spec:\n  onFailure: abort\n  action: cmd\n  args: [\"true\"]\n";
    const REMOTE: &str = "apiVersion: v1\nkind: ConfigMap\nmetadata:\n  name: x\n";

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    fn shape(bundles: &[ManifestBundle]) -> Vec<(bool, Vec<String>)> {
        bundles
            .iter()
            .map(|b| {
                let names = b
                    .manifests()
                    .iter()
                    .map(|m| m.path().display().to_string())
                    .collect();
                (b.is_local(), names)
            })
            .collect()
    }

    #[test]
    fn test_local_manifest_splits_remote_runs() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a.yaml", REMOTE);
        write(dir.path(), "b.yaml", REMOTE);
        write(dir.path(), "c.yaml", LOCAL);
        write(dir.path(), "d.yaml", REMOTE);
        write(dir.path(), "e.yaml", REMOTE);

        let bundles = discover(dir.path()).unwrap();
        assert_eq!(
            shape(&bundles),
            vec![
                (false, vec!["a.yaml".to_string(), "b.yaml".to_string()]),
                (true, vec!["c.yaml".to_string()]),
                (false, vec!["d.yaml".to_string(), "e.yaml".to_string()]),
            ]
        );
    }

    #[test]
    fn test_consecutive_locals_are_separate_bundles() {
        let manifests = vec![
            Manifest::new("a.yaml", true),
            Manifest::new("b.yaml", true),
            Manifest::new("c.yaml", false),
        ];
        let bundles = bundle_directory(Path::new("/m"), manifests);
        assert_eq!(bundles.len(), 3);
        assert!(bundles[0].is_local() && bundles[1].is_local());
        assert!(!bundles[2].is_local());
    }

    #[test]
    fn test_directories_never_share_bundles() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "0001-db/0000-a.yaml", REMOTE);
        write(dir.path(), "0000-app/0000-a.yml", REMOTE);
        write(dir.path(), "0000-app/0001-b.YAML", REMOTE);
        write(dir.path(), "0000-app/notes.txt", "not a manifest");

        let bundles = discover(dir.path()).unwrap();
        assert_eq!(bundles.len(), 2);
        assert_eq!(bundles[0].len(), 2);
        assert!(bundles[0].manifests()[0].path().starts_with("0000-app"));
        assert!(bundles[1].manifests()[0].path().starts_with("0001-db"));
    }

    #[test]
    fn test_unparsable_manifest_is_remote() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "bad.yaml", "just text");
        let bundles = discover(dir.path()).unwrap();
        assert_eq!(bundles.len(), 1);
        assert!(!bundles[0].is_local());
    }

    #[test]
    fn test_display_joins_absolute_paths() {
        let bundles = bundle_directory(
            Path::new("/m"),
            vec![Manifest::new("x/a.yaml", false), Manifest::new("x/b.yaml", false)],
        );
        assert_eq!(bundles[0].to_string(), "/m/x/a.yaml,/m/x/b.yaml");
    }

    #[test]
    fn test_missing_root_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(discover(&dir.path().join("missing")).is_err());
    }

    #[test]
    fn test_manifest_extensions() {
        assert!(is_manifest_file(Path::new("a.yaml")));
        assert!(is_manifest_file(Path::new("a.YML")));
        assert!(!is_manifest_file(Path::new("a.json")));
        assert!(!is_manifest_file(Path::new("yaml")));
    }
}
