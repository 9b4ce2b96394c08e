//! Configuration loading.
//!
//! Settings come from an optional `crib.yaml`, then `CRIB_*` environment
//! variables, which win over the file. A `.env` file can seed the
//! environment first.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::{ConfigError, CribError, Result};

use super::spec::SdkConfig;

/// Configuration file names searched for, in order.
pub const DEFAULT_CONFIG_FILES: &[&str] = &["crib.yaml", "crib.yml"];

/// Loads [`SdkConfig`] from files and the environment.
#[derive(Debug, Default)]
pub struct ConfigParser {
    base_path: Option<PathBuf>,
}

impl ConfigParser {
    /// Creates a parser resolving files from the current directory.
    #[must_use]
    pub const fn new() -> Self {
        Self { base_path: None }
    }

    /// Resolves `.env` and searches configuration files from `path`.
    #[must_use]
    pub fn with_base_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.base_path = Some(path.into());
        self
    }

    fn base(&self) -> PathBuf {
        self.base_path.clone().unwrap_or_else(|| PathBuf::from("."))
    }

    /// Loads configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing, unreadable or invalid.
    pub fn load_file(&self, path: impl AsRef<Path>) -> Result<SdkConfig> {
        let path = path.as_ref();
        info!("Loading configuration from: {}", path.display());

        if !path.exists() {
            return Err(CribError::Config(ConfigError::FileNotFound {
                path: path.to_path_buf(),
            }));
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            CribError::Config(ConfigError::ParseError {
                message: format!("Failed to read file: {e}"),
                location: Some(path.display().to_string()),
            })
        })?;

        self.parse_yaml(&content, Some(path))
    }

    /// Parses configuration from a YAML string. An empty document yields
    /// the defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML is invalid.
    pub fn parse_yaml(&self, content: &str, source: Option<&Path>) -> Result<SdkConfig> {
        if content.trim().is_empty() {
            debug!("Empty configuration, using defaults");
            return Ok(SdkConfig::default());
        }
        serde_yaml::from_str(content).map_err(|e| {
            CribError::Config(ConfigError::ParseError {
                message: format!("YAML parse error: {e}"),
                location: source.map(|p| p.display().to_string()),
            })
        })
    }

    /// Loads a file, then applies environment overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be loaded or an override is invalid.
    pub fn load_with_env(&self, path: impl AsRef<Path>) -> Result<SdkConfig> {
        let mut config = self.load_file(path)?;
        Self::apply_env_overrides(&mut config)?;
        Ok(config)
    }

    /// Loads `.env`, the nearest configuration file if any, and environment
    /// overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if a found file is invalid or an override is invalid.
    pub fn load(&self) -> Result<SdkConfig> {
        self.load_dotenv()?;
        match find_config_file(self.base()) {
            Ok(path) => self.load_with_env(path),
            Err(CribError::Config(ConfigError::FileNotFound { .. })) => {
                debug!("No configuration file found, using defaults");
                let mut config = SdkConfig::default();
                Self::apply_env_overrides(&mut config)?;
                Ok(config)
            }
            Err(e) => Err(e),
        }
    }

    /// Applies `CRIB_*` environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a boolean variable holds something else.
    pub fn apply_env_overrides(config: &mut SdkConfig) -> Result<()> {
        apply_overrides(config, |name| std::env::var(name).ok())
    }

    /// Loads the `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be loaded.
    pub fn load_dotenv(&self) -> Result<()> {
        let env_path = self.base().join(".env");

        if env_path.exists() {
            info!("Loading environment from: {}", env_path.display());
            dotenvy::from_path(&env_path).map_err(|e| {
                CribError::Config(ConfigError::ParseError {
                    message: format!("Failed to load .env file: {e}"),
                    location: Some(env_path.display().to_string()),
                })
            })?;
        } else {
            debug!(".env file not found at: {}", env_path.display());
        }

        Ok(())
    }
}

fn apply_overrides<F>(config: &mut SdkConfig, lookup: F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(dir) = lookup("CRIB_MANIFEST_DIR") {
        debug!("Overriding manifest_dir from environment");
        config.manifest_dir = Some(PathBuf::from(dir));
    }
    if let Some(shell) = lookup("CRIB_SHELL") {
        debug!("Overriding shell from environment");
        config.shell = PathBuf::from(shell);
    }
    for (name, field) in [
        ("CRIB_DRY_RUN", &mut config.dry_run),
        ("CRIB_KUBECTL_WAIT", &mut config.kubectl_wait),
        ("CRIB_MIRROR_OUTPUT", &mut config.mirror_output),
    ] {
        if let Some(value) = lookup(name) {
            debug!("Overriding {} from environment", name);
            *field = parse_bool(name, &value)?;
        }
    }
    Ok(())
}

fn parse_bool(name: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(CribError::Config(ConfigError::validation(
            format!("expected a boolean, got {value:?}"),
            name,
        ))),
    }
}

/// Finds a configuration file in `start_dir` or its parents.
///
/// # Errors
///
/// Returns [`ConfigError::FileNotFound`] if no directory up to the root has one.
pub fn find_config_file(start_dir: impl AsRef<Path>) -> Result<PathBuf> {
    let start = start_dir.as_ref();
    let mut current = start.to_path_buf();

    loop {
        for filename in DEFAULT_CONFIG_FILES {
            let config_path = current.join(filename);
            if config_path.exists() {
                info!("Found configuration file: {}", config_path.display());
                return Ok(config_path);
            }
        }

        if !current.pop() {
            break;
        }
    }

    Err(CribError::Config(ConfigError::FileNotFound {
        path: start.join(DEFAULT_CONFIG_FILES[0]),
    }))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn test_parse_full_config() {
        let yaml = r"
manifest_dir: /tmp/crib-out
dry_run: true
shell: /bin/zsh
kubectl_wait: false
mirror_output: false
";
        let config = ConfigParser::new().parse_yaml(yaml, None).unwrap();
        assert_eq!(config.manifest_dir, Some(PathBuf::from("/tmp/crib-out")));
        assert!(config.dry_run);
        assert_eq!(config.shell, PathBuf::from("/bin/zsh"));
        assert!(!config.kubectl_wait);
        assert!(!config.mirror_output);
    }

    #[test]
    fn test_empty_config_is_default() {
        let config = ConfigParser::new().parse_yaml("  \n", None).unwrap();
        assert_eq!(config, SdkConfig::default());
    }

    #[test]
    fn test_invalid_yaml_reports_location() {
        let err = ConfigParser::new()
            .parse_yaml("dry_run: [", Some(Path::new("crib.yaml")))
            .unwrap_err();
        assert!(matches!(
            err,
            CribError::Config(ConfigError::ParseError { location: Some(ref l), .. }) if l == "crib.yaml"
        ));
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("CRIB_DRY_RUN", "yes"),
            ("CRIB_KUBECTL_WAIT", "0"),
            ("CRIB_SHELL", "/bin/sh"),
            ("CRIB_MANIFEST_DIR", "out"),
        ]);
        let mut config = SdkConfig::default();
        apply_overrides(&mut config, |k| env.get(k).map(ToString::to_string)).unwrap();
        assert!(config.dry_run);
        assert!(!config.kubectl_wait);
        assert!(config.mirror_output);
        assert_eq!(config.shell, PathBuf::from("/bin/sh"));
        assert_eq!(config.manifest_dir, Some(PathBuf::from("out")));
    }

    #[test]
    fn test_invalid_bool_override() {
        let mut config = SdkConfig::default();
        let err = apply_overrides(&mut config, |k| {
            (k == "CRIB_MIRROR_OUTPUT").then(|| "maybe".to_string())
        })
        .unwrap_err();
        assert!(err.to_string().contains("expected a boolean"));
    }

    #[test]
    fn test_find_config_file_searches_parents() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a/b");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(dir.path().join("crib.yml"), "dry_run: true\n").unwrap();

        let found = find_config_file(&nested).unwrap();
        assert_eq!(found, dir.path().join("crib.yml"));
        let config = ConfigParser::new().load_file(found).unwrap();
        assert!(config.dry_run);
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = ConfigParser::new()
            .load_file(dir.path().join("crib.yaml"))
            .unwrap_err();
        assert!(matches!(err, CribError::Config(ConfigError::FileNotFound { .. })));
    }
}
