//! Configuration validation.
//!
//! Errors make a configuration unusable; warnings flag settings that work
//! but are likely mistakes.

use std::path::Path;

use tracing::debug;

use crate::error::{ConfigError, CribError, Result};

use super::spec::SdkConfig;

/// Validator for [`SdkConfig`].
#[derive(Debug, Default)]
pub struct ConfigValidator;

/// Validation result containing all errors found.
#[derive(Debug, Default)]
pub struct ValidationResult {
    /// List of validation errors.
    pub errors: Vec<ValidationError>,
    /// List of warnings (non-fatal issues).
    pub warnings: Vec<String>,
}

/// A single validation error.
#[derive(Debug)]
pub struct ValidationError {
    /// The field that failed validation.
    pub field: String,
    /// The error message.
    pub message: String,
}

impl ConfigValidator {
    /// Creates a validator.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Checks `config` and collects every problem.
    #[must_use]
    pub fn validate(&self, config: &SdkConfig) -> ValidationResult {
        let mut result = ValidationResult::default();
        Self::validate_shell(&config.shell, &mut result);
        if let Some(dir) = &config.manifest_dir {
            Self::validate_manifest_dir(dir, &mut result);
        }
        if config.dry_run && !config.mirror_output {
            result
                .warnings
                .push("dry_run prints manifests to stdout regardless of mirror_output".to_string());
        }
        debug!(
            "Validation finished with {} error(s), {} warning(s)",
            result.error_count(),
            result.warning_count()
        );
        result
    }

    /// Validates `config`, failing on the first error.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] for the first problem found.
    pub fn check(&self, config: &SdkConfig) -> Result<()> {
        let result = self.validate(config);
        match result.errors.into_iter().next() {
            Some(err) => Err(CribError::Config(ConfigError::validation(
                err.message,
                err.field,
            ))),
            None => Ok(()),
        }
    }

    fn validate_shell(shell: &Path, result: &mut ValidationResult) {
        if shell.as_os_str().is_empty() {
            result.errors.push(ValidationError {
                field: String::from("shell"),
                message: String::from("Shell cannot be empty"),
            });
        } else if shell.is_absolute() && !shell.exists() {
            result
                .warnings
                .push(format!("Shell {} does not exist", shell.display()));
        }
    }

    fn validate_manifest_dir(dir: &Path, result: &mut ValidationResult) {
        if dir.is_file() {
            result.errors.push(ValidationError {
                field: String::from("manifest_dir"),
                message: format!("{} is a file, not a directory", dir.display()),
            });
            return;
        }
        let has_entries = std::fs::read_dir(dir)
            .map(|mut entries| entries.next().is_some())
            .unwrap_or(false);
        if has_entries {
            result.warnings.push(format!(
                "Manifest directory {} is not empty; existing manifests will be applied too",
                dir.display()
            ));
        }
    }
}

impl ValidationResult {
    /// Returns true if validation passed (no errors).
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Returns the number of errors.
    #[must_use]
    pub const fn error_count(&self) -> usize {
        self.errors.len()
    }

    /// Returns the number of warnings.
    #[must_use]
    pub const fn warning_count(&self) -> usize {
        self.warnings.len()
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let result = ConfigValidator::new().validate(&SdkConfig::default());
        assert!(result.is_valid());
        tokio_test::assert_ok!(ConfigValidator::new().check(&SdkConfig::default()));
    }

    #[test]
    fn test_empty_shell_is_an_error() {
        let config = SdkConfig::default().with_shell("");
        let result = ConfigValidator::new().validate(&config);
        assert_eq!(result.error_count(), 1);
        assert_eq!(result.errors[0].to_string(), "shell: Shell cannot be empty");
        tokio_test::assert_err!(ConfigValidator::new().check(&config));
    }

    #[test]
    fn test_manifest_dir_checks() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("file.yaml");
        std::fs::write(&file, "x: 1").unwrap();

        let result = ConfigValidator::new().validate(&SdkConfig::default().with_manifest_dir(&file));
        assert!(!result.is_valid());

        let result =
            ConfigValidator::new().validate(&SdkConfig::default().with_manifest_dir(dir.path()));
        assert!(result.is_valid());
        assert_eq!(result.warning_count(), 1);
    }

    #[test]
    fn test_dry_run_without_mirror_warns() {
        let config = SdkConfig::default()
            .with_dry_run(true)
            .with_mirror_output(false);
        let result = ConfigValidator::new().validate(&config);
        assert!(result.is_valid());
        assert_eq!(result.warning_count(), 1);
    }
}
