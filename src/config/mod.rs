//! SDK configuration.
//!
//! - [`SdkConfig`]: manifest output, dry-run, shell and output settings
//! - [`ConfigParser`]: `crib.yaml`, `.env` and `CRIB_*` environment loading
//! - [`ConfigValidator`]: error and warning checks

mod parser;
mod spec;
mod validator;

pub use parser::{ConfigParser, DEFAULT_CONFIG_FILES, find_config_file};
pub use spec::{DEFAULT_SHELL, SdkConfig};
pub use validator::{ConfigValidator, ValidationError, ValidationResult};
