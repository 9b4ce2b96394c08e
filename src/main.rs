//! cribctl CLI entrypoint.
//!
//! Inspects and applies manifest directories synthesized by crib plans.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crib_sdk::cli::{Cli, Commands, OutputFormatter};
use crib_sdk::config::{ConfigParser, ConfigValidator, SdkConfig};
use crib_sdk::context::Context;
use crib_sdk::error::Result;
use crib_sdk::identity::{resource_id, to_dns_label};
use crib_sdk::manifest::discover;
use crib_sdk::orchestrator::PlanService;

use clap::Parser;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

/// Main entrypoint.
fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging
    init_logging(cli.verbose);

    // Run async runtime
    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to create async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Initializes the logging system.
fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Main async entry point.
async fn run(cli: Cli) -> Result<()> {
    let formatter = OutputFormatter::new(cli.output);

    match cli.command {
        Commands::Bundles { dir } => cmd_bundles(&dir, &formatter),
        Commands::Apply { dir, dry_run } => {
            cmd_apply(cli.config.as_ref(), &dir, dry_run, &formatter).await
        }
        Commands::Validate { warnings } => cmd_validate(cli.config.as_ref(), warnings, &formatter),
        Commands::Id { prefix, value } => cmd_id(&prefix, value.as_deref(), &formatter),
        Commands::DnsLabel { input } => emit(&formatter.format_value("label", &to_dns_label(&input))),
    }
}

/// List bundles of a manifest directory.
fn cmd_bundles(dir: &Path, formatter: &OutputFormatter) -> Result<()> {
    info!("Discovering manifests in: {}", dir.display());
    let bundles = discover(dir)?;
    emit(&formatter.format_bundles(&bundles))
}

/// Apply a manifest directory.
async fn cmd_apply(
    config_path: Option<&PathBuf>,
    dir: &Path,
    dry_run: bool,
    formatter: &OutputFormatter,
) -> Result<()> {
    let mut config = load_config(config_path)?;
    if dry_run {
        config = config.with_dry_run(true);
    }
    let validator = ConfigValidator::new();
    for warning in validator.validate(&config).warnings {
        warn!("{}", warning);
    }
    validator.check(&config)?;

    let ctx = Context::new();
    let cancel = ctx.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling running actions");
            cancel.cancel();
        }
    });

    let state = PlanService::new(config).apply_dir(&ctx, dir).await?;
    emit(&formatter.format_state(&state))
}

/// Validate configuration.
fn cmd_validate(
    config_path: Option<&PathBuf>,
    show_warnings: bool,
    formatter: &OutputFormatter,
) -> Result<()> {
    let config = load_config(config_path)?;
    let validator = ConfigValidator::new();
    let result = validator.validate(&config);
    emit(&formatter.format_validation(&result, show_warnings))?;
    validator.check(&config)
}

/// Compute a resource id.
fn cmd_id(prefix: &str, value: Option<&str>, formatter: &OutputFormatter) -> Result<()> {
    let value = match value {
        Some(raw) => serde_json::from_str(raw).unwrap_or_else(|e| {
            debug!("Value is not JSON ({}), hashing it as a string", e);
            serde_json::Value::String(raw.to_string())
        }),
        None => serde_json::Value::Null,
    };
    let id = match &value {
        serde_json::Value::String(s) => resource_id(prefix, s.as_str()),
        other => resource_id(prefix, other),
    };
    emit(&formatter.format_value("id", &id))
}

/// Loads configuration from an explicit file or by searching upward.
fn load_config(config_path: Option<&PathBuf>) -> Result<SdkConfig> {
    match config_path {
        Some(path) => {
            let parser = ConfigParser::new()
                .with_base_path(path.parent().unwrap_or_else(|| Path::new(".")));
            parser.load_dotenv()?;
            parser.load_with_env(path)
        }
        None => ConfigParser::new().load(),
    }
}

/// Writes command output to stdout.
fn emit(output: &str) -> Result<()> {
    let mut stdout = std::io::stdout().lock();
    stdout.write_all(output.as_bytes())?;
    if !output.ends_with('\n') {
        stdout.write_all(b"\n")?;
    }
    stdout.flush()?;
    Ok(())
}
