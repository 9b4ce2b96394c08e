//! CLI command definitions.
//!
//! This module defines all CLI commands and their arguments using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// cribctl - inspect and apply synthesized crib manifests.
#[derive(Parser, Debug)]
#[command(name = "cribctl")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the configuration file.
    #[arg(short, long, global = true, env = "CRIB_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format (text, json).
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List the bundles a manifest directory forms, in apply order.
    Bundles {
        /// Manifest directory.
        dir: PathBuf,
    },

    /// Apply a synthesized manifest directory bundle by bundle.
    Apply {
        /// Manifest directory.
        dir: PathBuf,

        /// Print each action instead of running it.
        #[arg(long)]
        dry_run: bool,
    },

    /// Validate the configuration.
    Validate {
        /// Show warnings too.
        #[arg(short, long)]
        warnings: bool,
    },

    /// Print the resource id of a prefix and an optional JSON value.
    Id {
        /// Id prefix.
        prefix: String,

        /// JSON value hashed into the id.
        value: Option<String>,
    },

    /// Normalize a string into a DNS label.
    DnsLabel {
        /// Input string.
        input: String,
    },
}

/// Output format options.
#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    #[default]
    Text,
    /// JSON output for scripting.
    Json,
}

impl Cli {
    /// Parses CLI arguments from the command line.
    #[must_use]
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
